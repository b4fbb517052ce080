//! 提示词构建 - 业务能力层
//!
//! 纯函数：评分标准 + 学生身份 + 目录树 + 按角色分组的代码内容 → 提示词。
//! 评分标准由编排层启动时加载后显式注入，这里不做任何文件读取。
//!
//! 没有可识别源代码时走另一条分支：让模型自己根据目录树提出
//! extract_archive 调用（由模型、而不是遍历器，决定学生文件夹里的
//! 压缩包要不要解开）。

use crate::config::Config;
use crate::models::{ClassifiedFileSet, StudentUnit};

/// 提示词构建器
pub struct PromptBuilder {
    rubric: String,
    score_min: i64,
    score_max: i64,
}

impl PromptBuilder {
    /// 创建构建器，评分标准显式传入
    pub fn new(rubric: String, config: &Config) -> Self {
        Self {
            rubric,
            score_min: config.score_min,
            score_max: config.score_max,
        }
    }

    /// 构建一轮评分提示词（不改动任何输入，也不碰文件系统）
    pub fn build(&self, unit: &StudentUnit, classified: &ClassifiedFileSet) -> String {
        let mut prompt = format!(
            "请评分以下学生的作业：\n\
             \n\
             学号：{}\n\
             姓名：{}\n\
             \n\
             文件结构：\n\
             {}\n\
             \n",
            unit.student_id,
            unit.student_name,
            classified.listing.join("\n")
        );

        if classified.has_source_files() {
            prompt.push_str("代码：\n");
            push_section(&mut prompt, "C 文件", &classified.c_files);
            push_section(&mut prompt, "C++ 文件", &classified.cpp_files);
            push_section(&mut prompt, "头文件", &classified.header_files);
            push_section(&mut prompt, "Python 文件", &classified.python_files);
            push_section(&mut prompt, "Makefile 文件", &classified.makefile_files);
        } else {
            // 只有压缩包：让模型提出解压请求，路径都从学生根目录推导
            let root = unit.root_path.display();
            prompt.push_str(&format!(
                "未提供任何代码。请根据文件结构判断是否需要解压缩：如需解压，\
                 请调用 extract_archive 工具，source_path 为 {root} 加上文件结构中\
                 要解压的压缩包文件名；target_path 为 {root} 加上你希望解压后\
                 文件夹的命名。\n"
            ));
        }

        prompt.push_str(&format!(
            "\n\
             评分标准：\n\
             {}\n\
             \n\
             请根据评分标准评分，并使用 write_grading_report 工具生成评分报告。\n\
             评分报告应包含：\n\
             1. 分数（{}-{}）\n\
             2. 详细评语\n\
             3. 改进建议\n\
             \n\
             请确保评分报告的输出路径为：{}\n",
            self.rubric,
            self.score_min,
            self.score_max,
            unit.report_path().display()
        ));

        prompt
    }
}

/// 追加一个带标题的代码分组，每个文件用相对路径分隔
fn push_section(prompt: &mut String, title: &str, files: &[(String, String)]) {
    if files.is_empty() {
        return;
    }
    prompt.push_str(&format!("\n【{}】\n", title));
    for (path, content) in files {
        prompt.push_str(&format!("--- 文件: {} ---\n{}\n", path, content));
    }
}
