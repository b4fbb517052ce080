//! 学生提交单元与文件分类数据模型
//!
//! 一个学生 = 一个「学号_姓名」文件夹。文件夹名在第一个下划线处切分，
//! 切不开的视为命名非法，身份退化为 unknown/unknown。

use std::path::{Path, PathBuf};

/// 评分报告的固定文件名，同时也是「已批改」的幂等标记
pub const GRADING_REPORT_FILE: &str = "grading_report.txt";

/// 学生提交单元
#[derive(Debug, Clone)]
pub struct StudentUnit {
    /// 学号
    pub student_id: String,
    /// 姓名
    pub student_name: String,
    /// 提交文件夹根路径
    pub root_path: PathBuf,
    /// 根目录下是否已存在评分报告
    pub has_existing_report: bool,
    /// 文件夹命名是否符合「学号_姓名」格式
    identity_valid: bool,
}

impl StudentUnit {
    /// 从学生文件夹构建提交单元
    ///
    /// 文件夹名在第一个 `_` 处切分为学号与姓名；没有 `_` 的文件夹
    /// 身份退化为 unknown/unknown，由控制回路直接写零分报告。
    pub fn from_dir(root_path: &Path) -> Self {
        let folder_name = root_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let (student_id, student_name, identity_valid) = match folder_name.split_once('_') {
            Some((id, name)) => (id.to_string(), name.to_string(), true),
            None => ("unknown".to_string(), "unknown".to_string(), false),
        };

        let has_existing_report = root_path.join(GRADING_REPORT_FILE).exists();

        Self {
            student_id,
            student_name,
            root_path: root_path.to_path_buf(),
            has_existing_report,
            identity_valid,
        }
    }

    /// 文件夹命名是否合法
    pub fn identity_valid(&self) -> bool {
        self.identity_valid
    }

    /// 该学生评分报告的标准输出路径
    pub fn report_path(&self) -> PathBuf {
        self.root_path.join(GRADING_REPORT_FILE)
    }

    /// 文件夹名（用于日志）
    pub fn folder_name(&self) -> String {
        self.root_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// 文件角色，按扩展名首次匹配，互斥且穷尽
///
/// 匹配顺序：压缩包 > c > 头文件 > cpp > python > makefile > 其他
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    /// 压缩包（.zip / .rar / .tar / .7z）
    Archive,
    /// C 源文件
    CSource,
    /// 头文件
    Header,
    /// C++ 源文件
    CppSource,
    /// Python 源文件
    Python,
    /// Makefile
    Makefile,
    /// 其他文件
    Other,
}

impl FileRole {
    /// 根据文件名判定角色
    pub fn classify(file_name: &str) -> Self {
        let lower = file_name.to_lowercase();
        if lower.ends_with(".zip")
            || lower.ends_with(".rar")
            || lower.ends_with(".tar")
            || lower.ends_with(".7z")
        {
            FileRole::Archive
        } else if lower.ends_with(".c") {
            FileRole::CSource
        } else if lower.ends_with(".h") {
            FileRole::Header
        } else if lower.ends_with(".cpp") {
            FileRole::CppSource
        } else if lower.ends_with(".py") {
            FileRole::Python
        } else if lower.ends_with("makefile") {
            FileRole::Makefile
        } else {
            FileRole::Other
        }
    }
}

/// 学生文件夹的分类结果
///
/// 每个角色对应有序的（相对路径，内容）序列；`listing` 是整棵目录树的
/// 展示列表（文件夹带 📁 前缀，文件带 📄 前缀）。
#[derive(Debug, Default)]
pub struct ClassifiedFileSet {
    /// C 源文件
    pub c_files: Vec<(String, String)>,
    /// 头文件
    pub header_files: Vec<(String, String)>,
    /// C++ 源文件
    pub cpp_files: Vec<(String, String)>,
    /// Python 源文件
    pub python_files: Vec<(String, String)>,
    /// Makefile
    pub makefile_files: Vec<(String, String)>,
    /// 其他可读文件
    pub other_files: Vec<(String, String)>,
    /// 压缩包文件名（只记名称，不读内容）
    pub archives: Vec<String>,
    /// 完整目录树展示列表
    pub listing: Vec<String>,
}

impl ClassifiedFileSet {
    /// 是否存在可识别的源代码文件（c / 头文件 / cpp / python）
    pub fn has_source_files(&self) -> bool {
        !self.c_files.is_empty()
            || !self.header_files.is_empty()
            || !self.cpp_files.is_empty()
            || !self.python_files.is_empty()
    }

    /// 是否存在压缩包
    pub fn has_archives(&self) -> bool {
        !self.archives.is_empty()
    }

    /// 既没有源代码也没有压缩包，完全无从评起
    pub fn nothing_gradeable(&self) -> bool {
        !self.has_source_files() && !self.has_archives()
    }
}
