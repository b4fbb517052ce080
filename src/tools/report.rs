//! 评分报告写入 - 工具实现
//!
//! 报告是固定版式的 UTF-8 纯文本，先写临时文件再重命名，
//! 调用方永远看不到写到一半的报告。

use super::ToolResult;
use std::fs;
use std::path::Path;
use tracing::warn;

/// 写入评分报告
///
/// 分数会被收敛到配置的评分范围内；父目录不存在时自动创建；
/// 已存在的报告被原子覆盖。
pub(crate) fn write_grading_report(
    student_id: &str,
    student_name: &str,
    score: i64,
    comments: &str,
    output_path: &Path,
    score_min: i64,
    score_max: i64,
) -> ToolResult {
    let clamped = score.clamp(score_min, score_max);
    if clamped != score {
        warn!(
            "分数 {} 超出范围 [{}, {}]，已收敛为 {}",
            score, score_min, score_max, clamped
        );
    }

    let content = format!(
        "评分报告\n\
         ==========\n\
         \n\
         学号：{}\n\
         姓名：{}\n\
         分数：{}\n\
         \n\
         评语：\n\
         {}\n",
        student_id, student_name, clamped, comments
    );

    if let Some(parent) = output_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            return ToolResult::failure(format!(
                "无法创建报告目录 {}: {}",
                parent.display(),
                e
            ));
        }
    }

    // 临时文件 + rename，保证不会留下半截报告
    let tmp_path = output_path.with_extension("txt.tmp");
    if let Err(e) = fs::write(&tmp_path, content) {
        return ToolResult::failure(format!("写入评分报告失败 {}: {}", tmp_path.display(), e));
    }
    if let Err(e) = fs::rename(&tmp_path, output_path) {
        let _ = fs::remove_file(&tmp_path);
        return ToolResult::failure(format!(
            "写入评分报告失败 {}: {}",
            output_path.display(),
            e
        ));
    }

    ToolResult::success(format!("评分报告已写入 {}", output_path.display()))
}
