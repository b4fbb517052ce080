//! 提示词审计 - 业务能力层
//!
//! 把每一轮实际发送的完整提示词追加到审计文件，只用于事后排查，
//! 不参与任何控制决策。

use crate::error::{AppError, FileError};
use crate::models::StudentUnit;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// 提示词审计写入器
pub struct PromptAudit {
    audit_file_path: String,
}

impl PromptAudit {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            audit_file_path: path.into(),
        }
    }

    /// 追加一条审计记录：学生、轮次、时间戳、完整提示词
    pub fn record(&self, unit: &StudentUnit, round: usize, prompt: &str) -> Result<(), AppError> {
        debug!(
            "记录提示词审计: 学生 {} | 第 {} 轮 | 长度 {} 字符",
            unit.student_id,
            round,
            prompt.chars().count()
        );

        let entry = format!(
            "{}\n学生 {}_{} | 第 {} 轮 | {}\n{}\n{}\n\n",
            "=".repeat(60),
            unit.student_id,
            unit.student_name,
            round,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            "=".repeat(60),
            prompt
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_file_path)
            .map_err(|e| FileError::WriteFailed {
                path: PathBuf::from(&self.audit_file_path),
                source: e,
            })?;

        file.write_all(entry.as_bytes())
            .map_err(|e| FileError::WriteFailed {
                path: PathBuf::from(&self.audit_file_path),
                source: e,
            })?;

        Ok(())
    }
}
