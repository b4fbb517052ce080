//! 学生处理上下文
//!
//! 封装「我正在处理这一批里的第几个学生」这一信息，只用于日志显示

use std::fmt::Display;

/// 学生处理上下文
#[derive(Debug, Clone)]
pub struct StudentCtx {
    /// 学生在本批中的序号（从 1 开始，仅用于日志显示）
    pub student_index: usize,
    /// 批次总人数
    pub total: usize,
}

impl StudentCtx {
    pub fn new(student_index: usize, total: usize) -> Self {
        Self {
            student_index,
            total,
        }
    }
}

impl Display for StudentCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[学生 {}/{}]", self.student_index, self.total)
    }
}
