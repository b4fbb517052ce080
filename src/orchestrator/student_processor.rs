//! 单个学生处理器 - 编排层
//!
//! ## 职责
//!
//! 包装单个学生的批改流程调用，把流程层的终态裁决翻译成
//! 批次统计需要的结果，并负责学生级别的日志输出。
//!
//! 单个学生失败（模型不配合、文件读不出来）只会被记为 Failed，
//! 不会中断整批处理。

use crate::models::StudentUnit;
use crate::workflow::{GradingFlow, LoopOutcome, StudentCtx};
use crate::clients::ModelClient;
use anyhow::Result;
use tracing::{error, info};

/// 单个学生的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentOutcome {
    /// 评分报告已写出（含零分报告）
    Graded,
    /// 已有评分报告，本次跳过
    Skipped,
    /// 未能产出评分报告
    Failed,
}

/// 处理单个学生
///
/// # 参数
/// - `flow`: 批改流程（整批复用）
/// - `unit`: 学生单元
/// - `ctx`: 学生上下文（用于日志）
///
/// # 返回
/// 返回该学生的处理结果；基础设施错误向上传播，由批量处理器计为失败。
pub async fn process_student<C: ModelClient>(
    flow: &GradingFlow<'_, C>,
    unit: &StudentUnit,
    ctx: &StudentCtx,
) -> Result<StudentOutcome> {
    log_student_start(ctx, unit);

    // 在进入流程之前记住是否已有报告，Stop 才能区分「批改完成」和「跳过」
    let already_graded = unit.has_existing_report;

    match flow.run(unit, ctx).await? {
        LoopOutcome::Stop if already_graded => Ok(StudentOutcome::Skipped),
        LoopOutcome::Stop => {
            info!("{} ✅ 评分报告已生成: {}", ctx, unit.report_path().display());
            Ok(StudentOutcome::Graded)
        }
        LoopOutcome::Continue => {
            // run() 只在终态返回，这里属于逻辑错误
            error!("{} 流程在非终态退出", ctx);
            Ok(StudentOutcome::Failed)
        }
        LoopOutcome::Error(reason) => {
            error!("{} ❌ 批改失败: {}", ctx, reason);
            Ok(StudentOutcome::Failed)
        }
    }
}

// ========== 日志辅助函数 ==========

fn log_student_start(ctx: &StudentCtx, unit: &StudentUnit) {
    info!("\n{} {}", ctx, "─".repeat(30));
    info!("{} 学号: {}", ctx, unit.student_id);
    info!("{} 姓名: {}", ctx, unit.student_name);
}
