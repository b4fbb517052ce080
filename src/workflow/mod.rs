pub mod grading_flow;
pub mod student_ctx;

pub use grading_flow::{GradingFlow, LoopOutcome};
pub use student_ctx::StudentCtx;
