//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量处理器
//! - 管理应用生命周期（初始化、运行、统计）
//! - 启动时一次性加载评分标准、协商工具 schema
//! - 解压顶层作业包、穿透包装目录、发现学生单元
//! - 严格顺序处理学生，单个学生失败不影响整批
//!
//! ### `student_processor` - 单个学生处理器
//! - 包装单个学生的批改流程调用
//! - 把终态裁决映射成批次统计和日志
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<StudentUnit>)
//!     ↓
//! student_processor (处理单个 StudentUnit)
//!     ↓
//! workflow::GradingFlow (控制回路)
//!     ↓
//! services (能力层：遍历 / 提示词 / 审计)
//!     ↓
//! tools / clients (工具注册表、模型客户端)
//! ```

pub mod batch_processor;
pub mod student_processor;

pub use batch_processor::App;
pub use student_processor::{process_student, StudentOutcome};
