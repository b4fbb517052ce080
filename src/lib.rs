//! # Grading Agent
//!
//! 一个用于 C/C++/Python 作业自动批改的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `tools/` - 工具注册表，持有本地副作用能力（解压、写报告）
//! - `clients/` - 模型客户端，两个后端归一化成同一个响应形状
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个学生
//! - `SubmissionWalker` - 目录遍历 / 文件分类能力
//! - `PromptBuilder` - 提示词组装能力
//! - `PromptAudit` - 提示词审计落盘能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个学生"的完整批改流程
//! - `StudentCtx` - 上下文封装（学生序号 + 总数）
//! - `GradingFlow` - 控制回路（分类 → 提示词 → 模型 → 工具执行）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量批改处理器，管理资源和统计
//! - `orchestrator/student_processor` - 单个学生处理器，映射终态裁决
//!
//! ## 模块结构

pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod tools;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use cli::{Backend, Cli};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{ClassifiedFileSet, FileRole, StudentUnit};
pub use orchestrator::{process_student, App, StudentOutcome};
pub use tools::ToolRegistry;
pub use workflow::{GradingFlow, LoopOutcome, StudentCtx};
