//! 命令行参数
//!
//! 只负责两件事：要批改哪个压缩包、用哪个模型后端。
//! 其余参数（重试次数、轮数上限、评分标准路径）走配置文件 / 环境变量。

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// 模型后端选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// 托管 Gemini API
    Gemini,
    /// 本地 Ollama 服务
    Ollama,
}

/// C/C++/Python 作业自动批改助教 Agent
#[derive(Debug, Parser)]
#[command(name = "grading_agent", about = "C/C++/Python 作业自动批改助教 Agent")]
pub struct Cli {
    /// 待批改的作业压缩包路径
    #[arg(short, long)]
    pub zip: PathBuf,

    /// 使用的模型后端
    #[arg(short, long, value_enum, default_value_t = Backend::Gemini)]
    pub model: Backend,

    /// 可选的 TOML 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
