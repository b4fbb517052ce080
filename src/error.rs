//! 应用程序错误类型
//!
//! 按来源分类：配置 / 文件 / 模型 / 工具
//!
//! 解压失败和「无可评分内容」之类的业务退化不走错误通道：
//! 前者是工具结果（失败消息），后者直接落成零分报告。

use std::path::PathBuf;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误（启动时致命）
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 模型调用错误
    #[error("模型错误: {0}")]
    Model(#[from] ModelError),
    /// 工具调用错误
    #[error("工具错误: {0}")]
    Tool(#[from] ToolError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 评分标准文件缺失
    #[error("评分标准文件不存在: {path}")]
    RubricNotFound { path: PathBuf },
    /// 配置的外部解压工具不可用
    #[error("外部解压工具不存在: {path}")]
    UnrarToolNotFound { path: String },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    ConfigFileInvalid {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: PathBuf },
}

/// 模型调用错误
#[derive(Debug, Error)]
pub enum ModelError {
    /// API 调用失败
    #[error("模型 API 调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 模型返回结果为空
    #[error("模型返回结果为空 (模型: {model})")]
    EmptyResponse { model: String },
}

/// 工具调用错误
#[derive(Debug, Error)]
pub enum ToolError {
    /// 模型请求了未注册的工具（协议违规，不是静默忽略）
    #[error("未知工具: {name}")]
    UnknownTool { name: String },
    /// 工具参数缺失或类型不对
    #[error("工具 {tool} 缺少参数: {param}")]
    MissingParameter { tool: String, param: String },
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
