//! 工具注册表 / 执行器
//!
//! 对外暴露一组固定的、带 schema 描述的副作用操作：
//! - `extract_archive`：解压压缩包（ZIP 内置，RAR 走外部工具）
//! - `write_grading_report`：写评分报告
//!
//! 执行结果用结构化的 [`ToolOutcome`] 表达成功 / 失败，
//! 不靠在消息文本里嵌「成功」「错误」之类的子串。

mod extract;
mod report;

use crate::config::Config;
use crate::error::{ConfigError, ToolError};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// 工具参数描述
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// 参数名
    pub name: &'static str,
    /// JSON 类型（string / integer）
    pub param_type: &'static str,
    /// 人类可读的说明
    pub title: &'static str,
    /// 是否必填
    pub required: bool,
}

/// 工具 schema：名称、说明、参数表
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParamSpec>,
}

impl ToolSchema {
    /// 必填参数名列表
    pub fn required_params(&self) -> Vec<&'static str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect()
    }
}

/// 工具执行结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOutcome {
    Success,
    Failure,
}

/// 工具执行结果：结论 + 人类可读消息
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub outcome: ToolOutcome,
    pub message: String,
}

impl ToolResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            outcome: ToolOutcome::Success,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            outcome: ToolOutcome::Failure,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == ToolOutcome::Success
    }
}

/// `extract_archive` 工具名
pub const TOOL_EXTRACT_ARCHIVE: &str = "extract_archive";
/// `write_grading_report` 工具名
pub const TOOL_WRITE_REPORT: &str = "write_grading_report";

/// 工具注册表
///
/// 除配置（外部解压工具路径、评分范围）外不持有任何内存状态，
/// 副作用是它与外界沟通的唯一方式。
pub struct ToolRegistry {
    unrar_tool: Option<String>,
    score_min: i64,
    score_max: i64,
}

impl ToolRegistry {
    /// 从配置创建注册表
    pub fn new(config: &Config) -> Self {
        Self {
            unrar_tool: config.unrar_tool.clone(),
            score_min: config.score_min,
            score_max: config.score_max,
        }
    }

    /// 校验配置的外部工具是否可用（配置了但不存在即启动失败）
    pub fn check_external_tools(&self) -> Result<(), ConfigError> {
        if let Some(tool) = &self.unrar_tool {
            if !Path::new(tool).exists() {
                return Err(ConfigError::UnrarToolNotFound { path: tool.clone() });
            }
        }
        Ok(())
    }

    /// 列出全部工具 schema（顺序固定）
    pub fn discover(&self) -> Vec<ToolSchema> {
        vec![
            ToolSchema {
                name: TOOL_EXTRACT_ARCHIVE,
                description: "解压缩指定的压缩包（支持 ZIP，配置外部工具后支持 RAR）到目标目录，\
                              目标目录不存在时会自动创建",
                parameters: vec![
                    ParamSpec {
                        name: "source_path",
                        param_type: "string",
                        title: "来源压缩包路径",
                        required: true,
                    },
                    ParamSpec {
                        name: "target_path",
                        param_type: "string",
                        title: "解压目标目录",
                        required: true,
                    },
                ],
            },
            ToolSchema {
                name: TOOL_WRITE_REPORT,
                description: "将学生的评分报告写入指定路径，已存在的报告会被覆盖",
                parameters: vec![
                    ParamSpec {
                        name: "student_id",
                        param_type: "string",
                        title: "学号",
                        required: true,
                    },
                    ParamSpec {
                        name: "student_name",
                        param_type: "string",
                        title: "姓名",
                        required: true,
                    },
                    ParamSpec {
                        name: "score",
                        param_type: "integer",
                        title: "分数",
                        required: true,
                    },
                    ParamSpec {
                        name: "comments",
                        param_type: "string",
                        title: "评语",
                        required: true,
                    },
                    ParamSpec {
                        name: "output_path",
                        param_type: "string",
                        title: "报告输出路径",
                        required: true,
                    },
                ],
            },
        ]
    }

    /// 按名称执行工具
    ///
    /// 未注册的工具名是协议违规，返回错误而不是静默忽略。
    pub fn invoke(&self, name: &str, parameters: &Map<String, Value>) -> Result<ToolResult, ToolError> {
        match name {
            TOOL_EXTRACT_ARCHIVE => {
                let source = required_path(name, parameters, "source_path")?;
                let target = required_path(name, parameters, "target_path")?;
                Ok(extract::extract_archive(
                    &source,
                    &target,
                    self.unrar_tool.as_deref(),
                ))
            }
            TOOL_WRITE_REPORT => {
                let student_id = required_str(name, parameters, "student_id")?;
                let student_name = required_str(name, parameters, "student_name")?;
                let score = required_int(name, parameters, "score")?;
                let comments = required_str(name, parameters, "comments")?;
                let output_path = required_path(name, parameters, "output_path")?;
                Ok(report::write_grading_report(
                    &student_id,
                    &student_name,
                    score,
                    &comments,
                    &output_path,
                    self.score_min,
                    self.score_max,
                ))
            }
            other => Err(ToolError::UnknownTool {
                name: other.to_string(),
            }),
        }
    }
}

fn required_str(
    tool: &str,
    parameters: &Map<String, Value>,
    param: &str,
) -> Result<String, ToolError> {
    parameters
        .get(param)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ToolError::MissingParameter {
            tool: tool.to_string(),
            param: param.to_string(),
        })
}

fn required_path(
    tool: &str,
    parameters: &Map<String, Value>,
    param: &str,
) -> Result<PathBuf, ToolError> {
    required_str(tool, parameters, param).map(PathBuf::from)
}

/// 分数可能以数字或字符串形式出现，两种都接受
fn required_int(
    tool: &str,
    parameters: &Map<String, Value>,
    param: &str,
) -> Result<i64, ToolError> {
    let value = parameters.get(param).ok_or_else(|| ToolError::MissingParameter {
        tool: tool.to_string(),
        param: param.to_string(),
    })?;
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| ToolError::MissingParameter {
            tool: tool.to_string(),
            param: param.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_registry() -> ToolRegistry {
        ToolRegistry {
            unrar_tool: None,
            score_min: 0,
            score_max: 100,
        }
    }

    #[test]
    fn test_discover_returns_two_tools() {
        let registry = test_registry();
        let schemas = registry.discover();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].name, TOOL_EXTRACT_ARCHIVE);
        assert_eq!(schemas[1].name, TOOL_WRITE_REPORT);
        assert_eq!(
            schemas[0].required_params(),
            vec!["source_path", "target_path"]
        );
        assert_eq!(schemas[1].required_params().len(), 5);
    }

    #[test]
    fn test_invoke_unknown_tool_is_error() {
        let registry = test_registry();
        let result = registry.invoke("rm_rf", &Map::new());
        assert!(matches!(result, Err(ToolError::UnknownTool { .. })));
    }

    #[test]
    fn test_invoke_missing_parameter() {
        let registry = test_registry();
        let mut params = Map::new();
        params.insert("source_path".to_string(), json!("a.zip"));
        let result = registry.invoke(TOOL_EXTRACT_ARCHIVE, &params);
        assert!(matches!(
            result,
            Err(ToolError::MissingParameter { .. })
        ));
    }

    #[test]
    fn test_required_int_accepts_string_score() {
        let mut params = Map::new();
        params.insert("score".to_string(), json!("85"));
        assert_eq!(required_int("t", &params, "score").unwrap(), 85);

        params.insert("score".to_string(), json!(92));
        assert_eq!(required_int("t", &params, "score").unwrap(), 92);
    }
}
