//! 模型客户端抽象 - 能力层
//!
//! 统一契约：给定文本提示词和一组工具 schema，返回纯文本或结构化的
//! 工具调用。两个后端（托管 Gemini API / 本地 Ollama 服务）的原生响应
//! 形状各不相同，各自的适配器负责翻译成同一个 [`ModelResponse`]，
//! 后端专有的字段名不允许泄漏出适配器边界。

pub mod gemini;
pub mod ollama;

use crate::cli::Backend;
use crate::config::Config;
use crate::error::AppError;
use crate::tools::ToolSchema;
use regex::Regex;
use serde_json::{Map, Value};

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;

/// 一次结构化工具调用
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// 工具名，必须出自工具注册表
    pub tool_name: String,
    /// 参数表
    pub parameters: Map<String, Value>,
}

/// 归一化后的模型响应
///
/// 要么是纯文本，要么带一串有序的工具调用；`error` 标记重试耗尽等
/// 「这一轮没有可执行指令」的情况，调用方不应把它当成致命错误。
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    /// 文本回复（可能为空）
    pub text: Option<String>,
    /// 工具调用序列（按设计只有第一个会被执行）
    pub tool_calls: Vec<ToolCall>,
    /// 错误指示（例如结构化输出重试耗尽）
    pub error: Option<String>,
}

impl ModelResponse {
    /// 纯文本响应
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// 重试耗尽等错误：无工具调用，带错误指示
    pub fn exhausted(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Default::default()
        }
    }

    /// 第一个工具调用（其余按设计忽略）
    pub fn first_tool_call(&self) -> Option<&ToolCall> {
        self.tool_calls.first()
    }
}

/// 模型客户端契约
///
/// `set_tools` 在每个会话开始前恰好调用一次；`generate` 对调用方而言
/// 是同步语义的（内部可以重试）。
pub trait ModelClient {
    /// 把通用工具 schema 翻译成后端的原生工具声明格式
    fn set_tools(&mut self, schemas: &[ToolSchema]) -> Result<(), AppError>;

    /// 发送提示词并取回归一化响应
    fn generate(
        &self,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<ModelResponse, AppError>>;
}

/// 生产用的后端集合（枚举分发）
pub enum ModelBackend {
    Gemini(GeminiClient),
    Ollama(OllamaClient),
}

impl ModelBackend {
    /// 按命令行选择构建后端
    pub fn from_config(backend: Backend, config: &Config) -> Self {
        match backend {
            Backend::Gemini => ModelBackend::Gemini(GeminiClient::new(config)),
            Backend::Ollama => ModelBackend::Ollama(OllamaClient::new(config)),
        }
    }

    /// 后端名称（用于日志）
    pub fn name(&self) -> &'static str {
        match self {
            ModelBackend::Gemini(_) => "gemini",
            ModelBackend::Ollama(_) => "ollama",
        }
    }
}

impl ModelClient for ModelBackend {
    fn set_tools(&mut self, schemas: &[ToolSchema]) -> Result<(), AppError> {
        match self {
            ModelBackend::Gemini(c) => c.set_tools(schemas),
            ModelBackend::Ollama(c) => c.set_tools(schemas),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<ModelResponse, AppError> {
        match self {
            ModelBackend::Gemini(c) => c.generate(prompt).await,
            ModelBackend::Ollama(c) => c.generate(prompt).await,
        }
    }
}

/// 把通用参数表翻译成 JSON Schema 形式的 `parameters` 对象
///
/// 两个后端的工具声明都吃这个形状，必填/选填信息不丢失。
pub(crate) fn schema_parameters_json(schema: &ToolSchema) -> Value {
    let mut properties = Map::new();
    for param in &schema.parameters {
        properties.insert(
            param.name.to_string(),
            serde_json::json!({
                "type": param.param_type,
                "description": param.title,
            }),
        );
    }
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": schema.required_params(),
    })
}

/// 兜底解析：结构化工具调用通道为空时，尝试把自由文本里内嵌的
/// JSON 对象当作工具调用解析；失败则原样返回纯文本。
pub(crate) fn parse_text_fallback(text: &str) -> ModelResponse {
    if let Some(calls) = extract_embedded_tool_calls(text) {
        return ModelResponse {
            text: Some(text.to_string()),
            tool_calls: calls,
            error: None,
        };
    }
    ModelResponse::text_only(text)
}

fn extract_embedded_tool_calls(text: &str) -> Option<Vec<ToolCall>> {
    // 贪婪匹配第一个 { 到最后一个 }，覆盖跨行 JSON
    let re = Regex::new(r"(?s)\{.*\}").ok()?;
    let candidate = re.find(text)?.as_str();
    let value: Value = serde_json::from_str(candidate).ok()?;

    // 形状 1: {"tool": "...", "parameters": {...}}
    if let Some(call) = tool_call_from_value(&value) {
        return Some(vec![call]);
    }

    // 形状 2: {"tool_calls": [{"tool": "...", "parameters": {...}}, ...]}
    if let Some(items) = value.get("tool_calls").and_then(|v| v.as_array()) {
        let calls: Vec<ToolCall> = items.iter().filter_map(tool_call_from_value).collect();
        if !calls.is_empty() {
            return Some(calls);
        }
    }

    None
}

fn tool_call_from_value(value: &Value) -> Option<ToolCall> {
    let tool_name = value
        .get("tool")
        .or_else(|| value.get("tool_name"))
        .or_else(|| value.get("name"))?
        .as_str()?
        .to_string();
    let parameters = value
        .get("parameters")
        .or_else(|| value.get("arguments"))
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();
    Some(ToolCall {
        tool_name,
        parameters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ParamSpec, ToolSchema};

    fn sample_schema() -> ToolSchema {
        ToolSchema {
            name: "extract_archive",
            description: "解压缩",
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
                    required: false,
                },
            ],
        }
    }

    #[test]
    fn test_schema_parameters_json_keeps_required_list() {
        let json = schema_parameters_json(&sample_schema());
        assert_eq!(json["type"], "object");
        assert_eq!(json["properties"]["source_path"]["type"], "string");
        assert_eq!(json["required"], serde_json::json!(["source_path"]));
    }

    #[test]
    fn test_fallback_parses_single_tool_object() {
        let text = r#"我认为需要先解压。{"tool": "extract_archive", "parameters": {"source_path": "a.zip", "target_path": "a"}}"#;
        let response = parse_text_fallback(text);
        let call = response.first_tool_call().expect("应解析出工具调用");
        assert_eq!(call.tool_name, "extract_archive");
        assert_eq!(call.parameters["source_path"], "a.zip");
    }

    #[test]
    fn test_fallback_parses_tool_calls_array() {
        let text = r#"{"tool_calls": [{"tool": "write_grading_report", "parameters": {"score": 90}}]}"#;
        let response = parse_text_fallback(text);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].tool_name, "write_grading_report");
    }

    #[test]
    fn test_fallback_plain_text_has_no_tool_calls() {
        let response = parse_text_fallback("这位学生的代码写得不错。");
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.text.as_deref(), Some("这位学生的代码写得不错。"));
        assert!(response.error.is_none());
    }
}
