//! Ollama 后端适配器
//!
//! 走本地服务的 `/api/chat` 接口。原生响应把工具调用放在
//! message.tool_calls 列表上，参数已经是 JSON 对象；适配器把它
//! 翻译成统一的 [`ModelResponse`]。
//!
//! 工具调用参数形状不对时原地重试（无退避），重试耗尽返回带
//! 错误指示、不含工具调用的响应，而不是抛错。

use super::{parse_text_fallback, schema_parameters_json, ModelResponse, ToolCall};
use crate::config::Config;
use crate::error::{AppError, ModelError};
use crate::tools::ToolSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Ollama 客户端
pub struct OllamaClient {
    http: reqwest::Client,
    host: String,
    model_name: String,
    retries: usize,
    /// set_tools 之后的原生工具声明
    native_tools: Option<Value>,
}

impl OllamaClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: config.ollama_host.trim_end_matches('/').to_string(),
            model_name: config.ollama_model.clone(),
            retries: config.model_retries,
            native_tools: None,
        }
    }

    /// 把通用 schema 翻译成 {"type": "function", "function": ...} 声明
    pub fn set_tools(&mut self, schemas: &[ToolSchema]) -> Result<(), AppError> {
        let tools: Vec<Value> = schemas
            .iter()
            .map(|schema| {
                json!({
                    "type": "function",
                    "function": {
                        "name": schema.name,
                        "description": schema.description,
                        "parameters": schema_parameters_json(schema),
                    },
                })
            })
            .collect();
        self.native_tools = Some(Value::Array(tools));
        Ok(())
    }

    pub async fn generate(&self, prompt: &str) -> Result<ModelResponse, AppError> {
        let url = format!("{}/api/chat", self.host);

        let mut body = json!({
            "model": self.model_name,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
            "options": {
                // 低温度让工具调用更稳定
                "temperature": 0.1,
                "num_ctx": 16384,
                "repeat_penalty": 1.2,
            },
        });
        if let Some(tools) = &self.native_tools {
            body["tools"] = tools.clone();
        }

        for attempt in 1..=self.retries {
            debug!("调用 Ollama API，模型: {}（第 {} 次）", self.model_name, attempt);

            let response = self
                .http
                .post(&url)
                .json(&body)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| ModelError::ApiCallFailed {
                    model: self.model_name.clone(),
                    source: Box::new(e),
                })?;

            let native: ChatResponse =
                response.json().await.map_err(|e| ModelError::ApiCallFailed {
                    model: self.model_name.clone(),
                    source: Box::new(e),
                })?;

            match normalize(native) {
                Normalized::Ok(model_response) => return Ok(model_response),
                Normalized::Malformed => {
                    warn!(
                        "工具调用参数形状异常，正在进行第 {}/{} 次重试...",
                        attempt, self.retries
                    );
                }
            }
        }

        Ok(ModelResponse::exhausted(format!(
            "重试 {} 次后仍无法获得合法的工具调用",
            self.retries
        )))
    }
}

// ---------- 原生响应形状 ----------

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<NativeToolCall>,
}

#[derive(Debug, Deserialize)]
struct NativeToolCall {
    function: NativeFunction,
}

#[derive(Debug, Deserialize)]
struct NativeFunction {
    name: String,
    arguments: Option<Value>,
}

enum Normalized {
    Ok(ModelResponse),
    Malformed,
}

/// 把原生 message.tool_calls 形状翻译成统一响应
fn normalize(native: ChatResponse) -> Normalized {
    let Some(message) = native.message else {
        // 没有 message 等同于空文本响应
        return Normalized::Ok(ModelResponse::default());
    };

    let text = message.content.filter(|c| !c.is_empty());

    if message.tool_calls.is_empty() {
        return Normalized::Ok(match text {
            Some(t) => parse_text_fallback(&t),
            None => ModelResponse::default(),
        });
    }

    let mut tool_calls = Vec::new();
    for call in message.tool_calls {
        // 参数必须是 JSON 对象，否则当作结构化输出异常重试
        let Some(parameters) = call.function.arguments.as_ref().and_then(|v| v.as_object())
        else {
            return Normalized::Malformed;
        };
        tool_calls.push(ToolCall {
            tool_name: call.function.name,
            parameters: parameters.clone(),
        });
    }

    Normalized::Ok(ModelResponse {
        text,
        tool_calls,
        error: None,
    })
}
