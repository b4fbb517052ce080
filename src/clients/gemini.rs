//! Gemini 后端适配器
//!
//! 走 `generateContent` REST 接口。原生响应把函数调用嵌在
//! candidate → content → parts 里，每轮至多一个函数调用槽位；
//! 适配器把它翻译成统一的 [`ModelResponse`]。
//!
//! 遇到 MALFORMED_FUNCTION_CALL 的结束原因时原地重试（无退避），
//! 重试耗尽返回带错误指示、不含工具调用的响应，而不是抛错。

use super::{parse_text_fallback, schema_parameters_json, ModelResponse, ToolCall};
use crate::config::Config;
use crate::error::{AppError, ModelError};
use crate::tools::ToolSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// 结构化输出异常的结束原因标记
const MALFORMED_FUNCTION_CALL: &str = "MALFORMED_FUNCTION_CALL";

/// Gemini 客户端
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model_name: String,
    retries: usize,
    /// set_tools 之后的原生工具声明
    native_tools: Option<Value>,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.gemini_api_key.clone(),
            api_base: config.gemini_api_base.trim_end_matches('/').to_string(),
            model_name: config.gemini_model.clone(),
            retries: config.model_retries,
            native_tools: None,
        }
    }

    /// 把通用 schema 翻译成 functionDeclarations 声明
    pub fn set_tools(&mut self, schemas: &[ToolSchema]) -> Result<(), AppError> {
        let declarations: Vec<Value> = schemas
            .iter()
            .map(|schema| {
                json!({
                    "name": schema.name,
                    "description": schema.description,
                    "parameters": schema_parameters_json(schema),
                })
            })
            .collect();
        self.native_tools = Some(json!([{ "functionDeclarations": declarations }]));
        Ok(())
    }

    pub async fn generate(&self, prompt: &str) -> Result<ModelResponse, AppError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.api_base, self.model_name
        );

        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }],
        });
        if let Some(tools) = &self.native_tools {
            body["tools"] = tools.clone();
        }

        for attempt in 1..=self.retries {
            debug!("调用 Gemini API，模型: {}（第 {} 次）", self.model_name, attempt);

            let response = self
                .http
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| ModelError::ApiCallFailed {
                    model: self.model_name.clone(),
                    source: Box::new(e),
                })?;

            let native: GenerateContentResponse =
                response.json().await.map_err(|e| ModelError::ApiCallFailed {
                    model: self.model_name.clone(),
                    source: Box::new(e),
                })?;

            match normalize(native) {
                Normalized::Ok(model_response) => return Ok(model_response),
                Normalized::Malformed => {
                    warn!(
                        "遇到 {}，正在进行第 {}/{} 次重试...",
                        MALFORMED_FUNCTION_CALL, attempt, self.retries
                    );
                }
                Normalized::Empty => {
                    return Err(ModelError::EmptyResponse {
                        model: self.model_name.clone(),
                    }
                    .into())
                }
            }
        }

        Ok(ModelResponse::exhausted(format!(
            "{}：重试 {} 次后仍无法获得结构化输出",
            MALFORMED_FUNCTION_CALL, self.retries
        )))
    }
}

// ---------- 原生响应形状 ----------

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<NativeFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct NativeFunctionCall {
    name: String,
    args: Option<Value>,
}

enum Normalized {
    Ok(ModelResponse),
    Malformed,
    Empty,
}

/// 把原生 candidate/part 形状翻译成统一响应
fn normalize(native: GenerateContentResponse) -> Normalized {
    let Some(candidate) = native.candidates.and_then(|mut c| {
        if c.is_empty() {
            None
        } else {
            Some(c.remove(0))
        }
    }) else {
        return Normalized::Empty;
    };

    if candidate.finish_reason.as_deref() == Some(MALFORMED_FUNCTION_CALL) {
        return Normalized::Malformed;
    }

    let parts = candidate
        .content
        .and_then(|c| c.parts)
        .unwrap_or_default();

    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();
    for part in parts {
        if let Some(text) = part.text {
            text_parts.push(text);
        }
        if let Some(call) = part.function_call {
            let parameters = call
                .args
                .and_then(|v| v.as_object().cloned())
                .unwrap_or_default();
            tool_calls.push(ToolCall {
                tool_name: call.name,
                parameters,
            });
        }
    }

    let text = if text_parts.is_empty() {
        None
    } else {
        Some(text_parts.join("\n"))
    };

    if tool_calls.is_empty() {
        // 结构化通道为空：尝试从自由文本里兜底解析
        return Normalized::Ok(match text {
            Some(t) => parse_text_fallback(&t),
            None => ModelResponse::default(),
        });
    }

    Normalized::Ok(ModelResponse {
        text,
        tool_calls,
        error: None,
    })
}
