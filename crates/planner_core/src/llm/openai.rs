//! OpenAI-compatible chat-completions backend.
//!
//! Works against OpenAI and xAI (Grok), which share the same
//! `/chat/completions` tool-calling envelope.

use crate::llm::{GatewayError, RetryPolicy, ToolGateway, ToolInvocation, ToolSchema};
use log::{debug, info};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const XAI_BASE_URL: &str = "https://api.x.ai/v1";

/// Connection settings for [`OpenAiGateway`].
#[derive(Debug, Clone)]
pub struct OpenAiGatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// `None` keeps the client's own default.
    pub timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

/// Blocking tool-calling client.
#[derive(Debug)]
pub struct OpenAiGateway {
    config: OpenAiGatewayConfig,
    client: Client,
}

impl OpenAiGateway {
    pub fn new(config: OpenAiGatewayConfig) -> Result<Self, GatewayError> {
        if config.api_key.trim().is_empty() {
            return Err(GatewayError::Configuration(
                "api key is empty".to_string(),
            ));
        }
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| GatewayError::Configuration(err.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn call_once(&self, body: &Value) -> Result<Vec<ToolInvocation>, GatewayError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response
            .json()
            .map_err(|err| GatewayError::Malformed(err.to_string()))?;
        extract_tool_invocations(&payload)
    }
}

impl ToolGateway for OpenAiGateway {
    fn call(
        &self,
        instructions: &str,
        input: &str,
        tools: &[ToolSchema],
    ) -> Result<Vec<ToolInvocation>, GatewayError> {
        let started_at = Instant::now();
        let body = build_request_body(&self.config.model, instructions, input, tools);

        let result = self
            .config
            .retry
            .run("chat_completion", |_| self.call_once(&body), GatewayError::is_retryable)
            .map_err(GatewayError::from);

        match &result {
            Ok(calls) => info!(
                "event=gateway_call module=llm status=ok model={} tools_offered={} tool_calls={} duration_ms={}",
                self.config.model,
                tools.len(),
                calls.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => info!(
                "event=gateway_call module=llm status=error model={} duration_ms={} error={}",
                self.config.model,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}

/// Chat-completions request body with the tool menu attached.
pub fn build_request_body(
    model: &str,
    instructions: &str,
    input: &str,
    tools: &[ToolSchema],
) -> Value {
    let mut body = json!({
        "model": model,
        "messages": [
            { "role": "system", "content": instructions },
            { "role": "user", "content": input },
        ],
    });
    if !tools.is_empty() {
        body["tools"] = Value::Array(tools.iter().map(ToolSchema::to_openai_tool_json).collect());
        body["tool_choice"] = json!("auto");
    }
    body
}

/// Pulls `choices[0].message.tool_calls` out of a completion payload.
///
/// A message without tool calls is a valid empty answer. A payload without
/// `choices`, or a call whose arguments are not a JSON object, is malformed.
pub fn extract_tool_invocations(payload: &Value) -> Result<Vec<ToolInvocation>, GatewayError> {
    let message = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| GatewayError::Malformed("response has no choices[0].message".to_string()))?;

    let Some(tool_calls) = message.get("tool_calls").and_then(Value::as_array) else {
        debug!("event=gateway_parse module=llm status=ok tool_calls=0");
        return Ok(Vec::new());
    };

    tool_calls
        .iter()
        .map(|item| {
            let name = item["function"]["name"]
                .as_str()
                .ok_or_else(|| GatewayError::Malformed("tool call without function name".to_string()))?;
            let arguments = match &item["function"]["arguments"] {
                Value::String(raw) if raw.trim().is_empty() => json!({}),
                Value::String(raw) => serde_json::from_str::<Value>(raw).map_err(|err| {
                    GatewayError::Malformed(format!("arguments of `{name}` are not JSON: {err}"))
                })?,
                Value::Object(map) => Value::Object(map.clone()),
                Value::Null => json!({}),
                other => {
                    return Err(GatewayError::Malformed(format!(
                        "arguments of `{name}` have unexpected shape: {other}"
                    )))
                }
            };
            if !arguments.is_object() {
                return Err(GatewayError::Malformed(format!(
                    "arguments of `{name}` are not an object"
                )));
            }
            Ok(ToolInvocation::new(name, arguments))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{build_request_body, extract_tool_invocations, OpenAiGateway, OpenAiGatewayConfig};
    use crate::llm::{GatewayError, RetryPolicy, ToolSchema};
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn request_body_carries_tools_only_when_offered() {
        let tool = ToolSchema::new("create_todo", "d", json!({"type": "object"}));
        let with_tools = build_request_body("m", "sys", "user", &[tool]);
        assert_eq!(with_tools["tools"][0]["function"]["name"], "create_todo");
        assert_eq!(with_tools["messages"][0]["role"], "system");
        assert_eq!(with_tools["messages"][1]["content"], "user");

        let bare = build_request_body("m", "sys", "user", &[]);
        assert!(bare.get("tools").is_none());
    }

    #[test]
    fn extracts_string_encoded_arguments() {
        let payload = json!({
            "choices": [{
                "message": {
                    "tool_calls": [
                        {"id": "c1", "type": "function",
                         "function": {"name": "create_curiosity", "arguments": "{\"curiosity_text\":\"why\"}"}},
                        {"id": "c2", "type": "function",
                         "function": {"name": "create_annotation", "arguments": {"category": "curiosity"}}}
                    ]
                }
            }]
        });
        let calls = extract_tool_invocations(&payload).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "create_curiosity");
        assert_eq!(calls[0].arguments["curiosity_text"], "why");
        assert_eq!(calls[1].arguments["category"], "curiosity");
    }

    #[test]
    fn message_without_tool_calls_is_empty() {
        let payload = json!({"choices": [{"message": {"content": "nothing to do"}}]});
        assert!(extract_tool_invocations(&payload).unwrap().is_empty());
    }

    #[test]
    fn missing_choices_is_malformed() {
        let err = extract_tool_invocations(&json!({"error": "x"})).unwrap_err();
        assert!(matches!(err, GatewayError::Malformed(_)));
    }

    #[test]
    fn unparsable_arguments_are_malformed() {
        let payload = json!({
            "choices": [{"message": {"tool_calls": [
                {"function": {"name": "create_todo", "arguments": "{not json"}}
            ]}}]
        });
        assert!(matches!(
            extract_tool_invocations(&payload),
            Err(GatewayError::Malformed(_))
        ));
    }

    #[test]
    fn empty_api_key_is_configuration_error() {
        let err = OpenAiGateway::new(OpenAiGatewayConfig {
            base_url: super::OPENAI_BASE_URL.to_string(),
            api_key: "  ".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout: Some(Duration::from_secs(5)),
            retry: RetryPolicy::immediate(1),
        })
        .unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }
}
