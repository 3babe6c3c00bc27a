//! LLM tool gateway abstraction.
//!
//! # Responsibility
//! - Define the synchronous tool-calling contract the pipeline depends on.
//! - Keep backend specifics (HTTP, auth, JSON envelopes) behind one trait.
//!
//! # Invariants
//! - A gateway call returns zero or more tool invocations, each with a tool
//!   name and a JSON object of arguments.
//! - Transient failures are retried inside the backend with a bounded
//!   [`RetryPolicy`]; exhaustion surfaces as [`GatewayError::Exhausted`].

pub mod openai;
pub mod retry;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub use openai::{OpenAiGateway, OpenAiGatewayConfig};
pub use retry::{RetryError, RetryPolicy};

/// One function tool offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Chat-completions `tools[]` entry.
    pub fn to_openai_tool_json(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// One structured tool call returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Serialized `{name, arguments}` used by the audit trail.
    pub fn to_audit_json(&self) -> String {
        json!({ "name": self.name, "arguments": self.arguments }).to_string()
    }
}

/// Gateway failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network or connection failure.
    #[error("gateway transport failure: {0}")]
    Transport(String),
    /// Backend answered with a non-success HTTP status.
    #[error("gateway returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// Backend answered, but not with the structured output we asked for.
    #[error("gateway returned malformed output: {0}")]
    Malformed(String),
    /// Bad or missing backend configuration (e.g. API key).
    #[error("gateway misconfigured: {0}")]
    Configuration(String),
    /// The retry budget ran out; `last` is the final attempt's failure.
    #[error("gateway failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<GatewayError>,
    },
}

impl GatewayError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Malformed(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Configuration(_) | Self::Exhausted { .. } => false,
        }
    }
}

impl From<RetryError<GatewayError>> for GatewayError {
    fn from(value: RetryError<GatewayError>) -> Self {
        match value {
            RetryError::Fatal(err) => err,
            RetryError::Exhausted { attempts, last } => Self::Exhausted {
                attempts,
                last: Box::new(last),
            },
        }
    }
}

/// Synchronous structured tool-calling interface over an LLM backend.
pub trait ToolGateway {
    /// Sends `instructions` as the system prompt and `input` as the user
    /// message, offering `tools`; returns the tool calls the model made.
    fn call(
        &self,
        instructions: &str,
        input: &str,
        tools: &[ToolSchema],
    ) -> Result<Vec<ToolInvocation>, GatewayError>;
}

impl<G: ToolGateway + ?Sized> ToolGateway for &G {
    fn call(
        &self,
        instructions: &str,
        input: &str,
        tools: &[ToolSchema],
    ) -> Result<Vec<ToolInvocation>, GatewayError> {
        (**self).call(instructions, input, tools)
    }
}

impl<G: ToolGateway + ?Sized> ToolGateway for Box<G> {
    fn call(
        &self,
        instructions: &str,
        input: &str,
        tools: &[ToolSchema],
    ) -> Result<Vec<ToolInvocation>, GatewayError> {
        (**self).call(instructions, input, tools)
    }
}

#[cfg(test)]
mod tests {
    use super::{GatewayError, RetryError, ToolInvocation, ToolSchema};
    use serde_json::json;

    #[test]
    fn openai_tool_json_wraps_function() {
        let schema = ToolSchema::new("create_curiosity", "desc", json!({"type": "object"}));
        let value = schema.to_openai_tool_json();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "create_curiosity");
        assert_eq!(value["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn audit_json_keeps_name_and_arguments() {
        let call = ToolInvocation::new("create_todo", json!({"todo_text": "call mom"}));
        let parsed: serde_json::Value = serde_json::from_str(&call.to_audit_json()).unwrap();
        assert_eq!(parsed["name"], "create_todo");
        assert_eq!(parsed["arguments"]["todo_text"], "call mom");
    }

    #[test]
    fn retryable_classification() {
        assert!(GatewayError::Transport("reset".into()).is_retryable());
        assert!(GatewayError::Malformed("not json".into()).is_retryable());
        assert!(GatewayError::Status {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!GatewayError::Status {
            status: 401,
            body: String::new()
        }
        .is_retryable());
        assert!(!GatewayError::Configuration("no key".into()).is_retryable());
    }

    #[test]
    fn exhausted_retry_converts_to_gateway_exhausted() {
        let err: GatewayError = RetryError::Exhausted {
            attempts: 3,
            last: GatewayError::Transport("timeout".into()),
        }
        .into();
        assert!(matches!(err, GatewayError::Exhausted { attempts: 3, .. }));
    }
}
