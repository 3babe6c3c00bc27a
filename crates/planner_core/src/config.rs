//! Runtime settings read from the environment.
//!
//! # Invariants
//! - Every setting has a default except the API key.
//! - A present but unparsable value is an error, never silently defaulted.

use crate::llm::openai::{OPENAI_BASE_URL, XAI_BASE_URL};
use crate::llm::{OpenAiGatewayConfig, RetryPolicy};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Environment variable names.
pub mod env_vars {
    pub const DATA_DIR: &str = "PLANNER_DATA_DIR";
    pub const NOTES_DB_FILENAME: &str = "PLANNER_NOTES_DB_FILENAME";
    pub const LOG_DIR: &str = "PLANNER_LOG_DIR";
    pub const LOG_LEVEL: &str = "PLANNER_LOG_LEVEL";
    pub const CHAT_SERVICE: &str = "PLANNER_CHAT_SERVICE";
    pub const MODEL: &str = "PLANNER_MODEL";
    pub const GATEWAY_ATTEMPTS: &str = "PLANNER_GATEWAY_ATTEMPTS";
    pub const GATEWAY_TIMEOUT_SECS: &str = "PLANNER_GATEWAY_TIMEOUT_SECS";
    pub const MATCH_PAGE_SIZE: &str = "PLANNER_MATCH_PAGE_SIZE";
    pub const MATCH_LOOKBACK: &str = "PLANNER_MATCH_LOOKBACK";
    pub const MATCH_WINDOW_DAYS: &str = "PLANNER_MATCH_WINDOW_DAYS";
    pub const CONTEXT_LIMIT: &str = "PLANNER_CONTEXT_LIMIT";
    pub const REPROCESS: &str = "PLANNER_REPROCESS";
    pub const XAI_API_KEY: &str = "XAI_API_KEY";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
}

/// Default values.
pub mod defaults {
    pub const DATA_DIR: &str = "data";
    pub const NOTES_DB_FILENAME: &str = "notes.db";
    pub const LOG_SUBDIR: &str = "logs";
    pub const GROK_MODEL: &str = "grok-3-mini";
    pub const OPENAI_MODEL: &str = "gpt-4.1";
    pub const GATEWAY_ATTEMPTS: u32 = 3;
    pub const GATEWAY_BACKOFF_MS: u64 = 500;
    pub const MATCH_PAGE_SIZE: u32 = 5;
    pub const MATCH_LOOKBACK: u32 = 150;
    pub const MATCH_WINDOW_DAYS: i64 = 30;
    pub const CONTEXT_LIMIT: u32 = 25;
    pub const REPROCESS: bool = true;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: `{value}` ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("{var} is not set")]
    Missing { var: &'static str },
}

/// LLM backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatService {
    Grok,
    OpenAi,
}

impl ChatService {
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Grok => XAI_BASE_URL,
            Self::OpenAi => OPENAI_BASE_URL,
        }
    }

    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::Grok => env_vars::XAI_API_KEY,
            Self::OpenAi => env_vars::OPENAI_API_KEY,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Grok => defaults::GROK_MODEL,
            Self::OpenAi => defaults::OPENAI_MODEL,
        }
    }
}

impl FromStr for ChatService {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "grok" | "xai" => Ok(Self::Grok),
            "openai" => Ok(Self::OpenAi),
            _ => Err("expected grok|openai".to_string()),
        }
    }
}

/// Bounds of the paginated entity matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatcherSettings {
    pub page_size: u32,
    /// Maximum number of candidates scanned before giving up.
    pub lookback: u32,
    /// Todos older than this many days before the reference time are skipped.
    pub window_days: i64,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            page_size: defaults::MATCH_PAGE_SIZE,
            lookback: defaults::MATCH_LOOKBACK,
            window_days: defaults::MATCH_WINDOW_DAYS,
        }
    }
}

/// Knobs of the note processor and scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessorSettings {
    /// Recent notes/actions/open todos shown as context.
    pub context_limit: u32,
    /// Whether `cycle()` also regenerates reprocess-flagged annotations.
    pub reprocess: bool,
    pub matcher: MatcherSettings,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            context_limit: defaults::CONTEXT_LIMIT,
            reprocess: defaults::REPROCESS,
            matcher: MatcherSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewaySettings {
    pub service: ChatService,
    pub model: String,
    pub attempts: u32,
    /// `None` keeps the transport default.
    pub timeout_secs: Option<u64>,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl GatewaySettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.attempts,
            Duration::from_millis(defaults::GATEWAY_BACKOFF_MS),
        )
    }

    /// Backend config; fails when the service's API key is missing.
    pub fn openai_config(&self) -> Result<OpenAiGatewayConfig, ConfigError> {
        let api_key = self.api_key.clone().ok_or(ConfigError::Missing {
            var: self.service.api_key_var(),
        })?;
        Ok(OpenAiGatewayConfig {
            base_url: self.service.base_url().to_string(),
            api_key,
            model: self.model.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
            retry: self.retry_policy(),
        })
    }
}

/// Everything the CLI needs to wire the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub notes_db_filename: String,
    pub log_dir: PathBuf,
    pub log_level: Option<String>,
    pub gateway: GatewaySettings,
    pub processor: ProcessorSettings,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings from an explicit variable map.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let data_dir = PathBuf::from(get(env_vars::DATA_DIR).unwrap_or_else(|| defaults::DATA_DIR.to_string()));
        let notes_db_filename = get(env_vars::NOTES_DB_FILENAME)
            .unwrap_or_else(|| defaults::NOTES_DB_FILENAME.to_string());
        let log_dir = get(env_vars::LOG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(defaults::LOG_SUBDIR));

        let service = parse_or(env_vars::CHAT_SERVICE, get(env_vars::CHAT_SERVICE), ChatService::Grok)?;
        let model = get(env_vars::MODEL).unwrap_or_else(|| service.default_model().to_string());
        let attempts = parse_or(
            env_vars::GATEWAY_ATTEMPTS,
            get(env_vars::GATEWAY_ATTEMPTS),
            defaults::GATEWAY_ATTEMPTS,
        )?;
        let timeout_secs = get(env_vars::GATEWAY_TIMEOUT_SECS)
            .map(|value| parse_value::<u64>(env_vars::GATEWAY_TIMEOUT_SECS, value))
            .transpose()?;

        let matcher = MatcherSettings {
            page_size: parse_or(env_vars::MATCH_PAGE_SIZE, get(env_vars::MATCH_PAGE_SIZE), defaults::MATCH_PAGE_SIZE)?,
            lookback: parse_or(env_vars::MATCH_LOOKBACK, get(env_vars::MATCH_LOOKBACK), defaults::MATCH_LOOKBACK)?,
            window_days: parse_or(
                env_vars::MATCH_WINDOW_DAYS,
                get(env_vars::MATCH_WINDOW_DAYS),
                defaults::MATCH_WINDOW_DAYS,
            )?,
        };
        require_positive(env_vars::GATEWAY_ATTEMPTS, attempts)?;
        require_positive(env_vars::MATCH_PAGE_SIZE, matcher.page_size)?;

        let processor = ProcessorSettings {
            context_limit: parse_or(env_vars::CONTEXT_LIMIT, get(env_vars::CONTEXT_LIMIT), defaults::CONTEXT_LIMIT)?,
            reprocess: match get(env_vars::REPROCESS) {
                Some(value) => parse_bool(env_vars::REPROCESS, value)?,
                None => defaults::REPROCESS,
            },
            matcher,
        };

        Ok(Self {
            data_dir,
            notes_db_filename,
            log_dir,
            log_level: get(env_vars::LOG_LEVEL),
            gateway: GatewaySettings {
                service,
                model,
                attempts,
                timeout_secs,
                api_key: get(service.api_key_var()),
            },
            processor,
        })
    }

    pub fn notes_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.notes_db_filename)
    }
}

fn parse_value<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|err| ConfigError::Invalid {
        var,
        reason: err.to_string(),
        value,
    })
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.map_or(Ok(default), |value| parse_value(var, value))
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value,
            reason: "expected true|false".to_string(),
        }),
    }
}

fn require_positive(var: &'static str, value: u32) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}
