//! Core of the note planner.
//!
//! Notes are written raw, then a scheduler feeds them one at a time through
//! an LLM tool-calling pipeline that classifies each note and derives
//! actions, todos, curiosities and commands from it.

pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod tools;

pub use config::{ConfigError, Settings};
pub use db::{open_db, open_db_in_memory, DbError};
pub use error::{ProcessError, ProcessResult};
pub use llm::{GatewayError, OpenAiGateway, RetryPolicy, ToolGateway, ToolInvocation, ToolSchema};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::category::Category;
pub use model::note::{Note, NoteState};
pub use model::{RecordId, NO_MATCH_ID};
pub use repo::{RepoError, RepoResult, SqliteStore, Store};
pub use service::{CycleOutcome, NoteProcessor, Scheduler};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
