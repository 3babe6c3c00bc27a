//! Domain model for notes and the records derived from them.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep the closed category taxonomy and its prompt text in one place.
//!
//! # Invariants
//! - Every persisted record is identified by a positive SQLite row id.
//! - Id `0` never names a record; LLM tools use it to mean "no match".
//! - Timestamps are Unix epoch milliseconds.

pub mod action;
pub mod annotation;
pub mod category;
pub mod command;
pub mod curiosity;
pub mod note;
pub mod timestamp;
pub mod todo;
pub mod tool_call;

/// Row id shared by every table.
pub type RecordId = i64;

/// Sentinel id used by matcher tools for "none of these".
pub const NO_MATCH_ID: RecordId = 0;
