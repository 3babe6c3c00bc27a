//! Todo domain model.
//!
//! # Responsibility
//! - Hold a task the user intends to do, organized as a tree via `parent_id`.
//! - Validate field-level invariants before persistence.
//!
//! # Invariants
//! - `text` is not blank.
//! - `parent_id` never equals the todo's own id.
//! - `target_end_time` is not earlier than `target_start_time` when both set.
//!
//! Deeper tree checks (parent exists, no longer cycles) need storage access
//! and live in the todo repository.

use super::timestamp::format_timestamp;
use super::RecordId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: RecordId,
    pub text: String,
    pub source_note_id: RecordId,
    pub parent_id: Option<RecordId>,
    pub target_start_time: Option<i64>,
    pub target_end_time: Option<i64>,
    pub complete: bool,
    pub cancelled: bool,
}

/// Insert payload for a new todo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub text: String,
    pub source_note_id: RecordId,
    pub parent_id: Option<RecordId>,
    pub target_start_time: Option<i64>,
    pub target_end_time: Option<i64>,
}

/// Field-level validation failures for todos.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoValidationError {
    #[error("todo text must not be blank")]
    BlankText,
    #[error("todo {todo_id} cannot be its own parent")]
    SelfParent { todo_id: RecordId },
    #[error("todo end {end} is earlier than start {start}")]
    EndBeforeStart { start: i64, end: i64 },
    #[error("todo {todo_id} cannot be both complete and cancelled")]
    CompleteAndCancelled { todo_id: RecordId },
}

impl Todo {
    pub fn is_open(&self) -> bool {
        !self.complete && !self.cancelled
    }

    pub fn validate(&self) -> Result<(), TodoValidationError> {
        if self.text.trim().is_empty() {
            return Err(TodoValidationError::BlankText);
        }
        if self.parent_id == Some(self.id) {
            return Err(TodoValidationError::SelfParent { todo_id: self.id });
        }
        if self.complete && self.cancelled {
            return Err(TodoValidationError::CompleteAndCancelled { todo_id: self.id });
        }
        validate_window(self.target_start_time, self.target_end_time)
    }

    pub fn prompt_line(&self) -> String {
        let mut line = format!("[todo {}] {}", self.id, self.text);
        if let Some(parent_id) = self.parent_id {
            line.push_str(&format!(" (subtask of {parent_id})"));
        }
        if let Some(start) = self.target_start_time {
            line.push_str(&format!(" start={}", format_timestamp(start)));
        }
        if let Some(end) = self.target_end_time {
            line.push_str(&format!(" end={}", format_timestamp(end)));
        }
        if self.complete {
            line.push_str(" [complete]");
        } else if self.cancelled {
            line.push_str(" [cancelled]");
        }
        line
    }
}

impl NewTodo {
    pub fn validate(&self) -> Result<(), TodoValidationError> {
        if self.text.trim().is_empty() {
            return Err(TodoValidationError::BlankText);
        }
        validate_window(self.target_start_time, self.target_end_time)
    }
}

fn validate_window(start: Option<i64>, end: Option<i64>) -> Result<(), TodoValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => {
            Err(TodoValidationError::EndBeforeStart { start, end })
        }
        _ => Ok(()),
    }
}
