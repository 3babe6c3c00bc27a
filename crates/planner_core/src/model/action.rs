//! Action domain model.

use super::timestamp::format_timestamp;
use super::RecordId;
use serde::{Deserialize, Serialize};

/// Something the user did, derived from an `action` note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: RecordId,
    pub text: String,
    /// When the action happened, epoch milliseconds.
    pub timestamp: i64,
    pub source_note_id: RecordId,
    pub todo_id: Option<RecordId>,
    /// When set, the linked todo is complete.
    pub mark_complete: bool,
}

/// Insert payload for a new action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAction {
    pub text: String,
    pub timestamp: i64,
    pub source_note_id: RecordId,
    pub todo_id: Option<RecordId>,
    pub mark_complete: bool,
}

impl Action {
    pub fn prompt_line(&self) -> String {
        let link = match self.todo_id {
            Some(todo_id) if self.mark_complete => format!(" (completes todo {todo_id})"),
            Some(todo_id) => format!(" (todo {todo_id})"),
            None => String::new(),
        };
        format!(
            "[action {}] {} - {}{}",
            self.id,
            format_timestamp(self.timestamp),
            self.text,
            link
        )
    }
}
