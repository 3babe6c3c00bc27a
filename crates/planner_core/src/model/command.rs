//! Command domain model.
//!
//! # Responsibility
//! - Persist a user instruction that mutates an existing record.
//! - Map the free-form `command_text` tag onto a closed set of kinds.
//!
//! # Invariants
//! - A command is executed once by the router and afterwards only serves as
//!   an audit record.
//! - The target table is implied by the kind (`update_note_*` -> notes, ...).

use super::RecordId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub id: RecordId,
    pub command_text: String,
    pub value_before: String,
    pub desired_value: String,
    pub source_note_id: RecordId,
    pub target_id: RecordId,
}

/// Insert payload for a new command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommand {
    pub command_text: String,
    pub value_before: String,
    pub desired_value: String,
    pub source_note_id: RecordId,
    pub target_id: RecordId,
}

/// Table a command operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandTarget {
    Note,
    Todo,
    Action,
}

impl CommandTarget {
    pub fn table(self) -> &'static str {
        match self {
            Self::Note => "notes",
            Self::Todo => "todos",
            Self::Action => "actions",
        }
    }
}

/// Supported command kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    UpdateNoteText,
    UpdateNoteCategory,
    UpdateTodoText,
    UpdateTodoStartTime,
    UpdateTodoEndTime,
    UpdateTodoParent,
    CompleteTodo,
    CancelTodo,
    UpdateActionText,
    UpdateActionTimestamp,
}

impl CommandKind {
    pub const ALL: [CommandKind; 10] = [
        CommandKind::UpdateNoteText,
        CommandKind::UpdateNoteCategory,
        CommandKind::UpdateTodoText,
        CommandKind::UpdateTodoStartTime,
        CommandKind::UpdateTodoEndTime,
        CommandKind::UpdateTodoParent,
        CommandKind::CompleteTodo,
        CommandKind::CancelTodo,
        CommandKind::UpdateActionText,
        CommandKind::UpdateActionTimestamp,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpdateNoteText => "update_note_text",
            Self::UpdateNoteCategory => "update_note_category",
            Self::UpdateTodoText => "update_todo_text",
            Self::UpdateTodoStartTime => "update_todo_start_time",
            Self::UpdateTodoEndTime => "update_todo_end_time",
            Self::UpdateTodoParent => "update_todo_parent",
            Self::CompleteTodo => "complete_todo",
            Self::CancelTodo => "cancel_todo",
            Self::UpdateActionText => "update_action_text",
            Self::UpdateActionTimestamp => "update_action_timestamp",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim();
        Self::ALL.into_iter().find(|kind| kind.as_str() == normalized)
    }

    pub fn target(self) -> CommandTarget {
        match self {
            Self::UpdateNoteText | Self::UpdateNoteCategory => CommandTarget::Note,
            Self::UpdateTodoText
            | Self::UpdateTodoStartTime
            | Self::UpdateTodoEndTime
            | Self::UpdateTodoParent
            | Self::CompleteTodo
            | Self::CancelTodo => CommandTarget::Todo,
            Self::UpdateActionText | Self::UpdateActionTimestamp => CommandTarget::Action,
        }
    }

    /// Whether `desired_value` carries a payload the router reads.
    pub fn needs_value(self) -> bool {
        !matches!(self, Self::CompleteTodo | Self::CancelTodo)
    }
}

impl Command {
    pub fn kind(&self) -> Option<CommandKind> {
        CommandKind::parse(&self.command_text)
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandKind, CommandTarget};

    #[test]
    fn every_kind_roundtrips_through_text() {
        for kind in CommandKind::ALL {
            assert_eq!(CommandKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(CommandKind::parse("delete_everything"), None);
    }

    #[test]
    fn target_table_matches_text_tag() {
        for kind in CommandKind::ALL {
            let tag = match kind.target() {
                CommandTarget::Note => "note",
                CommandTarget::Todo => "todo",
                CommandTarget::Action => "action",
            };
            assert!(kind.as_str().contains(tag), "{} lacks {tag}", kind.as_str());
        }
    }
}
