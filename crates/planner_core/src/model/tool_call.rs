//! Tool-call audit record.
//!
//! Rows are append-only: one per applied tool invocation, never mutated.

use super::RecordId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: RecordId,
    pub source_note_id: RecordId,
    pub target_table: String,
    /// `0` when the invocation failed before a target existed.
    pub target_id: RecordId,
    /// JSON snapshot of the target before modification, for updates.
    pub target: Option<String>,
    /// JSON of `{name, arguments}` as returned by the gateway.
    pub tool_call: String,
    pub error_text: String,
}

/// Insert payload for a new audit row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewToolCall {
    pub source_note_id: RecordId,
    pub target_table: String,
    pub target_id: RecordId,
    pub target: Option<String>,
    pub tool_call: String,
    pub error_text: String,
}
