//! Tool-call audit repository.
//!
//! # Invariants
//! - The trait exposes no update or delete: rows are append-only (the
//!   schema additionally rejects `UPDATE` with a trigger).

use super::{RepoError, RepoResult, SqliteStore};
use crate::model::tool_call::{NewToolCall, ToolCall};
use crate::model::RecordId;
use rusqlite::{params, OptionalExtension, Row};

const TOOL_CALL_SELECT_SQL: &str = "SELECT
    id,
    source_note_id,
    target_table,
    target_id,
    target,
    tool_call,
    error_text
FROM tool_calls";

/// Repository interface for the tool-call audit trail.
pub trait ToolCallRepository {
    fn append_tool_call(&self, call: &NewToolCall) -> RepoResult<ToolCall>;
    fn get_tool_call(&self, id: RecordId) -> RepoResult<Option<ToolCall>>;
    /// Audit rows for one note in application order.
    fn tool_calls_for_note(&self, note_id: RecordId) -> RepoResult<Vec<ToolCall>>;
}

impl ToolCallRepository for SqliteStore<'_> {
    fn append_tool_call(&self, call: &NewToolCall) -> RepoResult<ToolCall> {
        self.conn.execute(
            "INSERT INTO tool_calls (
                source_note_id,
                target_table,
                target_id,
                target,
                tool_call,
                error_text
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                call.source_note_id,
                call.target_table.as_str(),
                call.target_id,
                call.target.as_deref(),
                call.tool_call.as_str(),
                call.error_text.as_str(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_tool_call(id)?.ok_or(RepoError::NotFound {
            table: "tool_calls",
            id,
        })
    }

    fn get_tool_call(&self, id: RecordId) -> RepoResult<Option<ToolCall>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TOOL_CALL_SELECT_SQL} WHERE id = ?1;"))?;
        Ok(stmt.query_row([id], read_tool_call_row).optional()?)
    }

    fn tool_calls_for_note(&self, note_id: RecordId) -> RepoResult<Vec<ToolCall>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TOOL_CALL_SELECT_SQL} WHERE source_note_id = ?1 ORDER BY id ASC;"
        ))?;
        let rows = stmt.query_map([note_id], read_tool_call_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn read_tool_call_row(row: &Row<'_>) -> rusqlite::Result<ToolCall> {
    Ok(ToolCall {
        id: row.get("id")?,
        source_note_id: row.get("source_note_id")?,
        target_table: row.get("target_table")?,
        target_id: row.get("target_id")?,
        target: row.get("target")?,
        tool_call: row.get("tool_call")?,
        error_text: row.get("error_text")?,
    })
}
