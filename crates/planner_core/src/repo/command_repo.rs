//! Command repository contract and SQLite implementation.
//!
//! Commands are written once and afterwards only read as an audit trail.

use super::{RepoError, RepoResult, SqliteStore};
use crate::model::command::{Command, NewCommand};
use crate::model::RecordId;
use rusqlite::{params, OptionalExtension, Row};

const COMMAND_SELECT_SQL: &str = "SELECT
    id,
    command_text,
    value_before,
    desired_value,
    source_note_id,
    target_id
FROM commands";

/// Repository interface for commands.
pub trait CommandRepository {
    fn create_command(&self, command: &NewCommand) -> RepoResult<Command>;
    fn get_command(&self, id: RecordId) -> RepoResult<Option<Command>>;
    fn commands_for_note(&self, note_id: RecordId) -> RepoResult<Vec<Command>>;
}

impl CommandRepository for SqliteStore<'_> {
    fn create_command(&self, command: &NewCommand) -> RepoResult<Command> {
        self.conn.execute(
            "INSERT INTO commands (
                command_text,
                value_before,
                desired_value,
                source_note_id,
                target_id
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                command.command_text.as_str(),
                command.value_before.as_str(),
                command.desired_value.as_str(),
                command.source_note_id,
                command.target_id,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_command(id)?
            .ok_or(RepoError::NotFound { table: "commands", id })
    }

    fn get_command(&self, id: RecordId) -> RepoResult<Option<Command>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COMMAND_SELECT_SQL} WHERE id = ?1;"))?;
        Ok(stmt.query_row([id], read_command_row).optional()?)
    }

    fn commands_for_note(&self, note_id: RecordId) -> RepoResult<Vec<Command>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COMMAND_SELECT_SQL} WHERE source_note_id = ?1 ORDER BY id ASC;"
        ))?;
        let rows = stmt.query_map([note_id], read_command_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn read_command_row(row: &Row<'_>) -> rusqlite::Result<Command> {
    Ok(Command {
        id: row.get("id")?,
        command_text: row.get("command_text")?,
        value_before: row.get("value_before")?,
        desired_value: row.get("desired_value")?,
        source_note_id: row.get("source_note_id")?,
        target_id: row.get("target_id")?,
    })
}
