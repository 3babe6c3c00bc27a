//! Action repository contract and SQLite implementation.

use super::{
    bool_to_int, int_to_bool, push_list_filters, push_pagination, ListQuery, RepoError,
    RepoResult, SqliteStore,
};
use crate::model::action::{Action, NewAction};
use crate::model::RecordId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

const ACTION_SELECT_SQL: &str = "SELECT
    id,
    action_text,
    timestamp,
    source_note_id,
    todo_id,
    mark_complete
FROM actions";

/// Repository interface for actions.
pub trait ActionRepository {
    fn create_action(&self, action: &NewAction) -> RepoResult<Action>;
    fn get_action(&self, id: RecordId) -> RepoResult<Option<Action>>;
    /// Lists actions by recency of their own timestamp.
    fn list_actions(&self, query: &ListQuery) -> RepoResult<Vec<Action>>;
    fn actions_for_note(&self, note_id: RecordId) -> RepoResult<Vec<Action>>;
    fn save_action(&self, action: &Action) -> RepoResult<()>;
    fn delete_action(&self, id: RecordId) -> RepoResult<()>;
    /// Returns the number of rows removed.
    fn delete_actions_for_note(&self, note_id: RecordId) -> RepoResult<usize>;
}

impl ActionRepository for SqliteStore<'_> {
    fn create_action(&self, action: &NewAction) -> RepoResult<Action> {
        if action.text.trim().is_empty() {
            return Err(RepoError::InvalidData(
                "action text must not be blank".to_string(),
            ));
        }
        self.conn.execute(
            "INSERT INTO actions (action_text, timestamp, source_note_id, todo_id, mark_complete)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                action.text.as_str(),
                action.timestamp,
                action.source_note_id,
                action.todo_id,
                bool_to_int(action.mark_complete),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_action(id)?
            .ok_or(RepoError::NotFound { table: "actions", id })
    }

    fn get_action(&self, id: RecordId) -> RepoResult<Option<Action>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ACTION_SELECT_SQL} WHERE id = ?1;"))?;
        let row = stmt.query_row([id], read_action_row).optional()?;
        row.map(finish_action).transpose()
    }

    fn list_actions(&self, query: &ListQuery) -> RepoResult<Vec<Action>> {
        let mut sql = format!("{ACTION_SELECT_SQL} WHERE 1 = 1");
        let mut binds: Vec<Value> = Vec::new();
        push_list_filters(&mut sql, &mut binds, query, "timestamp", "action_text");
        sql.push_str(" ORDER BY timestamp DESC, id DESC");
        push_pagination(&mut sql, &mut binds, query);
        self.collect_actions(&sql, binds)
    }

    fn actions_for_note(&self, note_id: RecordId) -> RepoResult<Vec<Action>> {
        self.collect_actions(
            &format!("{ACTION_SELECT_SQL} WHERE source_note_id = ? ORDER BY id ASC"),
            vec![Value::Integer(note_id)],
        )
    }

    fn save_action(&self, action: &Action) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE actions
             SET action_text = ?1, timestamp = ?2, todo_id = ?3, mark_complete = ?4
             WHERE id = ?5;",
            params![
                action.text.as_str(),
                action.timestamp,
                action.todo_id,
                bool_to_int(action.mark_complete),
                action.id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                table: "actions",
                id: action.id,
            });
        }
        Ok(())
    }

    fn delete_action(&self, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM actions WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { table: "actions", id });
        }
        Ok(())
    }

    fn delete_actions_for_note(&self, note_id: RecordId) -> RepoResult<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM actions WHERE source_note_id = ?1;", [note_id])?)
    }
}

impl SqliteStore<'_> {
    fn collect_actions(&self, sql: &str, binds: Vec<Value>) -> RepoResult<Vec<Action>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(binds), read_action_row)?;
        let mut actions = Vec::new();
        for row in rows {
            actions.push(finish_action(row?)?);
        }
        Ok(actions)
    }
}

type ActionRow = (RecordId, String, i64, RecordId, Option<RecordId>, i64);

fn read_action_row(row: &Row<'_>) -> rusqlite::Result<ActionRow> {
    Ok((
        row.get("id")?,
        row.get("action_text")?,
        row.get("timestamp")?,
        row.get("source_note_id")?,
        row.get("todo_id")?,
        row.get("mark_complete")?,
    ))
}

fn finish_action(row: ActionRow) -> RepoResult<Action> {
    let (id, text, timestamp, source_note_id, todo_id, mark_complete) = row;
    Ok(Action {
        id,
        text,
        timestamp,
        source_note_id,
        todo_id,
        mark_complete: int_to_bool(mark_complete, "actions.mark_complete")?,
    })
}
