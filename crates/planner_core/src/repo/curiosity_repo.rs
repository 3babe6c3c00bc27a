//! Curiosity repository contract and SQLite implementation.

use super::{push_list_filters, push_pagination, ListQuery, RepoError, RepoResult, SqliteStore};
use crate::model::curiosity::Curiosity;
use crate::model::RecordId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

const CURIOSITY_SELECT_SQL: &str = "SELECT
    curiosities.id AS id,
    curiosities.curiosity_text AS curiosity_text,
    curiosities.source_note_id AS source_note_id
FROM curiosities
JOIN notes ON notes.id = curiosities.source_note_id";

/// Repository interface for curiosities.
pub trait CuriosityRepository {
    fn create_curiosity(&self, text: &str, source_note_id: RecordId) -> RepoResult<Curiosity>;
    fn get_curiosity(&self, id: RecordId) -> RepoResult<Option<Curiosity>>;
    fn list_curiosities(&self, query: &ListQuery) -> RepoResult<Vec<Curiosity>>;
    fn curiosities_for_note(&self, note_id: RecordId) -> RepoResult<Vec<Curiosity>>;
    fn delete_curiosity(&self, id: RecordId) -> RepoResult<()>;
    /// Returns the number of rows removed.
    fn delete_curiosities_for_note(&self, note_id: RecordId) -> RepoResult<usize>;
}

impl CuriosityRepository for SqliteStore<'_> {
    fn create_curiosity(&self, text: &str, source_note_id: RecordId) -> RepoResult<Curiosity> {
        if text.trim().is_empty() {
            return Err(RepoError::InvalidData(
                "curiosity text must not be blank".to_string(),
            ));
        }
        self.conn.execute(
            "INSERT INTO curiosities (curiosity_text, source_note_id) VALUES (?1, ?2);",
            params![text, source_note_id],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_curiosity(id)?.ok_or(RepoError::NotFound {
            table: "curiosities",
            id,
        })
    }

    fn get_curiosity(&self, id: RecordId) -> RepoResult<Option<Curiosity>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CURIOSITY_SELECT_SQL} WHERE curiosities.id = ?1;"))?;
        Ok(stmt.query_row([id], read_curiosity_row).optional()?)
    }

    fn list_curiosities(&self, query: &ListQuery) -> RepoResult<Vec<Curiosity>> {
        let mut sql = format!("{CURIOSITY_SELECT_SQL} WHERE 1 = 1");
        let mut binds: Vec<Value> = Vec::new();
        push_list_filters(
            &mut sql,
            &mut binds,
            query,
            "notes.timestamp",
            "curiosities.curiosity_text",
        );
        sql.push_str(" ORDER BY notes.timestamp DESC, curiosities.id DESC");
        push_pagination(&mut sql, &mut binds, query);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(binds), read_curiosity_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn curiosities_for_note(&self, note_id: RecordId) -> RepoResult<Vec<Curiosity>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CURIOSITY_SELECT_SQL} WHERE curiosities.source_note_id = ?1 ORDER BY curiosities.id ASC;"
        ))?;
        let rows = stmt.query_map([note_id], read_curiosity_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn delete_curiosity(&self, id: RecordId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM curiosities WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                table: "curiosities",
                id,
            });
        }
        Ok(())
    }

    fn delete_curiosities_for_note(&self, note_id: RecordId) -> RepoResult<usize> {
        Ok(self.conn.execute(
            "DELETE FROM curiosities WHERE source_note_id = ?1;",
            [note_id],
        )?)
    }
}

fn read_curiosity_row(row: &Row<'_>) -> rusqlite::Result<Curiosity> {
    Ok(Curiosity {
        id: row.get("id")?,
        text: row.get("curiosity_text")?,
        source_note_id: row.get("source_note_id")?,
    })
}
