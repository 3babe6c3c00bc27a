//! Note repository contract and SQLite implementation.
//!
//! # Invariants
//! - New notes start unprocessed with empty processed text and error.
//! - The unprocessed queue is served oldest first (`timestamp`, then `id`).
//! - List queries order by recency (`timestamp DESC, id DESC`).

use super::{
    bool_to_int, int_to_bool, push_list_filters, push_pagination, ListQuery, RepoError,
    RepoResult, SqliteStore,
};
use crate::model::note::Note;
use crate::model::RecordId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    timestamp,
    note_text,
    processed_note_text,
    processing_error,
    processed
FROM notes";

/// Repository interface for notes.
pub trait NoteRepository {
    /// Inserts a raw, unprocessed note.
    fn create_note(&self, note_text: &str, timestamp: i64) -> RepoResult<Note>;
    fn get_note(&self, id: RecordId) -> RepoResult<Option<Note>>;
    fn list_notes(&self, query: &ListQuery) -> RepoResult<Vec<Note>>;
    /// Persists every mutable field of an existing note.
    fn save_note(&self, note: &Note) -> RepoResult<()>;
    /// Deletes the note; derived rows go with it via `ON DELETE CASCADE`.
    fn delete_note(&self, id: RecordId) -> RepoResult<()>;
    /// Oldest note with `processed = false`, if any.
    fn next_unprocessed_note(&self) -> RepoResult<Option<Note>>;
}

impl NoteRepository for SqliteStore<'_> {
    fn create_note(&self, note_text: &str, timestamp: i64) -> RepoResult<Note> {
        self.conn.execute(
            "INSERT INTO notes (timestamp, note_text) VALUES (?1, ?2);",
            params![timestamp, note_text],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_note(id)?.ok_or(RepoError::NotFound { table: "notes", id })
    }

    fn get_note(&self, id: RecordId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let row = stmt.query_row([id], read_note_row).optional()?;
        row.map(finish_note).transpose()
    }

    fn list_notes(&self, query: &ListQuery) -> RepoResult<Vec<Note>> {
        let mut sql = format!("{NOTE_SELECT_SQL} WHERE 1 = 1");
        let mut binds: Vec<Value> = Vec::new();
        push_list_filters(&mut sql, &mut binds, query, "timestamp", "note_text");
        sql.push_str(" ORDER BY timestamp DESC, id DESC");
        push_pagination(&mut sql, &mut binds, query);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(binds), read_note_row)?;
        let mut notes = Vec::new();
        for row in rows {
            notes.push(finish_note(row?)?);
        }
        Ok(notes)
    }

    fn save_note(&self, note: &Note) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                timestamp = ?1,
                note_text = ?2,
                processed_note_text = ?3,
                processing_error = ?4,
                processed = ?5
             WHERE id = ?6;",
            params![
                note.timestamp,
                note.note_text.as_str(),
                note.processed_note_text.as_str(),
                note.processing_error.as_str(),
                bool_to_int(note.processed),
                note.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                table: "notes",
                id: note.id,
            });
        }
        Ok(())
    }

    fn delete_note(&self, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM notes WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { table: "notes", id });
        }
        Ok(())
    }

    fn next_unprocessed_note(&self) -> RepoResult<Option<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL}
             WHERE processed = 0
             ORDER BY timestamp ASC, id ASC
             LIMIT 1;"
        ))?;
        let row = stmt.query_row([], read_note_row).optional()?;
        row.map(finish_note).transpose()
    }
}

type NoteRow = (RecordId, i64, String, String, String, i64);

fn read_note_row(row: &Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok((
        row.get("id")?,
        row.get("timestamp")?,
        row.get("note_text")?,
        row.get("processed_note_text")?,
        row.get("processing_error")?,
        row.get("processed")?,
    ))
}

fn finish_note(row: NoteRow) -> RepoResult<Note> {
    let (id, timestamp, note_text, processed_note_text, processing_error, processed) = row;
    Ok(Note {
        id,
        timestamp,
        note_text,
        processed_note_text,
        processing_error,
        processed: int_to_bool(processed, "notes.processed")?,
    })
}
