//! Repository layer abstractions and the SQLite store.
//!
//! # Responsibility
//! - Define one data-access contract per entity.
//! - Isolate SQLite query details from processing/orchestration code.
//! - Offer the two queue queries the scheduler drives on.
//!
//! # Invariants
//! - Write paths validate records before SQL mutations.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Every call uses the shared connection directly or a transaction that
//!   ends before the call returns; nothing spans LLM round trips.

pub mod action_repo;
pub mod annotation_repo;
pub mod category_repo;
pub mod command_repo;
pub mod curiosity_repo;
pub mod note_repo;
pub mod todo_repo;
pub mod tool_call_repo;

use crate::db::DbError;
use crate::model::category::DerivedKind;
use crate::model::todo::TodoValidationError;
use crate::model::RecordId;
use log::info;
use rusqlite::types::Value;
use rusqlite::Connection;
use thiserror::Error;

pub use action_repo::ActionRepository;
pub use annotation_repo::AnnotationRepository;
pub use category_repo::{CategoryRecord, CategoryRepository};
pub use command_repo::CommandRepository;
pub use curiosity_repo::CuriosityRepository;
pub use note_repo::NoteRepository;
pub use todo_repo::{TodoListQuery, TodoRepository, TodoStatusFilter};
pub use tool_call_repo::ToolCallRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("{table} record not found: {id}")]
    NotFound { table: &'static str, id: RecordId },
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Todo(#[from] TodoValidationError),
    #[error("todo {todo_id} cannot be placed under {parent_id}: parent chain would loop")]
    ParentCycle {
        todo_id: RecordId,
        parent_id: RecordId,
    },
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter and pagination options shared by list queries.
///
/// `before`/`after` are exclusive epoch-millisecond bounds on the entity's
/// time column. `search` is a substring match on the entity text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub before: Option<i64>,
    pub after: Option<i64>,
    pub search: Option<String>,
    /// `None` returns every matching row.
    pub limit: Option<u32>,
    pub offset: u32,
}

impl ListQuery {
    /// First page of `limit` rows.
    pub fn limited(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

/// Everything the processing pipeline needs from storage.
pub trait Store:
    NoteRepository
    + AnnotationRepository
    + ActionRepository
    + TodoRepository
    + CuriosityRepository
    + CommandRepository
    + ToolCallRepository
{
}

impl<T> Store for T where
    T: NoteRepository
        + AnnotationRepository
        + ActionRepository
        + TodoRepository
        + CuriosityRepository
        + CommandRepository
        + ToolCallRepository
{
}

/// Deletes every record of `kind` owned by `note_id`.
pub fn delete_derived<S: Store + ?Sized>(
    store: &S,
    note_id: RecordId,
    kind: DerivedKind,
) -> RepoResult<usize> {
    match kind {
        DerivedKind::Action => store.delete_actions_for_note(note_id),
        DerivedKind::Todo => store.delete_todos_for_note(note_id),
        DerivedKind::Curiosity => store.delete_curiosities_for_note(note_id),
    }
}

/// SQLite-backed implementation of every repository trait.
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Drops all derived state and returns every note to the unprocessed
    /// queue, so a whole notebook can be reprocessed from raw text.
    ///
    /// Returns the number of notes reset.
    pub fn strip_processing(&self) -> RepoResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM tool_calls;
             DELETE FROM commands;
             DELETE FROM curiosities;
             DELETE FROM actions;
             DELETE FROM todos;
             DELETE FROM annotations;",
        )?;
        let reset = tx.execute(
            "UPDATE notes
             SET processed_note_text = '', processing_error = '', processed = 0;",
            [],
        )?;
        tx.commit()?;

        info!("event=strip_processing module=repo status=ok notes_reset={reset}");
        Ok(reset)
    }
}

/// Appends `before`/`after`/`search` clauses for a list query.
pub(crate) fn push_list_filters(
    sql: &mut String,
    binds: &mut Vec<Value>,
    query: &ListQuery,
    time_column: &str,
    text_column: &str,
) {
    if let Some(before) = query.before {
        sql.push_str(&format!(" AND {time_column} < ?"));
        binds.push(Value::Integer(before));
    }
    if let Some(after) = query.after {
        sql.push_str(&format!(" AND {time_column} > ?"));
        binds.push(Value::Integer(after));
    }
    if let Some(search) = query.search.as_deref().map(str::trim) {
        if !search.is_empty() {
            sql.push_str(&format!(" AND {text_column} LIKE ?"));
            binds.push(Value::Text(format!("%{search}%")));
        }
    }
}

/// Appends `LIMIT`/`OFFSET` for a list query.
pub(crate) fn push_pagination(sql: &mut String, binds: &mut Vec<Value>, query: &ListQuery) {
    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        binds.push(Value::Integer(i64::from(limit)));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            binds.push(Value::Integer(i64::from(query.offset)));
        }
    } else if query.offset > 0 {
        sql.push_str(" LIMIT -1 OFFSET ?");
        binds.push(Value::Integer(i64::from(query.offset)));
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
