//! Todo repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist todos and answer open/complete/cancelled list queries.
//! - Enforce tree invariants that need storage access.
//!
//! # Invariants
//! - A todo's parent must already exist.
//! - Following `parent_id` from any todo never returns to that todo.
//! - A todo's time for list filters is its source note's timestamp.

use super::{
    bool_to_int, int_to_bool, push_list_filters, push_pagination, ListQuery, RepoError,
    RepoResult, SqliteStore,
};
use crate::model::todo::{NewTodo, Todo};
use crate::model::RecordId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use std::collections::HashSet;

const TODO_SELECT_SQL: &str = "SELECT
    todos.id AS id,
    todos.todo_text AS todo_text,
    todos.source_note_id AS source_note_id,
    todos.parent_id AS parent_id,
    todos.target_start_time AS target_start_time,
    todos.target_end_time AS target_end_time,
    todos.complete AS complete,
    todos.cancelled AS cancelled
FROM todos
JOIN notes ON notes.id = todos.source_note_id";

/// Completion filter for todo lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TodoStatusFilter {
    #[default]
    Any,
    /// Neither complete nor cancelled.
    Open,
    Complete,
    Cancelled,
}

/// Query options for todo lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoListQuery {
    pub list: ListQuery,
    pub status: TodoStatusFilter,
    /// Leaves one todo out, e.g. a new subtask searching for its parent.
    pub exclude_id: Option<RecordId>,
}

/// Repository interface for todos.
pub trait TodoRepository {
    fn create_todo(&self, todo: &NewTodo) -> RepoResult<Todo>;
    fn get_todo(&self, id: RecordId) -> RepoResult<Option<Todo>>;
    /// Lists todos, newest source note first.
    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<Vec<Todo>>;
    fn todos_for_note(&self, note_id: RecordId) -> RepoResult<Vec<Todo>>;
    /// Validates and persists every mutable field, including the parent link.
    fn save_todo(&self, todo: &Todo) -> RepoResult<()>;
    fn delete_todo(&self, id: RecordId) -> RepoResult<()>;
    /// Returns the number of rows removed.
    fn delete_todos_for_note(&self, note_id: RecordId) -> RepoResult<usize>;
}

impl TodoRepository for SqliteStore<'_> {
    fn create_todo(&self, todo: &NewTodo) -> RepoResult<Todo> {
        todo.validate()?;
        if let Some(parent_id) = todo.parent_id {
            self.require_todo(parent_id)?;
        }

        self.conn.execute(
            "INSERT INTO todos (
                todo_text,
                source_note_id,
                parent_id,
                target_start_time,
                target_end_time
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                todo.text.as_str(),
                todo.source_note_id,
                todo.parent_id,
                todo.target_start_time,
                todo.target_end_time,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_todo(id)?
            .ok_or(RepoError::NotFound { table: "todos", id })
    }

    fn get_todo(&self, id: RecordId) -> RepoResult<Option<Todo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TODO_SELECT_SQL} WHERE todos.id = ?1;"))?;
        let row = stmt.query_row([id], read_todo_row).optional()?;
        row.map(finish_todo).transpose()
    }

    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<Vec<Todo>> {
        let mut sql = format!("{TODO_SELECT_SQL} WHERE 1 = 1");
        let mut binds: Vec<Value> = Vec::new();

        match query.status {
            TodoStatusFilter::Any => {}
            TodoStatusFilter::Open => {
                sql.push_str(" AND todos.complete = 0 AND todos.cancelled = 0")
            }
            TodoStatusFilter::Complete => sql.push_str(" AND todos.complete = 1"),
            TodoStatusFilter::Cancelled => sql.push_str(" AND todos.cancelled = 1"),
        }
        if let Some(exclude_id) = query.exclude_id {
            sql.push_str(" AND todos.id <> ?");
            binds.push(Value::Integer(exclude_id));
        }
        push_list_filters(
            &mut sql,
            &mut binds,
            &query.list,
            "notes.timestamp",
            "todos.todo_text",
        );
        sql.push_str(" ORDER BY notes.timestamp DESC, todos.id DESC");
        push_pagination(&mut sql, &mut binds, &query.list);
        self.collect_todos(&sql, binds)
    }

    fn todos_for_note(&self, note_id: RecordId) -> RepoResult<Vec<Todo>> {
        self.collect_todos(
            &format!("{TODO_SELECT_SQL} WHERE todos.source_note_id = ? ORDER BY todos.id ASC"),
            vec![Value::Integer(note_id)],
        )
    }

    fn save_todo(&self, todo: &Todo) -> RepoResult<()> {
        todo.validate()?;
        if let Some(parent_id) = todo.parent_id {
            self.require_todo(parent_id)?;
            if self.parent_chain_reaches(parent_id, todo.id)? {
                return Err(RepoError::ParentCycle {
                    todo_id: todo.id,
                    parent_id,
                });
            }
        }

        let changed = self.conn.execute(
            "UPDATE todos
             SET
                todo_text = ?1,
                parent_id = ?2,
                target_start_time = ?3,
                target_end_time = ?4,
                complete = ?5,
                cancelled = ?6
             WHERE id = ?7;",
            params![
                todo.text.as_str(),
                todo.parent_id,
                todo.target_start_time,
                todo.target_end_time,
                bool_to_int(todo.complete),
                bool_to_int(todo.cancelled),
                todo.id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                table: "todos",
                id: todo.id,
            });
        }
        Ok(())
    }

    fn delete_todo(&self, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM todos WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { table: "todos", id });
        }
        Ok(())
    }

    fn delete_todos_for_note(&self, note_id: RecordId) -> RepoResult<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM todos WHERE source_note_id = ?1;", [note_id])?)
    }
}

impl SqliteStore<'_> {
    fn collect_todos(&self, sql: &str, binds: Vec<Value>) -> RepoResult<Vec<Todo>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(binds), read_todo_row)?;
        let mut todos = Vec::new();
        for row in rows {
            todos.push(finish_todo(row?)?);
        }
        Ok(todos)
    }

    fn require_todo(&self, id: RecordId) -> RepoResult<Todo> {
        self.get_todo(id)?
            .ok_or(RepoError::NotFound { table: "todos", id })
    }

    /// Walks up from `start` and reports whether `target` is an ancestor.
    ///
    /// A loop already present in storage also counts as reaching the target.
    fn parent_chain_reaches(&self, start: RecordId, target: RecordId) -> RepoResult<bool> {
        let mut visited = HashSet::new();
        let mut cursor = Some(start);
        while let Some(current) = cursor {
            if current == target {
                return Ok(true);
            }
            if !visited.insert(current) {
                return Ok(true);
            }
            cursor = self.require_todo(current)?.parent_id;
        }
        Ok(false)
    }
}

type TodoRow = (
    RecordId,
    String,
    RecordId,
    Option<RecordId>,
    Option<i64>,
    Option<i64>,
    i64,
    i64,
);

fn read_todo_row(row: &Row<'_>) -> rusqlite::Result<TodoRow> {
    Ok((
        row.get("id")?,
        row.get("todo_text")?,
        row.get("source_note_id")?,
        row.get("parent_id")?,
        row.get("target_start_time")?,
        row.get("target_end_time")?,
        row.get("complete")?,
        row.get("cancelled")?,
    ))
}

fn finish_todo(row: TodoRow) -> RepoResult<Todo> {
    let (id, text, source_note_id, parent_id, target_start_time, target_end_time, complete, cancelled) =
        row;
    Ok(Todo {
        id,
        text,
        source_note_id,
        parent_id,
        target_start_time,
        target_end_time,
        complete: int_to_bool(complete, "todos.complete")?,
        cancelled: int_to_bool(cancelled, "todos.cancelled")?,
    })
}
