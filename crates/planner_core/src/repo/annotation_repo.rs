//! Annotation repository contract and SQLite implementation.
//!
//! # Invariants
//! - `annotations.note_id` is unique: one live annotation per note.
//! - The reprocess queue is served in insertion order.

use super::{
    bool_to_int, int_to_bool, push_list_filters, push_pagination, ListQuery, RepoError,
    RepoResult, SqliteStore,
};
use crate::model::annotation::Annotation;
use crate::model::category::Category;
use crate::model::RecordId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

const ANNOTATION_SELECT_SQL: &str = "SELECT
    annotations.id AS id,
    annotations.note_id AS note_id,
    annotations.category_id AS category_id,
    annotations.annotation_text AS annotation_text,
    annotations.reprocess AS reprocess
FROM annotations
JOIN notes ON notes.id = annotations.note_id";

/// Repository interface for annotations.
pub trait AnnotationRepository {
    fn create_annotation(
        &self,
        note_id: RecordId,
        category: Category,
        annotation_text: &str,
    ) -> RepoResult<Annotation>;
    fn get_annotation(&self, id: RecordId) -> RepoResult<Option<Annotation>>;
    fn annotation_for_note(&self, note_id: RecordId) -> RepoResult<Option<Annotation>>;
    /// Lists annotations, newest note first. Time and search filters apply
    /// to the annotated note.
    fn list_annotations(
        &self,
        category: Option<Category>,
        query: &ListQuery,
    ) -> RepoResult<Vec<Annotation>>;
    fn save_annotation(&self, annotation: &Annotation) -> RepoResult<()>;
    fn delete_annotation(&self, id: RecordId) -> RepoResult<()>;
    /// Oldest annotation flagged with `reprocess = true`, if any.
    fn next_reprocess_candidate(&self) -> RepoResult<Option<Annotation>>;
}

impl AnnotationRepository for SqliteStore<'_> {
    fn create_annotation(
        &self,
        note_id: RecordId,
        category: Category,
        annotation_text: &str,
    ) -> RepoResult<Annotation> {
        self.conn.execute(
            "INSERT INTO annotations (note_id, category_id, annotation_text, reprocess)
             VALUES (?1, ?2, ?3, 0);",
            params![note_id, category.id(), annotation_text],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_annotation(id)?.ok_or(RepoError::NotFound {
            table: "annotations",
            id,
        })
    }

    fn get_annotation(&self, id: RecordId) -> RepoResult<Option<Annotation>> {
        self.query_annotation(&format!("{ANNOTATION_SELECT_SQL} WHERE annotations.id = ?1;"), id)
    }

    fn annotation_for_note(&self, note_id: RecordId) -> RepoResult<Option<Annotation>> {
        self.query_annotation(
            &format!("{ANNOTATION_SELECT_SQL} WHERE annotations.note_id = ?1;"),
            note_id,
        )
    }

    fn list_annotations(
        &self,
        category: Option<Category>,
        query: &ListQuery,
    ) -> RepoResult<Vec<Annotation>> {
        let mut sql = format!("{ANNOTATION_SELECT_SQL} WHERE 1 = 1");
        let mut binds: Vec<Value> = Vec::new();
        if let Some(category) = category {
            sql.push_str(" AND annotations.category_id = ?");
            binds.push(Value::Integer(category.id()));
        }
        push_list_filters(&mut sql, &mut binds, query, "notes.timestamp", "notes.note_text");
        sql.push_str(" ORDER BY notes.timestamp DESC, annotations.id DESC");
        push_pagination(&mut sql, &mut binds, query);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(binds), read_annotation_row)?;
        let mut annotations = Vec::new();
        for row in rows {
            annotations.push(finish_annotation(row?)?);
        }
        Ok(annotations)
    }

    fn save_annotation(&self, annotation: &Annotation) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE annotations
             SET category_id = ?1, annotation_text = ?2, reprocess = ?3
             WHERE id = ?4;",
            params![
                annotation.category.id(),
                annotation.annotation_text.as_str(),
                bool_to_int(annotation.reprocess),
                annotation.id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                table: "annotations",
                id: annotation.id,
            });
        }
        Ok(())
    }

    fn delete_annotation(&self, id: RecordId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM annotations WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                table: "annotations",
                id,
            });
        }
        Ok(())
    }

    fn next_reprocess_candidate(&self) -> RepoResult<Option<Annotation>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ANNOTATION_SELECT_SQL}
             WHERE annotations.reprocess = 1
             ORDER BY annotations.id ASC
             LIMIT 1;"
        ))?;
        let row = stmt.query_row([], read_annotation_row).optional()?;
        row.map(finish_annotation).transpose()
    }
}

impl SqliteStore<'_> {
    fn query_annotation(&self, sql: &str, id: RecordId) -> RepoResult<Option<Annotation>> {
        let mut stmt = self.conn.prepare(sql)?;
        let row = stmt.query_row([id], read_annotation_row).optional()?;
        row.map(finish_annotation).transpose()
    }
}

type AnnotationRow = (RecordId, RecordId, i64, String, i64);

fn read_annotation_row(row: &Row<'_>) -> rusqlite::Result<AnnotationRow> {
    Ok((
        row.get("id")?,
        row.get("note_id")?,
        row.get("category_id")?,
        row.get("annotation_text")?,
        row.get("reprocess")?,
    ))
}

fn finish_annotation(row: AnnotationRow) -> RepoResult<Annotation> {
    let (id, note_id, category_id, annotation_text, reprocess) = row;
    let category = Category::from_id(category_id).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid category id `{category_id}` in annotations.category_id"
        ))
    })?;
    Ok(Annotation {
        id,
        note_id,
        category,
        annotation_text,
        reprocess: int_to_bool(reprocess, "annotations.reprocess")?,
    })
}
