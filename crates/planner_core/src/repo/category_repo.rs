//! Category seed and read access.
//!
//! # Invariants
//! - Seeding is an idempotent upsert keyed by the stable category id, so
//!   rerunning it at every startup rewrites descriptions without touching
//!   annotations.

use super::{RepoResult, SqliteStore};
use crate::db::DbResult;
use crate::model::category::Category;
use log::debug;
use rusqlite::{params, Connection};

/// Persisted category row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub color: String,
}

/// Upserts every [`Category`] into `categories`.
pub fn seed_categories(conn: &Connection) -> DbResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO categories (id, name, description, color)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            color = excluded.color;",
    )?;
    for category in Category::ALL {
        stmt.execute(params![
            category.id(),
            category.name(),
            category.description(),
            category.color(),
        ])?;
    }
    debug!(
        "event=seed_categories module=repo status=ok count={}",
        Category::ALL.len()
    );
    Ok(())
}

/// Read access to the seeded taxonomy.
pub trait CategoryRepository {
    fn list_categories(&self) -> RepoResult<Vec<CategoryRecord>>;
}

impl CategoryRepository for SqliteStore<'_> {
    fn list_categories(&self) -> RepoResult<Vec<CategoryRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description, color FROM categories ORDER BY id ASC;")?;
        let rows = stmt.query_map([], |row| {
            Ok(CategoryRecord {
                id: row.get("id")?,
                name: row.get("name")?,
                description: row.get("description")?,
                color: row.get("color")?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
