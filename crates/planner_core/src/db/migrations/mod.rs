//! Schema upgrades and category reconciliation.
//!
//! # Responsibility
//! - Bring a database from any older `PRAGMA user_version` to
//!   [`latest_version`].
//! - Reseed the closed category taxonomy in the same transaction, so a
//!   freshly migrated database never exists without its categories.
//!
//! # Invariants
//! - Steps are listed in increasing version order and each step is applied
//!   at most once.
//! - A database newer than this binary is refused untouched.

use crate::db::{DbError, DbResult};
use crate::repo::category_repo::seed_categories;
use log::{debug, info};
use rusqlite::{Connection, Transaction};

struct SchemaStep {
    version: u32,
    label: &'static str,
    sql: &'static str,
}

const STEPS: [SchemaStep; 3] = [
    SchemaStep {
        version: 1,
        label: "notes_and_categories",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        label: "derived_records",
        sql: include_str!("0002_derived.sql"),
    },
    SchemaStep {
        version: 3,
        label: "tool_call_audit",
        sql: include_str!("0003_tool_calls.sql"),
    },
];

/// Schema version written by the newest step.
pub fn latest_version() -> u32 {
    STEPS[STEPS.len() - 1].version
}

/// Upgrades the schema and reseeds categories in one transaction.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let tx = conn.transaction()?;
    let applied = upgrade(&tx, from)?;
    seed_categories(&tx)?;
    tx.commit()?;

    if applied > 0 {
        info!(
            "event=db_migrate module=db status=ok from_version={from} to_version={latest} steps={applied}"
        );
    }
    Ok(())
}

fn upgrade(tx: &Transaction<'_>, from: u32) -> DbResult<usize> {
    let mut applied = 0;
    for step in STEPS.iter().filter(|step| step.version > from) {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        debug!(
            "event=db_migrate_step module=db status=ok version={} label={}",
            step.version, step.label
        );
        applied += 1;
    }
    Ok(applied)
}
