use planner_core::db::migrations::latest_version;
use planner_core::db::{open_db, open_db_in_memory, DbError};
use planner_core::model::category::Category;
use planner_core::repo::{CategoryRepository, NoteRepository, ToolCallRepository};
use planner_core::model::tool_call::NewToolCall;
use planner_core::SqliteStore;
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in [
        "notes",
        "categories",
        "annotations",
        "actions",
        "todos",
        "curiosities",
        "commands",
        "tool_calls",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("notes.db");

    let conn_first = open_db(&path).unwrap();
    SqliteStore::new(&conn_first)
        .create_note("kept across reopen", 1_000)
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let store = SqliteStore::new(&conn_second);
    assert!(store.get_note(1).unwrap().is_some());
    assert_eq!(store.list_categories().unwrap().len(), Category::ALL.len());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn opening_older_schema_upgrades_and_seeds_categories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/0001_init.sql"))
        .unwrap();
    conn.execute_batch("PRAGMA user_version = 1;").unwrap();
    conn.execute(
        "INSERT INTO notes (timestamp, note_text) VALUES (1000, 'written before upgrade');",
        [],
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "tool_calls");
    let store = SqliteStore::new(&conn);
    assert_eq!(
        store.get_note(1).unwrap().unwrap().note_text,
        "written before upgrade"
    );
    assert_eq!(store.list_categories().unwrap().len(), Category::ALL.len());
}

#[test]
fn reopening_restores_category_descriptions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "UPDATE categories SET description = 'stale' WHERE id = ?1;",
        [Category::Observation.id()],
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    let observation = SqliteStore::new(&conn)
        .list_categories()
        .unwrap()
        .into_iter()
        .find(|record| record.id == Category::Observation.id())
        .unwrap();
    assert_eq!(observation.description, Category::Observation.description());
}

#[test]
fn tool_call_rows_cannot_be_updated() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let note = store.create_note("woke up", 1_000).unwrap();
    let row = store
        .append_tool_call(&NewToolCall {
            source_note_id: note.id,
            target_table: "actions".to_string(),
            target_id: 1,
            target: None,
            tool_call: "{}".to_string(),
            error_text: String::new(),
        })
        .unwrap();

    let result = conn.execute(
        "UPDATE tool_calls SET error_text = 'rewritten' WHERE id = ?1;",
        [row.id],
    );
    assert!(result.is_err());
    assert_eq!(store.get_tool_call(row.id).unwrap().unwrap().error_text, "");
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO curiosities (curiosity_text, source_note_id) VALUES ('orphan', 42);",
        [],
    );
    assert!(result.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
