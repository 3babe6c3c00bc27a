use planner_core::model::category::Category;
use planner_core::repo::category_repo::seed_categories;
use planner_core::repo::{AnnotationRepository, CategoryRepository, NoteRepository};
use planner_core::{open_db_in_memory, SqliteStore};

#[test]
fn seeded_rows_match_closed_taxonomy() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);

    let rows = store.list_categories().unwrap();
    assert_eq!(rows.len(), Category::ALL.len());
    for (row, category) in rows.iter().zip(Category::ALL) {
        assert_eq!(row.id, category.id());
        assert_eq!(row.name, category.name());
        assert_eq!(row.description, category.description());
        assert_eq!(row.color, category.color());
    }
}

#[test]
fn reseeding_keeps_annotations_intact() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let note = store.create_note("the sky is grey", 1_000).unwrap();
    let annotation = store
        .create_annotation(note.id, Category::Observation, "User notes grey sky.")
        .unwrap();

    seed_categories(&conn).unwrap();
    seed_categories(&conn).unwrap();

    assert_eq!(store.list_categories().unwrap().len(), Category::ALL.len());
    assert_eq!(
        store.get_annotation(annotation.id).unwrap().unwrap().category,
        Category::Observation
    );
}

#[test]
fn annotations_cannot_reference_unknown_category_ids() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let note = store.create_note("hello", 1_000).unwrap();

    let result = conn.execute(
        "INSERT INTO annotations (note_id, category_id, annotation_text) VALUES (?1, 42, 'x');",
        [note.id],
    );
    assert!(result.is_err());
}

#[test]
fn list_annotations_filters_by_category() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let first = store.create_note("ran 5k", 1_000).unwrap();
    let second = store.create_note("buy eggs", 2_000).unwrap();
    store
        .create_annotation(first.id, Category::Action, "User ran 5k.")
        .unwrap();
    store
        .create_annotation(second.id, Category::Todo, "User needs eggs.")
        .unwrap();

    let todos = store
        .list_annotations(Some(Category::Todo), &Default::default())
        .unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].note_id, second.id);
    assert_eq!(
        store.list_annotations(None, &Default::default()).unwrap().len(),
        2
    );
}
