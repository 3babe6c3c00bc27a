mod common;

use common::{note_at, ts};
use planner_core::model::action::NewAction;
use planner_core::model::category::{Category, DerivedKind};
use planner_core::model::command::NewCommand;
use planner_core::model::todo::NewTodo;
use planner_core::model::tool_call::NewToolCall;
use planner_core::model::note::NoteState;
use planner_core::repo::{
    delete_derived, ActionRepository, AnnotationRepository, CommandRepository,
    CuriosityRepository, ListQuery, NoteRepository, TodoListQuery, TodoRepository,
    TodoStatusFilter, ToolCallRepository,
};
use planner_core::{open_db_in_memory, RepoError, SqliteStore};

fn new_todo(text: &str, note_id: i64, parent_id: Option<i64>) -> NewTodo {
    NewTodo {
        text: text.to_string(),
        source_note_id: note_id,
        parent_id,
        target_start_time: None,
        target_end_time: None,
    }
}

#[test]
fn notes_queue_in_timestamp_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let later = note_at(&store, "went for a run", "2024-03-02 08:00:00");
    let earlier = note_at(&store, "woke up", "2024-03-01 07:00:00");

    assert_eq!(store.next_unprocessed_note().unwrap().unwrap().id, earlier.id);

    let mut processed = earlier.clone();
    processed.processed = true;
    store.save_note(&processed).unwrap();
    assert_eq!(store.next_unprocessed_note().unwrap().unwrap().id, later.id);

    let fresh = store.get_note(later.id).unwrap().unwrap();
    assert_eq!(fresh.state(), NoteState::Unprocessed);
    assert_eq!(fresh.note_text, "went for a run");
}

#[test]
fn list_notes_filters_and_pages_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    for day in 1..=6 {
        note_at(
            &store,
            &format!("day {day} gym"),
            &format!("2024-03-0{day} 09:00:00"),
        );
    }

    let page = store
        .list_notes(&ListQuery {
            before: Some(ts("2024-03-05 00:00:00")),
            limit: Some(2),
            offset: 1,
            ..ListQuery::default()
        })
        .unwrap();
    let texts: Vec<&str> = page.iter().map(|note| note.note_text.as_str()).collect();
    assert_eq!(texts, vec!["day 3 gym", "day 2 gym"]);

    let searched = store
        .list_notes(&ListQuery {
            search: Some("day 6".to_string()),
            ..ListQuery::default()
        })
        .unwrap();
    assert_eq!(searched.len(), 1);
}

#[test]
fn annotation_is_unique_per_note_and_tracks_reprocess() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let note = note_at(&store, "buy milk", "2024-03-01 09:00:00");

    let mut annotation = store
        .create_annotation(note.id, Category::Todo, "User needs milk.")
        .unwrap();
    assert!(store
        .create_annotation(note.id, Category::Action, "again")
        .is_err());
    assert!(store.next_reprocess_candidate().unwrap().is_none());

    annotation.mark_for_reprocess(Category::Action);
    store.save_annotation(&annotation).unwrap();

    let candidate = store.next_reprocess_candidate().unwrap().unwrap();
    assert_eq!(candidate.id, annotation.id);
    assert_eq!(candidate.category, Category::Action);
    assert_eq!(
        store.annotation_for_note(note.id).unwrap().unwrap().annotation_text,
        "User needs milk."
    );
}

#[test]
fn todo_parent_must_exist_and_chain_cannot_loop() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let note = note_at(&store, "plan trip", "2024-03-01 09:00:00");

    let missing = store.create_todo(&new_todo("pack", note.id, Some(99)));
    assert!(matches!(
        missing,
        Err(RepoError::NotFound { table: "todos", id: 99 })
    ));

    let trip = store.create_todo(&new_todo("plan trip", note.id, None)).unwrap();
    let pack = store
        .create_todo(&new_todo("pack bags", note.id, Some(trip.id)))
        .unwrap();
    let socks = store
        .create_todo(&new_todo("buy socks", note.id, Some(pack.id)))
        .unwrap();

    let mut looped = trip.clone();
    looped.parent_id = Some(socks.id);
    assert!(matches!(
        store.save_todo(&looped),
        Err(RepoError::ParentCycle { .. })
    ));

    let mut self_parent = trip.clone();
    self_parent.parent_id = Some(trip.id);
    assert!(matches!(store.save_todo(&self_parent), Err(RepoError::Todo(_))));

    assert_eq!(store.get_todo(trip.id).unwrap().unwrap().parent_id, None);
}

#[test]
fn list_todos_filters_by_status_and_exclusion() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let note = note_at(&store, "chores", "2024-03-01 09:00:00");
    let dishes = store.create_todo(&new_todo("dishes", note.id, None)).unwrap();
    let laundry = store.create_todo(&new_todo("laundry", note.id, None)).unwrap();
    let mut vacuum = store.create_todo(&new_todo("vacuum", note.id, None)).unwrap();
    vacuum.complete = true;
    store.save_todo(&vacuum).unwrap();

    let open = store
        .list_todos(&TodoListQuery {
            status: TodoStatusFilter::Open,
            exclude_id: Some(dishes.id),
            ..TodoListQuery::default()
        })
        .unwrap();
    let ids: Vec<i64> = open.iter().map(|todo| todo.id).collect();
    assert_eq!(ids, vec![laundry.id]);

    let complete = store
        .list_todos(&TodoListQuery {
            status: TodoStatusFilter::Complete,
            ..TodoListQuery::default()
        })
        .unwrap();
    assert_eq!(complete.len(), 1);
    assert!(complete[0].complete);
}

#[test]
fn deleting_a_parent_todo_unlinks_children_and_actions() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let todo_note = note_at(&store, "plan trip", "2024-03-01 09:00:00");
    let action_note = note_at(&store, "booked hotel", "2024-03-02 09:00:00");
    let trip = store
        .create_todo(&new_todo("plan trip", todo_note.id, None))
        .unwrap();
    let hotel = store
        .create_todo(&new_todo("book hotel", action_note.id, Some(trip.id)))
        .unwrap();
    let action = store
        .create_action(&NewAction {
            text: "booked hotel".to_string(),
            timestamp: action_note.timestamp,
            source_note_id: action_note.id,
            todo_id: Some(trip.id),
            mark_complete: false,
        })
        .unwrap();

    assert_eq!(delete_derived(&store, todo_note.id, DerivedKind::Todo).unwrap(), 1);

    assert_eq!(store.get_todo(hotel.id).unwrap().unwrap().parent_id, None);
    assert_eq!(store.get_action(action.id).unwrap().unwrap().todo_id, None);
}

#[test]
fn derived_records_follow_their_note() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let note = note_at(&store, "why is the sky blue", "2024-03-01 09:00:00");
    let curiosity = store
        .create_curiosity("Why is the sky blue?", note.id)
        .unwrap();
    assert_eq!(store.curiosities_for_note(note.id).unwrap(), vec![curiosity]);

    assert_eq!(store.delete_curiosities_for_note(note.id).unwrap(), 1);
    assert!(store.curiosities_for_note(note.id).unwrap().is_empty());

    store.create_curiosity("Rayleigh scattering?", note.id).unwrap();
    store.delete_note(note.id).unwrap();
    assert!(store
        .list_curiosities(&ListQuery::default())
        .unwrap()
        .is_empty());
}

#[test]
fn strip_processing_resets_every_note() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let mut note = note_at(&store, "call mom", "2024-03-01 09:00:00");
    store
        .create_annotation(note.id, Category::Todo, "User should call mom.")
        .unwrap();
    store.create_todo(&new_todo("call mom", note.id, None)).unwrap();
    store
        .create_command(&NewCommand {
            command_text: "complete_todo".to_string(),
            value_before: String::new(),
            desired_value: String::new(),
            source_note_id: note.id,
            target_id: 1,
        })
        .unwrap();
    store
        .append_tool_call(&NewToolCall {
            source_note_id: note.id,
            target_table: "todos".to_string(),
            target_id: 1,
            target: None,
            tool_call: "{}".to_string(),
            error_text: String::new(),
        })
        .unwrap();
    note.processed = true;
    note.processed_note_text = "User should call mom.".to_string();
    note.record_error("boom");
    store.save_note(&note).unwrap();

    assert_eq!(store.strip_processing().unwrap(), 1);

    let reset = store.get_note(note.id).unwrap().unwrap();
    assert_eq!(reset.state(), NoteState::Unprocessed);
    assert_eq!(reset.note_text, "call mom");
    assert!(reset.processed_note_text.is_empty());
    assert!(store.annotation_for_note(note.id).unwrap().is_none());
    assert!(store.todos_for_note(note.id).unwrap().is_empty());
    assert!(store.commands_for_note(note.id).unwrap().is_empty());
    assert!(store.tool_calls_for_note(note.id).unwrap().is_empty());
}
