mod common;

use common::{call, note_at, settings, ScriptedGateway};
use planner_core::model::category::Category;
use planner_core::model::note::NoteState;
use planner_core::repo::{AnnotationRepository, NoteRepository};
use planner_core::tools::CREATE_ANNOTATION;
use planner_core::{open_db_in_memory, CycleOutcome, GatewayError, Scheduler, SqliteStore};
use serde_json::json;
use std::cell::Cell;
use std::time::Duration;

fn observation() -> planner_core::ToolInvocation {
    call(
        CREATE_ANNOTATION,
        json!({ "category": "observation", "annotation_text": "User observes." }),
    )
}

#[test]
fn idle_store_does_no_work() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let gateway = ScriptedGateway::new();
    let scheduler = Scheduler::new(&store, &gateway, settings());

    assert_eq!(scheduler.cycle().unwrap(), CycleOutcome::Idle);
    assert_eq!(scheduler.drain(None).unwrap(), 0);
    assert_eq!(gateway.request_count(), 0);
}

#[test]
fn drain_processes_notes_oldest_first() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let late = note_at(&store, "sunset was red", "2024-03-01 19:00:00");
    let early = note_at(&store, "sunrise was pink", "2024-03-01 06:00:00");
    let gateway = ScriptedGateway::new()
        .reply(vec![observation()])
        .reply(vec![observation()]);
    let scheduler = Scheduler::new(&store, &gateway, settings());

    assert_eq!(scheduler.drain(None).unwrap(), 2);

    let requests = gateway.requests();
    assert!(requests[0].input.contains("sunrise was pink"));
    assert!(requests[1].input.contains("sunset was red"));
    for note in [early, late] {
        assert_eq!(
            store.get_note(note.id).unwrap().unwrap().state(),
            NoteState::Processed
        );
        let annotation = store.annotation_for_note(note.id).unwrap().unwrap();
        assert_eq!(annotation.category, Category::Observation);
        assert!(!annotation.reprocess);
    }
}

#[test]
fn drain_stops_at_max_units() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    for hour in 1..=3 {
        note_at(&store, "tick", &format!("2024-03-01 0{hour}:00:00"));
    }
    let gateway = ScriptedGateway::new();
    let scheduler = Scheduler::new(&store, &gateway, settings());

    assert_eq!(scheduler.drain(Some(2)).unwrap(), 2);
    assert!(store.next_unprocessed_note().unwrap().is_some());
}

#[test]
fn run_iterations_counts_only_units_of_work() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    note_at(&store, "tick", "2024-03-01 01:00:00");
    let gateway = ScriptedGateway::new().reply(vec![observation()]);
    let scheduler = Scheduler::new(&store, &gateway, settings());

    assert_eq!(scheduler.run_iterations(3).unwrap(), 1);
    assert_eq!(gateway.request_count(), 1);
}

#[test]
fn gateway_failure_is_recorded_and_cycle_continues() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let broken = note_at(&store, "first", "2024-03-01 01:00:00");
    let fine = note_at(&store, "second", "2024-03-01 02:00:00");
    let gateway = ScriptedGateway::new()
        .fail(GatewayError::Exhausted {
            attempts: 3,
            last: Box::new(GatewayError::Status {
                status: 503,
                body: "overloaded".to_string(),
            }),
        })
        .reply(vec![observation()]);
    let scheduler = Scheduler::new(&store, &gateway, settings());

    let outcome = scheduler.cycle().unwrap();
    let CycleOutcome::Failed { note_id, error } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(note_id, broken.id);
    assert!(!error.is_empty());

    let stored = store.get_note(broken.id).unwrap().unwrap();
    assert_eq!(stored.state(), NoteState::ProcessedWithError);
    assert_eq!(stored.processing_error, error);

    assert!(matches!(
        scheduler.cycle().unwrap(),
        CycleOutcome::Processed(ref report) if report.note_id == fine.id
    ));
    assert_eq!(scheduler.cycle().unwrap(), CycleOutcome::Idle);
}

#[test]
fn reprocess_flag_is_cleared_even_without_new_annotation() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let mut note = note_at(&store, "ran 5k", "2024-03-01 07:00:00");
    note.processed = true;
    store.save_note(&note).unwrap();
    let mut annotation = store
        .create_annotation(note.id, Category::Action, "User ran.")
        .unwrap();
    annotation.mark_for_reprocess(Category::Observation);
    store.save_annotation(&annotation).unwrap();
    let gateway = ScriptedGateway::new();
    let scheduler = Scheduler::new(&store, &gateway, settings());

    let outcome = scheduler.cycle().unwrap();
    assert!(matches!(outcome, CycleOutcome::Reprocessed(_)));

    let stored = store.get_annotation(annotation.id).unwrap().unwrap();
    assert!(!stored.reprocess);
    assert_eq!(stored.category, Category::Observation);
    assert!(store.next_reprocess_candidate().unwrap().is_none());
    assert_eq!(scheduler.cycle().unwrap(), CycleOutcome::Idle);
}

#[test]
fn reprocess_can_be_disabled() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let note = note_at(&store, "ran 5k", "2024-03-01 07:00:00");
    let mut annotation = store
        .create_annotation(note.id, Category::Action, "User ran.")
        .unwrap();
    annotation.mark_for_reprocess(Category::Observation);
    store.save_annotation(&annotation).unwrap();
    let mut processed = note.clone();
    processed.processed = true;
    store.save_note(&processed).unwrap();

    let gateway = ScriptedGateway::new();
    let mut no_reprocess = settings();
    no_reprocess.reprocess = false;
    let scheduler = Scheduler::new(&store, &gateway, no_reprocess);

    assert_eq!(scheduler.cycle().unwrap(), CycleOutcome::Idle);
    assert!(store.next_reprocess_candidate().unwrap().is_some());
}

#[test]
fn polling_stops_when_asked() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    note_at(&store, "tick", "2024-03-01 01:00:00");
    let gateway = ScriptedGateway::new().reply(vec![observation()]);
    let scheduler = Scheduler::new(&store, &gateway, settings());

    let checks = Cell::new(0);
    let done = scheduler
        .run_polling(Duration::from_millis(1), || {
            checks.set(checks.get() + 1);
            checks.get() > 3
        })
        .unwrap();

    assert_eq!(done, 1);
    assert_eq!(checks.get(), 4);
}
