use super::Runtime;
use crate::cli::{ReadArgs, RecordKind};
use anyhow::{Context, Result};
use planner_core::model::category::Category;
use planner_core::model::note::NoteState;
use planner_core::model::timestamp::{format_timestamp, parse_timestamp};
use planner_core::repo::{
    ActionRepository, AnnotationRepository, CuriosityRepository, ListQuery, NoteRepository,
    TodoListQuery, TodoRepository, TodoStatusFilter,
};
use planner_core::SqliteStore;

pub fn run(runtime: &Runtime, args: &ReadArgs) -> Result<()> {
    let store = SqliteStore::new(&runtime.conn);
    let query = list_query(args)?;

    match args.kind {
        RecordKind::Note => {
            for note in store.list_notes(&query)? {
                let category = store
                    .annotation_for_note(note.id)?
                    .map_or("-", |annotation| annotation.category.name());
                let state = match note.state() {
                    NoteState::Unprocessed => "queued".to_string(),
                    NoteState::Processed => category.to_string(),
                    NoteState::ProcessedWithError => format!("{category}, error: {}", note.processing_error),
                };
                println!("{} ({state})", note.prompt_line());
            }
        }
        RecordKind::Todo => {
            let todos = store.list_todos(&TodoListQuery {
                list: query,
                status: todo_status(args),
                exclude_id: None,
            })?;
            for todo in todos {
                println!("{}", todo.prompt_line());
            }
        }
        RecordKind::Action => {
            for action in store.list_actions(&query)? {
                println!("{}", action.prompt_line());
            }
        }
        RecordKind::Curiosity => {
            for curiosity in store.list_curiosities(&query)? {
                println!("[curiosity {}] {}", curiosity.id, curiosity.text);
            }
        }
        RecordKind::Observation => {
            for annotation in store.list_annotations(Some(Category::Observation), &query)? {
                let when = store
                    .get_note(annotation.note_id)?
                    .map(|note| format_timestamp(note.timestamp))
                    .unwrap_or_default();
                println!(
                    "[observation note {}] {when} {}",
                    annotation.note_id, annotation.annotation_text
                );
            }
        }
    }
    Ok(())
}

fn list_query(args: &ReadArgs) -> Result<ListQuery> {
    let parse = |flag: &str, value: &Option<String>| -> Result<Option<i64>> {
        value
            .as_deref()
            .map(|value| {
                parse_timestamp(value)
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("--{flag} `{value}`"))
            })
            .transpose()
    };
    Ok(ListQuery {
        before: parse("before", &args.before)?,
        after: parse("after", &args.after)?,
        search: args.search.clone(),
        limit: Some(args.limit),
        offset: 0,
    })
}

fn todo_status(args: &ReadArgs) -> TodoStatusFilter {
    if args.incomplete_only {
        TodoStatusFilter::Open
    } else if args.complete_only {
        TodoStatusFilter::Complete
    } else if args.cancelled_only {
        TodoStatusFilter::Cancelled
    } else {
        TodoStatusFilter::Any
    }
}

