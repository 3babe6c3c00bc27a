//! Tool-call dispatch and audit.
//!
//! # Responsibility
//! - Apply one validated [`ToolRequest`] to the store.
//! - Append one audit row per dispatched call, successful or not.
//!
//! # Invariants
//! - Audit rows are written after the call's own mutations and never
//!   updated afterwards.
//! - A failing call leaves an audit row with `error_text` set and does not
//!   prevent later calls from running.

use crate::config::MatcherSettings;
use crate::error::{ProcessError, ProcessResult};
use crate::llm::{ToolGateway, ToolInvocation};
use crate::model::action::NewAction;
use crate::model::note::Note;
use crate::model::timestamp::parse_timestamp;
use crate::model::todo::NewTodo;
use crate::model::tool_call::{NewToolCall, ToolCall};
use crate::model::{RecordId, NO_MATCH_ID};
use crate::repo::Store;
use crate::service::matcher::{EntityMatcher, MatchRequest, MatchTarget, MatchedEntity};
use crate::service::router::reset_note;
use crate::tools::{
    CreateActionArgs, CreateCuriosityArgs, CreateTodoArgs, ToolRequest, UpdateActionArgs,
    UpdateNoteArgs, UpdateTodoArgs,
};
use log::{info, warn};
use serde::Serialize;
use serde_json::json;

/// Record touched by a successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub table: &'static str,
    pub id: RecordId,
    /// JSON of the record before an update.
    pub snapshot: Option<String>,
}

impl Applied {
    fn created(table: &'static str, id: RecordId) -> Self {
        Self {
            table,
            id,
            snapshot: None,
        }
    }

    fn updated<T: Serialize>(table: &'static str, id: RecordId, before: &T) -> Self {
        Self {
            table,
            id,
            snapshot: serde_json::to_string(before).ok(),
        }
    }
}

/// Table and id a request aims at, for failure audit rows.
pub fn request_target(request: &ToolRequest) -> (&'static str, RecordId) {
    match request {
        ToolRequest::CreateAnnotation(_) => ("annotations", NO_MATCH_ID),
        ToolRequest::CreateAction(_) => ("actions", NO_MATCH_ID),
        ToolRequest::CreateTodo(_) => ("todos", NO_MATCH_ID),
        ToolRequest::CreateCuriosity(_) => ("curiosities", NO_MATCH_ID),
        ToolRequest::UpdateNote(args) => ("notes", args.note_id),
        ToolRequest::UpdateTodo(args) => ("todos", args.todo_id),
        ToolRequest::UpdateAction(args) => ("actions", args.action_id),
        ToolRequest::Unknown { .. } => ("", NO_MATCH_ID),
    }
}

/// Appends the audit row for one dispatched call.
pub fn audit<S: Store + ?Sized>(
    store: &S,
    note_id: RecordId,
    invocation: &ToolInvocation,
    outcome: Result<&Applied, (&'static str, RecordId, &ProcessError)>,
) -> ProcessResult<ToolCall> {
    let row = match outcome {
        Ok(applied) => NewToolCall {
            source_note_id: note_id,
            target_table: applied.table.to_string(),
            target_id: applied.id,
            target: applied.snapshot.clone(),
            tool_call: invocation.to_audit_json(),
            error_text: String::new(),
        },
        Err((table, id, err)) => NewToolCall {
            source_note_id: note_id,
            target_table: table.to_string(),
            target_id: id,
            target: None,
            tool_call: invocation.to_audit_json(),
            error_text: err.to_string(),
        },
    };
    Ok(store.append_tool_call(&row)?)
}

/// Applies creation and update requests on behalf of one note.
pub struct Dispatcher<'a, S: Store + ?Sized, G: ToolGateway + ?Sized> {
    store: &'a S,
    matcher: EntityMatcher<'a, S, G>,
}

impl<'a, S: Store + ?Sized, G: ToolGateway + ?Sized> Dispatcher<'a, S, G> {
    pub fn new(store: &'a S, gateway: &'a G, matcher: MatcherSettings) -> Self {
        Self {
            store,
            matcher: EntityMatcher::new(store, gateway, matcher),
        }
    }

    /// Applies a non-annotation request. Annotations and unknown calls are
    /// handled by the processor and rejected here.
    pub fn apply(&self, note: &Note, request: &ToolRequest) -> ProcessResult<Applied> {
        match request {
            ToolRequest::CreateAction(args) => self.create_action(note, args),
            ToolRequest::CreateTodo(args) => self.create_todo(note, args),
            ToolRequest::CreateCuriosity(args) => self.create_curiosity(note, args),
            ToolRequest::UpdateNote(args) => self.update_note(note, args),
            ToolRequest::UpdateTodo(args) => self.update_todo(args),
            ToolRequest::UpdateAction(args) => self.update_action(args),
            ToolRequest::CreateAnnotation(_) | ToolRequest::Unknown { .. } => Err(
                ProcessError::validation(format!("`{}` is not dispatchable", request.name())),
            ),
        }
    }

    fn create_action(&self, note: &Note, args: &CreateActionArgs) -> ProcessResult<Applied> {
        let timestamp = match args.action_timestamp.as_deref() {
            Some(value) => parse_timestamp(value).map_err(ProcessError::Validation)?,
            None => note.timestamp,
        };

        let (todo, mark_complete) = match args.todo_id {
            None => (None, false),
            Some(NO_MATCH_ID) => {
                let descriptor = json!({
                    "action_text": args.action_text,
                    "timestamp": args.action_timestamp,
                })
                .to_string();
                let request = MatchRequest::new(MatchTarget::Todo, descriptor, note.timestamp)
                    .with_mark_complete();
                match self.matcher.find(&request)? {
                    Some(found) => match found.entity {
                        MatchedEntity::Todo(todo) => (Some(todo), found.mark_complete),
                        _ => (None, false),
                    },
                    None => (None, false),
                }
            }
            Some(todo_id) => match self.store.get_todo(todo_id)? {
                Some(todo) => (Some(todo), args.mark_complete),
                None => {
                    warn!(
                        "event=action_link module=dispatch status=skip note_id={} todo_id={} reason=todo_missing",
                        note.id, todo_id
                    );
                    (None, false)
                }
            },
        };

        let mark_complete = match &todo {
            Some(todo) if mark_complete && todo.cancelled => {
                warn!(
                    "event=action_link module=dispatch status=skip note_id={} todo_id={} reason=todo_cancelled",
                    note.id, todo.id
                );
                false
            }
            _ => mark_complete,
        };

        let action = self.store.create_action(&NewAction {
            text: args.action_text.trim().to_string(),
            timestamp,
            source_note_id: note.id,
            todo_id: todo.as_ref().map(|todo| todo.id),
            mark_complete,
        })?;

        if let (Some(mut todo), true) = (todo, mark_complete) {
            if !todo.complete {
                todo.complete = true;
                self.store.save_todo(&todo)?;
                info!(
                    "event=todo_complete module=dispatch status=ok todo_id={} action_id={}",
                    todo.id, action.id
                );
            }
        }
        Ok(Applied::created("actions", action.id))
    }

    fn create_todo(&self, note: &Note, args: &CreateTodoArgs) -> ProcessResult<Applied> {
        let target_start_time = parse_optional(args.target_start_time.as_deref())?;
        let target_end_time = parse_optional(args.target_end_time.as_deref())?;
        let explicit_parent = args.parent_id.filter(|id| *id != NO_MATCH_ID);

        let mut todo = self.store.create_todo(&NewTodo {
            text: args.todo_text.trim().to_string(),
            source_note_id: note.id,
            parent_id: explicit_parent,
            target_start_time,
            target_end_time,
        })?;

        if args.parent_id == Some(NO_MATCH_ID) {
            let descriptor = json!({ "todo_text": todo.text }).to_string();
            let request = MatchRequest::new(MatchTarget::Todo, descriptor, note.timestamp)
                .excluding(todo.id);
            if let Some(found) = self.matcher.find(&request)? {
                todo.parent_id = Some(found.entity.id());
                self.store.save_todo(&todo)?;
            } else {
                info!(
                    "event=todo_parent module=dispatch status=skip todo_id={} reason=no_match",
                    todo.id
                );
            }
        }
        Ok(Applied::created("todos", todo.id))
    }

    fn create_curiosity(&self, note: &Note, args: &CreateCuriosityArgs) -> ProcessResult<Applied> {
        let curiosity = self
            .store
            .create_curiosity(args.curiosity_text.trim(), note.id)?;
        Ok(Applied::created("curiosities", curiosity.id))
    }

    fn update_note(&self, note: &Note, args: &UpdateNoteArgs) -> ProcessResult<Applied> {
        if args.note_id == note.id {
            return Err(ProcessError::validation(format!(
                "note {} cannot rewrite itself",
                note.id
            )));
        }
        let target = self
            .store
            .get_note(args.note_id)?
            .ok_or(ProcessError::NotFound {
                table: "notes",
                id: args.note_id,
            })?;
        let applied = Applied::updated("notes", target.id, &target);
        reset_note(self.store, target, Some(args.note_text.trim().to_string()))?;
        Ok(applied)
    }

    fn update_todo(&self, args: &UpdateTodoArgs) -> ProcessResult<Applied> {
        let mut todo = self
            .store
            .get_todo(args.todo_id)?
            .ok_or(ProcessError::NotFound {
                table: "todos",
                id: args.todo_id,
            })?;
        let applied = Applied::updated("todos", todo.id, &todo);

        if let Some(text) = &args.todo_text {
            todo.text = text.trim().to_string();
        }
        if let Some(start) = parse_optional(args.target_start_time.as_deref())? {
            todo.target_start_time = Some(start);
        }
        if let Some(end) = parse_optional(args.target_end_time.as_deref())? {
            todo.target_end_time = Some(end);
        }
        if let Some(parent_id) = args.parent_id.filter(|id| *id != NO_MATCH_ID) {
            todo.parent_id = Some(parent_id);
        }
        if let Some(complete) = args.complete {
            todo.complete = complete;
        }
        if let Some(cancelled) = args.cancelled {
            todo.cancelled = cancelled;
        }
        if todo.complete && todo.cancelled {
            return Err(ProcessError::consistency(format!(
                "todo {} cannot be both complete and cancelled",
                todo.id
            )));
        }

        self.store.save_todo(&todo)?;
        Ok(applied)
    }

    fn update_action(&self, args: &UpdateActionArgs) -> ProcessResult<Applied> {
        let mut action = self
            .store
            .get_action(args.action_id)?
            .ok_or(ProcessError::NotFound {
                table: "actions",
                id: args.action_id,
            })?;
        let applied = Applied::updated("actions", action.id, &action);

        if let Some(text) = &args.action_text {
            action.text = text.trim().to_string();
        }
        if let Some(timestamp) = parse_optional(args.timestamp.as_deref())? {
            action.timestamp = timestamp;
        }
        if let Some(todo_id) = args.todo_id.filter(|id| *id != NO_MATCH_ID) {
            self.store.get_todo(todo_id)?.ok_or(ProcessError::NotFound {
                table: "todos",
                id: todo_id,
            })?;
            action.todo_id = Some(todo_id);
        }
        if let Some(mark_complete) = args.mark_complete {
            action.mark_complete = mark_complete;
        }
        if action.mark_complete {
            if let Some(todo_id) = action.todo_id {
                if let Some(mut todo) = self.store.get_todo(todo_id)? {
                    if todo.cancelled {
                        return Err(ProcessError::consistency(format!(
                            "todo {} is cancelled and cannot be completed",
                            todo.id
                        )));
                    }
                    if !todo.complete {
                        todo.complete = true;
                        self.store.save_todo(&todo)?;
                    }
                }
            }
        }

        self.store.save_action(&action)?;
        Ok(applied)
    }
}

fn parse_optional(value: Option<&str>) -> ProcessResult<Option<i64>> {
    value
        .map(|value| parse_timestamp(value).map_err(ProcessError::Validation))
        .transpose()
}
