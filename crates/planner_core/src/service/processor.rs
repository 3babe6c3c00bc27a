//! Note processor: classification and extraction of one note.
//!
//! # Responsibility
//! - Build the bounded context window and issue one gateway call offering
//!   the full tool menu.
//! - Apply the annotation first, then dispatch the remaining calls in order.
//! - Hand `command` notes to the command builder and router.
//!
//! # Invariants
//! - After a successful run the note is processed and owns exactly one
//!   annotation with `reprocess = false`.
//! - Creation calls that disagree with the note's category are skipped.
//! - A failing call records `processing_error` and the batch continues;
//!   the batch is not atomic across calls.
//! - Gateway failures propagate; the scheduler records them on the note.

use crate::config::ProcessorSettings;
use crate::error::{ProcessError, ProcessResult};
use crate::llm::{ToolGateway, ToolInvocation};
use crate::model::annotation::Annotation;
use crate::model::category::Category;
use crate::model::note::Note;
use crate::model::timestamp::{format_timestamp, TIMESTAMP_FORMAT};
use crate::model::RecordId;
use crate::repo::{ListQuery, Store, TodoListQuery, TodoStatusFilter};
use crate::service::command_builder::CommandBuilder;
use crate::service::dispatch::{audit, request_target, Applied, Dispatcher};
use crate::service::router::CommandRouter;
use crate::tools::{processor_menu, CreateAnnotationArgs, ToolRequest};
use log::{info, warn};
use serde_json::json;
use std::time::Instant;

pub const NOT_ANNOTATED_ERROR: &str = "note was not annotated";

/// Summary of one processor run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessReport {
    pub note_id: RecordId,
    pub category: Option<Category>,
    /// Calls applied successfully, annotation included.
    pub applied: usize,
    /// Unknown, invalid, duplicate or off-category calls.
    pub skipped: usize,
    /// Calls that raised an error while applying.
    pub failed: usize,
    pub command_id: Option<RecordId>,
}

/// Prompt context shown alongside the note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextWindow {
    pub notes: Vec<String>,
    pub actions: Vec<String>,
    pub open_todos: Vec<String>,
    pub open_todo_ids: Vec<RecordId>,
}

pub struct NoteProcessor<'a, S: Store + ?Sized, G: ToolGateway + ?Sized> {
    store: &'a S,
    gateway: &'a G,
    settings: ProcessorSettings,
}

impl<'a, S: Store + ?Sized, G: ToolGateway + ?Sized> NoteProcessor<'a, S, G> {
    pub fn new(store: &'a S, gateway: &'a G, settings: ProcessorSettings) -> Self {
        Self {
            store,
            gateway,
            settings,
        }
    }

    /// Classifies and extracts an unprocessed note.
    pub fn process(&self, note: Note) -> ProcessResult<ProcessReport> {
        self.run(note, None)
    }

    /// Regenerates a reprocess-flagged annotation with its category pinned.
    pub fn reprocess(&self, annotation: Annotation) -> ProcessResult<ProcessReport> {
        let mut note = self
            .store
            .get_note(annotation.note_id)?
            .ok_or(ProcessError::NotFound {
                table: "notes",
                id: annotation.note_id,
            })?;
        note.processing_error.clear();
        self.run(note, Some(annotation))
    }

    /// Recent notes, actions and open todos before the note's timestamp.
    pub fn context_window(&self, note: &Note) -> ProcessResult<ContextWindow> {
        let limit = self.settings.context_limit;
        let before = ListQuery {
            before: Some(note.timestamp),
            limit: Some(limit),
            ..ListQuery::default()
        };
        let notes = self.store.list_notes(&before)?;
        let actions = self.store.list_actions(&before)?;
        let todos = self.store.list_todos(&TodoListQuery {
            list: before.clone(),
            status: TodoStatusFilter::Open,
            exclude_id: None,
        })?;

        Ok(ContextWindow {
            notes: notes.iter().rev().map(Note::prompt_line).collect(),
            actions: actions.iter().rev().map(|action| action.prompt_line()).collect(),
            open_todo_ids: todos.iter().map(|todo| todo.id).collect(),
            open_todos: todos.iter().map(|todo| todo.prompt_line()).collect(),
        })
    }

    fn run(&self, mut note: Note, pinned: Option<Annotation>) -> ProcessResult<ProcessReport> {
        let started_at = Instant::now();
        let mode = if pinned.is_some() { "reprocess" } else { "process" };
        info!(
            "event=note_process module=processor status=start note_id={} mode={}",
            note.id, mode
        );

        let context = self.context_window(&note)?;
        let instructions = build_instructions(&context, pinned.as_ref().map(|a| a.category));
        let input = json!({
            "note_id": note.id,
            "timestamp": format_timestamp(note.timestamp),
            "note_text": note.note_text,
        })
        .to_string();
        let tools = processor_menu(&context.open_todo_ids, pinned.as_ref().map(|a| a.category));
        let invocations = self.gateway.call(&instructions, &input, &tools)?;

        let mut report = ProcessReport {
            note_id: note.id,
            ..ProcessReport::default()
        };

        let mut annotation_calls = Vec::new();
        let mut other_calls = Vec::new();
        for invocation in &invocations {
            match ToolRequest::parse(invocation) {
                Ok(ToolRequest::CreateAnnotation(args)) => annotation_calls.push((invocation, args)),
                Ok(ToolRequest::Unknown { name }) => {
                    warn!(
                        "event=tool_skip module=processor status=skip note_id={} tool={} reason=unknown_tool",
                        note.id, name
                    );
                    report.skipped += 1;
                }
                Ok(request) => other_calls.push((invocation, request)),
                Err(err) => {
                    warn!(
                        "event=tool_skip module=processor status=skip note_id={} tool={} reason=invalid_args error={}",
                        note.id, invocation.name, err
                    );
                    report.skipped += 1;
                }
            }
        }

        if annotation_calls.len() > 1 {
            warn!(
                "event=tool_skip module=processor status=skip note_id={} tool=create_annotation reason=duplicate count={}",
                note.id,
                annotation_calls.len() - 1
            );
            report.skipped += annotation_calls.len() - 1;
        }
        let annotation = match annotation_calls.into_iter().next() {
            Some((invocation, args)) => {
                match self.apply_annotation(&mut note, pinned, invocation, args) {
                    Ok(annotation) => {
                        report.applied += 1;
                        Some(annotation)
                    }
                    Err(err) => {
                        note.record_error(err.to_string());
                        report.failed += 1;
                        None
                    }
                }
            }
            None => {
                note.record_error(NOT_ANNOTATED_ERROR);
                None
            }
        };
        let category = annotation.as_ref().map(|annotation| annotation.category);
        report.category = category;

        let dispatcher = Dispatcher::new(self.store, self.gateway, self.settings.matcher);
        for (invocation, request) in other_calls {
            if let Some(kind) = request.created_category() {
                if category != Some(kind) {
                    warn!(
                        "event=tool_skip module=processor status=skip note_id={} tool={} reason=category_mismatch category={}",
                        note.id,
                        request.name(),
                        category.map_or("none", Category::name)
                    );
                    report.skipped += 1;
                    continue;
                }
            }

            match dispatcher.apply(&note, &request) {
                Ok(applied) => {
                    audit(self.store, note.id, invocation, Ok(&applied))?;
                    report.applied += 1;
                }
                Err(err @ ProcessError::Transport(_)) => return Err(err),
                Err(err) => {
                    let (table, target_id) = request_target(&request);
                    warn!(
                        "event=tool_apply module=processor status=error note_id={} tool={} code={}",
                        note.id,
                        request.name(),
                        err.code()
                    );
                    audit(self.store, note.id, invocation, Err((table, target_id, &err)))?;
                    note.record_error(err.to_string());
                    report.failed += 1;
                }
            }
        }

        if let Some(annotation) = annotation.as_ref().filter(|a| a.category == Category::Command) {
            match self.run_command(&note, annotation) {
                Ok(command_id) => report.command_id = Some(command_id),
                Err(err @ ProcessError::Transport(_)) => return Err(err),
                Err(err) => {
                    warn!(
                        "event=command_apply module=processor status=error note_id={} code={}",
                        note.id,
                        err.code()
                    );
                    note.record_error(err.to_string());
                    report.failed += 1;
                }
            }
        }

        note.processed = true;
        self.store.save_note(&note)?;
        info!(
            "event=note_process module=processor status=ok note_id={} mode={} category={} applied={} skipped={} failed={} duration_ms={}",
            note.id,
            mode,
            category.map_or("none", Category::name),
            report.applied,
            report.skipped,
            report.failed,
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    fn apply_annotation(
        &self,
        note: &mut Note,
        pinned: Option<Annotation>,
        invocation: &ToolInvocation,
        args: CreateAnnotationArgs,
    ) -> ProcessResult<Annotation> {
        let is_pinned = pinned.is_some();
        let existing = match pinned {
            Some(annotation) => Some(annotation),
            None => self.store.annotation_for_note(note.id)?,
        };

        let (annotation, applied) = match existing {
            Some(mut annotation) => {
                let before = Applied {
                    table: "annotations",
                    id: annotation.id,
                    snapshot: serde_json::to_string(&annotation).ok(),
                };
                if !is_pinned {
                    annotation.category = args.category;
                } else if annotation.category != args.category {
                    warn!(
                        "event=annotation_pin module=processor status=skip note_id={} requested={} pinned={}",
                        note.id,
                        args.category.name(),
                        annotation.category.name()
                    );
                }
                annotation.annotation_text = args.annotation_text.trim().to_string();
                annotation.reprocess = false;
                self.store.save_annotation(&annotation)?;
                (annotation, before)
            }
            None => {
                let annotation = self.store.create_annotation(
                    note.id,
                    args.category,
                    args.annotation_text.trim(),
                )?;
                let applied = Applied {
                    table: "annotations",
                    id: annotation.id,
                    snapshot: None,
                };
                (annotation, applied)
            }
        };
        audit(self.store, note.id, invocation, Ok(&applied))?;

        note.processed_note_text = args
            .processed_note_text
            .unwrap_or_else(|| note.note_text.clone());
        Ok(annotation)
    }

    fn run_command(&self, note: &Note, annotation: &Annotation) -> ProcessResult<RecordId> {
        let builder = CommandBuilder::new(self.store, self.gateway, self.settings.matcher);
        let command = builder.build(note, annotation)?;
        CommandRouter::new(self.store).route(&command)?;
        Ok(command.id)
    }
}

fn build_instructions(context: &ContextWindow, pinned: Option<Category>) -> String {
    let categories = Category::ALL
        .iter()
        .map(|category| category.prompt_line())
        .collect::<Vec<_>>()
        .join("\n");
    let section = |title: &str, lines: &[String]| {
        if lines.is_empty() {
            format!("{title}: none")
        } else {
            format!("{title}:\n{}", lines.join("\n"))
        }
    };
    let pin = match pinned {
        Some(category) => format!(
            "\nThe user has already set this note's category to `{}`; annotate it as such.\n",
            category.name()
        ),
        None => String::new(),
    };

    format!(
        "You are a notetaking assistant. Classify the user's note and extract what it logs.\n\
         Always call `create_annotation` exactly once. Then call the creation tool matching the \
         category (create_action, create_todo or create_curiosity) once per item, and the update \
         tools only when the user explicitly asks to change an earlier record.\n\
         Timestamps use the format {TIMESTAMP_FORMAT}.\n\n\
         Categories:\n{categories}\n{pin}\n{}\n\n{}\n\n{}",
        section("Recent notes", &context.notes),
        section("Recent actions", &context.actions),
        section("Open todos", &context.open_todos),
    )
}

#[cfg(test)]
mod tests {
    use super::{build_instructions, ContextWindow};
    use crate::model::category::Category;

    #[test]
    fn instructions_embed_every_category_description_verbatim() {
        let prompt = build_instructions(&ContextWindow::default(), None);
        for category in Category::ALL {
            assert!(prompt.contains(category.description()), "{}", category.name());
        }
        assert!(prompt.contains("Open todos: none"));
    }

    #[test]
    fn pinned_category_is_announced() {
        let prompt = build_instructions(&ContextWindow::default(), Some(Category::Observation));
        assert!(prompt.contains("`observation`"));
    }
}
