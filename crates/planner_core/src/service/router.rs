//! Command router: applies a persisted command to its target record.
//!
//! # Responsibility
//! - Resolve a command's target from its kind and `target_id`.
//! - Apply field mutations and the category-change cascade.
//!
//! # Invariants
//! - Derived records always agree with the note's current category: a
//!   category change deletes records owned by the stale category before the
//!   annotation is flagged for reprocessing.
//! - The annotation is never deleted by a recategorization; it is
//!   regenerated in place on a later cycle.
//! - A note categorized as `command` cannot be recategorized.
//! - Rejections happen before any mutation.

use crate::error::{ProcessError, ProcessResult};
use crate::model::action::Action;
use crate::model::category::{Category, DerivedKind};
use crate::model::command::{Command, CommandKind, CommandTarget};
use crate::model::note::Note;
use crate::model::timestamp::parse_timestamp;
use crate::model::todo::Todo;
use crate::model::RecordId;
use crate::repo::{delete_derived, Store};
use log::info;

/// Cleanup required when a note moves from one category to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadePlan {
    /// The change is refused and nothing is touched.
    Reject,
    /// Same category; nothing to do.
    Unchanged,
    /// Delete the stale derived kind (if any), then flag for reprocessing.
    Recategorize { remove: Option<DerivedKind> },
}

/// The `(old, new) -> cleanup` table for category changes.
pub fn cascade_plan(old: Category, new: Category) -> CascadePlan {
    match (old, new) {
        (Category::Command, _) => CascadePlan::Reject,
        (old, new) if old == new => CascadePlan::Unchanged,
        (old, _) => CascadePlan::Recategorize {
            remove: old.derives(),
        },
    }
}

/// Effect of one routed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    NoteReset { note_id: RecordId, removed: usize },
    Recategorized {
        note_id: RecordId,
        from: Category,
        to: Category,
        removed: usize,
    },
    CategoryUnchanged { note_id: RecordId },
    TodoUpdated(Todo),
    ActionUpdated(Action),
}

pub struct CommandRouter<'a, S: Store + ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> CommandRouter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Validates and applies `command`.
    ///
    /// # Errors
    /// - `Consistency` for unknown kinds, unresolvable targets and
    ///   irreversible states.
    /// - `Validation` for unusable `desired_value`s.
    pub fn route(&self, command: &Command) -> ProcessResult<RouteOutcome> {
        let kind = command.kind().ok_or_else(|| {
            ProcessError::consistency(format!("unknown command `{}`", command.command_text))
        })?;
        if kind.needs_value() && command.desired_value.trim().is_empty() {
            return Err(ProcessError::validation(format!(
                "command `{}` needs a desired value",
                kind.as_str()
            )));
        }

        let outcome = match kind.target() {
            CommandTarget::Note => {
                let note = self.resolve_note(command.target_id)?;
                match kind {
                    CommandKind::UpdateNoteCategory => {
                        self.recategorize(&note, &command.desired_value)?
                    }
                    _ => {
                        let removed = reset_note(self.store, note, Some(command.desired_value.clone()))?;
                        RouteOutcome::NoteReset {
                            note_id: command.target_id,
                            removed,
                        }
                    }
                }
            }
            CommandTarget::Todo => {
                let mut todo = self.resolve_todo(command.target_id)?;
                apply_todo_command(&mut todo, kind, &command.desired_value)?;
                self.store.save_todo(&todo)?;
                RouteOutcome::TodoUpdated(todo)
            }
            CommandTarget::Action => {
                let mut action = self.resolve_action(command.target_id)?;
                apply_action_command(&mut action, kind, &command.desired_value)?;
                self.store.save_action(&action)?;
                RouteOutcome::ActionUpdated(action)
            }
        };

        info!(
            "event=command_route module=router status=ok command_id={} kind={} target_id={}",
            command.id,
            kind.as_str(),
            command.target_id
        );
        Ok(outcome)
    }

    fn recategorize(&self, note: &Note, desired: &str) -> ProcessResult<RouteOutcome> {
        let new = Category::from_name(desired)
            .ok_or_else(|| ProcessError::validation(format!("unknown category `{}`", desired.trim())))?;
        let mut annotation = self.store.annotation_for_note(note.id)?.ok_or_else(|| {
            ProcessError::consistency(format!("note {} has no annotation to recategorize", note.id))
        })?;
        let old = annotation.category;

        match cascade_plan(old, new) {
            CascadePlan::Reject => Err(ProcessError::consistency(format!(
                "note {} is a command; commands cannot be undone",
                note.id
            ))),
            CascadePlan::Unchanged => Ok(RouteOutcome::CategoryUnchanged { note_id: note.id }),
            CascadePlan::Recategorize { remove } => {
                // Derived records are keyed by the note id, not the annotation id.
                let removed = match remove {
                    Some(kind) => delete_derived(self.store, note.id, kind)?,
                    None => 0,
                };
                annotation.mark_for_reprocess(new);
                self.store.save_annotation(&annotation)?;
                info!(
                    "event=note_recategorize module=router status=ok note_id={} from={} to={} removed={}",
                    note.id,
                    old.name(),
                    new.name(),
                    removed
                );
                Ok(RouteOutcome::Recategorized {
                    note_id: note.id,
                    from: old,
                    to: new,
                    removed,
                })
            }
        }
    }

    fn resolve_note(&self, id: RecordId) -> ProcessResult<Note> {
        self.store
            .get_note(id)?
            .ok_or_else(|| unresolved(CommandTarget::Note, id))
    }

    fn resolve_todo(&self, id: RecordId) -> ProcessResult<Todo> {
        self.store
            .get_todo(id)?
            .ok_or_else(|| unresolved(CommandTarget::Todo, id))
    }

    fn resolve_action(&self, id: RecordId) -> ProcessResult<Action> {
        self.store
            .get_action(id)?
            .ok_or_else(|| unresolved(CommandTarget::Action, id))
    }
}

/// Returns a note to the unprocessed queue with optional new text, deleting
/// every action, todo and curiosity derived from it.
///
/// Returns the number of derived records removed.
pub fn reset_note<S: Store + ?Sized>(
    store: &S,
    mut note: Note,
    note_text: Option<String>,
) -> ProcessResult<usize> {
    let mut removed = 0;
    for kind in [DerivedKind::Action, DerivedKind::Todo, DerivedKind::Curiosity] {
        removed += delete_derived(store, note.id, kind)?;
    }
    note.reset_processing(note_text);
    store.save_note(&note)?;
    info!(
        "event=note_reset module=router status=ok note_id={} removed={}",
        note.id, removed
    );
    Ok(removed)
}

fn unresolved(target: CommandTarget, id: RecordId) -> ProcessError {
    ProcessError::consistency(format!(
        "command target {} {} does not exist",
        target.table(),
        id
    ))
}

fn apply_todo_command(todo: &mut Todo, kind: CommandKind, desired: &str) -> ProcessResult<()> {
    let desired = desired.trim();
    match kind {
        CommandKind::UpdateTodoText => todo.text = desired.to_string(),
        CommandKind::UpdateTodoStartTime => todo.target_start_time = parse_optional_time(desired)?,
        CommandKind::UpdateTodoEndTime => todo.target_end_time = parse_optional_time(desired)?,
        CommandKind::UpdateTodoParent => todo.parent_id = parse_optional_id(desired)?,
        CommandKind::CompleteTodo => {
            if todo.cancelled {
                return Err(ProcessError::consistency(format!(
                    "todo {} is cancelled and cannot be completed",
                    todo.id
                )));
            }
            todo.complete = true;
        }
        CommandKind::CancelTodo => {
            if todo.complete {
                return Err(ProcessError::consistency(format!(
                    "todo {} is complete and cannot be cancelled",
                    todo.id
                )));
            }
            todo.cancelled = true;
        }
        other => return Err(mismatched(other, CommandTarget::Todo)),
    }
    Ok(())
}

fn apply_action_command(action: &mut Action, kind: CommandKind, desired: &str) -> ProcessResult<()> {
    let desired = desired.trim();
    match kind {
        CommandKind::UpdateActionText => action.text = desired.to_string(),
        CommandKind::UpdateActionTimestamp => {
            action.timestamp = parse_timestamp(desired).map_err(ProcessError::Validation)?
        }
        other => return Err(mismatched(other, CommandTarget::Action)),
    }
    Ok(())
}

fn mismatched(kind: CommandKind, target: CommandTarget) -> ProcessError {
    ProcessError::consistency(format!(
        "command `{}` does not apply to {}",
        kind.as_str(),
        target.table()
    ))
}

fn is_clear_value(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "" | "none" | "null"
    )
}

fn parse_optional_time(value: &str) -> ProcessResult<Option<i64>> {
    if is_clear_value(value) {
        return Ok(None);
    }
    parse_timestamp(value).map(Some).map_err(ProcessError::Validation)
}

fn parse_optional_id(value: &str) -> ProcessResult<Option<RecordId>> {
    if is_clear_value(value) {
        return Ok(None);
    }
    match value.parse::<RecordId>() {
        Ok(0) => Ok(None),
        Ok(id) if id > 0 => Ok(Some(id)),
        _ => Err(ProcessError::validation(format!("`{value}` is not a todo id"))),
    }
}
