//! Turns a `command` note into a persisted [`Command`] with a resolved target.

use crate::config::MatcherSettings;
use crate::error::{ProcessError, ProcessResult};
use crate::llm::ToolGateway;
use crate::model::annotation::Annotation;
use crate::model::category::Category;
use crate::model::command::{Command, CommandKind, CommandTarget, NewCommand};
use crate::model::note::Note;
use crate::model::timestamp::{format_timestamp, TIMESTAMP_FORMAT};
use crate::model::{RecordId, NO_MATCH_ID};
use crate::repo::Store;
use crate::service::dispatch::{audit, Applied};
use crate::service::matcher::{EntityMatcher, MatchRequest, MatchTarget};
use crate::tools::{create_command_tool, CreateCommandArgs, CREATE_COMMAND};
use log::info;
use serde_json::json;

pub struct CommandBuilder<'a, S: Store + ?Sized, G: ToolGateway + ?Sized> {
    store: &'a S,
    gateway: &'a G,
    matcher: EntityMatcher<'a, S, G>,
}

impl<'a, S: Store + ?Sized, G: ToolGateway + ?Sized> CommandBuilder<'a, S, G> {
    pub fn new(store: &'a S, gateway: &'a G, matcher: MatcherSettings) -> Self {
        Self {
            store,
            gateway,
            matcher: EntityMatcher::new(store, gateway, matcher),
        }
    }

    /// Asks the gateway for the command, resolves its target and persists it.
    ///
    /// # Errors
    /// - `Validation` when no usable `create_command` call comes back or no
    ///   target can be found.
    /// - `NotFound` for an explicit target id that does not exist.
    pub fn build(&self, note: &Note, annotation: &Annotation) -> ProcessResult<Command> {
        let input = json!({
            "note_id": note.id,
            "timestamp": format_timestamp(note.timestamp),
            "note_text": note.note_text,
            "annotation_text": annotation.annotation_text,
        })
        .to_string();

        let invocations = self.gateway.call(
            &command_instructions(),
            &input,
            &[create_command_tool()],
        )?;
        let invocation = invocations
            .iter()
            .find(|invocation| invocation.name == CREATE_COMMAND)
            .ok_or_else(|| ProcessError::validation("no command found matching user input"))?;
        let args = CreateCommandArgs::parse(invocation)?;
        let kind = CommandKind::parse(&args.command_text).ok_or_else(|| {
            ProcessError::validation(format!("unsupported command `{}`", args.command_text))
        })?;

        let target_id = match args.target_id.filter(|id| *id != NO_MATCH_ID) {
            Some(id) => self.require_target(kind.target(), id)?,
            None => self.search_target(note, kind, &input)?,
        };
        if kind.target() == CommandTarget::Note && target_id == note.id {
            return Err(ProcessError::consistency(format!(
                "command note {} cannot target itself",
                note.id
            )));
        }

        let command = self.store.create_command(&NewCommand {
            command_text: kind.as_str().to_string(),
            value_before: args.value_before.unwrap_or_default(),
            desired_value: args.desired_value.unwrap_or_default(),
            source_note_id: note.id,
            target_id,
        })?;
        audit(
            self.store,
            note.id,
            invocation,
            Ok(&Applied {
                table: "commands",
                id: command.id,
                snapshot: None,
            }),
        )?;
        info!(
            "event=command_create module=command_builder status=ok note_id={} command_id={} kind={} target_id={}",
            note.id,
            command.id,
            kind.as_str(),
            target_id
        );
        Ok(command)
    }

    fn require_target(&self, target: CommandTarget, id: RecordId) -> ProcessResult<RecordId> {
        let exists = match target {
            CommandTarget::Note => self.store.get_note(id)?.is_some(),
            CommandTarget::Todo => self.store.get_todo(id)?.is_some(),
            CommandTarget::Action => self.store.get_action(id)?.is_some(),
        };
        if !exists {
            return Err(ProcessError::NotFound {
                table: target.table(),
                id,
            });
        }
        Ok(id)
    }

    fn search_target(&self, note: &Note, kind: CommandKind, descriptor: &str) -> ProcessResult<RecordId> {
        let target = MatchTarget::from(kind.target());
        let mut request = MatchRequest::new(target, descriptor, note.timestamp);
        if target == MatchTarget::Note {
            request = request.excluding(note.id);
        }
        self.matcher
            .find(&request)?
            .map(|found| found.entity.id())
            .ok_or_else(|| {
                ProcessError::validation(format!("no target {} found", target.label()))
            })
    }
}

fn command_instructions() -> String {
    let categories = Category::ALL
        .iter()
        .map(|category| category.name())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "The user wrote a note that instructs the system to change something they logged \
         earlier. Call `create_command` once.\n\
         - update_note_text / update_note_category change an earlier note; categories are: {categories}.\n\
         - update_todo_* / complete_todo / cancel_todo change a todo.\n\
         - update_action_* change an action.\n\
         Times use the format {TIMESTAMP_FORMAT}. Give target_id only when the user names the id."
    )
}
