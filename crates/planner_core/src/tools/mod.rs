//! Tool menu offered to the gateway and validation of what comes back.
//!
//! # Responsibility
//! - Build the JSON schemas of every tool the pipeline offers.
//! - Parse raw [`ToolInvocation`]s into the tagged [`ToolRequest`] union at
//!   the boundary, so dispatch code only sees typed, validated arguments.
//!
//! # Invariants
//! - Unknown tool names never fail parsing; they become
//!   [`ToolRequest::Unknown`] and are skipped by dispatch.
//! - Required text arguments are non-blank after parsing.
//! - Optional string arguments sent as `""` are treated as absent.

pub mod schema;

use crate::llm::ToolInvocation;
use crate::model::category::Category;
use crate::model::RecordId;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

pub use schema::{
    create_action_tool, create_annotation_tool, create_command_tool, create_curiosity_tool,
    create_todo_tool, processor_menu, select_match_tool, update_action_tool, update_note_tool,
    update_todo_tool,
};

pub const CREATE_ANNOTATION: &str = "create_annotation";
pub const CREATE_ACTION: &str = "create_action";
pub const CREATE_TODO: &str = "create_todo";
pub const CREATE_CURIOSITY: &str = "create_curiosity";
pub const UPDATE_NOTE: &str = "update_note";
pub const UPDATE_TODO: &str = "update_todo";
pub const UPDATE_ACTION: &str = "update_action";
pub const SELECT_MATCH: &str = "select_match";
pub const CREATE_COMMAND: &str = "create_command";

/// Arguments did not satisfy the tool's contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid arguments for `{tool}`: {reason}")]
pub struct ToolArgsError {
    pub tool: String,
    pub reason: String,
}

impl ToolArgsError {
    fn new(tool: &str, reason: impl Into<String>) -> Self {
        Self {
            tool: tool.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateAnnotationArgs {
    pub category: Category,
    pub annotation_text: String,
    #[serde(default)]
    pub processed_note_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateActionArgs {
    pub action_text: String,
    /// Falls back to the note's timestamp when absent.
    #[serde(default)]
    pub action_timestamp: Option<String>,
    /// `Some(0)` asks for a matcher search.
    #[serde(default)]
    pub todo_id: Option<RecordId>,
    #[serde(default)]
    pub mark_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateTodoArgs {
    pub todo_text: String,
    #[serde(default)]
    pub target_start_time: Option<String>,
    #[serde(default)]
    pub target_end_time: Option<String>,
    /// `Some(0)` asks for a matcher search.
    #[serde(default)]
    pub parent_id: Option<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateCuriosityArgs {
    pub curiosity_text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateNoteArgs {
    pub note_id: RecordId,
    pub note_text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateTodoArgs {
    pub todo_id: RecordId,
    #[serde(default)]
    pub todo_text: Option<String>,
    #[serde(default)]
    pub target_start_time: Option<String>,
    #[serde(default)]
    pub target_end_time: Option<String>,
    #[serde(default)]
    pub parent_id: Option<RecordId>,
    #[serde(default)]
    pub complete: Option<bool>,
    #[serde(default)]
    pub cancelled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateActionArgs {
    pub action_id: RecordId,
    #[serde(default)]
    pub action_text: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub todo_id: Option<RecordId>,
    #[serde(default)]
    pub mark_complete: Option<bool>,
}

/// Matcher answer: `id == 0` means none of the candidates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectMatchArgs {
    pub id: RecordId,
    #[serde(default)]
    pub mark_complete: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateCommandArgs {
    pub command_text: String,
    #[serde(default)]
    pub value_before: Option<String>,
    #[serde(default)]
    pub desired_value: Option<String>,
    #[serde(default)]
    pub target_id: Option<RecordId>,
}

/// Validated processor tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    CreateAnnotation(CreateAnnotationArgs),
    CreateAction(CreateActionArgs),
    CreateTodo(CreateTodoArgs),
    CreateCuriosity(CreateCuriosityArgs),
    UpdateNote(UpdateNoteArgs),
    UpdateTodo(UpdateTodoArgs),
    UpdateAction(UpdateActionArgs),
    Unknown { name: String },
}

impl ToolRequest {
    /// Parses one invocation from the processor menu.
    pub fn parse(invocation: &ToolInvocation) -> Result<Self, ToolArgsError> {
        let name = invocation.name.as_str();
        let request = match name {
            CREATE_ANNOTATION => {
                let mut args: CreateAnnotationArgs = decode(invocation)?;
                require_text(name, "annotation_text", &args.annotation_text)?;
                args.processed_note_text = non_blank(args.processed_note_text);
                Self::CreateAnnotation(args)
            }
            CREATE_ACTION => {
                let mut args: CreateActionArgs = decode(invocation)?;
                require_text(name, "action_text", &args.action_text)?;
                args.action_timestamp = non_blank(args.action_timestamp);
                Self::CreateAction(args)
            }
            CREATE_TODO => {
                let mut args: CreateTodoArgs = decode(invocation)?;
                require_text(name, "todo_text", &args.todo_text)?;
                args.target_start_time = non_blank(args.target_start_time);
                args.target_end_time = non_blank(args.target_end_time);
                Self::CreateTodo(args)
            }
            CREATE_CURIOSITY => {
                let args: CreateCuriosityArgs = decode(invocation)?;
                require_text(name, "curiosity_text", &args.curiosity_text)?;
                Self::CreateCuriosity(args)
            }
            UPDATE_NOTE => {
                let args: UpdateNoteArgs = decode(invocation)?;
                require_text(name, "note_text", &args.note_text)?;
                Self::UpdateNote(args)
            }
            UPDATE_TODO => {
                let mut args: UpdateTodoArgs = decode(invocation)?;
                args.todo_text = non_blank(args.todo_text);
                args.target_start_time = non_blank(args.target_start_time);
                args.target_end_time = non_blank(args.target_end_time);
                Self::UpdateTodo(args)
            }
            UPDATE_ACTION => {
                let mut args: UpdateActionArgs = decode(invocation)?;
                args.action_text = non_blank(args.action_text);
                args.timestamp = non_blank(args.timestamp);
                Self::UpdateAction(args)
            }
            other => Self::Unknown {
                name: other.to_string(),
            },
        };
        Ok(request)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::CreateAnnotation(_) => CREATE_ANNOTATION,
            Self::CreateAction(_) => CREATE_ACTION,
            Self::CreateTodo(_) => CREATE_TODO,
            Self::CreateCuriosity(_) => CREATE_CURIOSITY,
            Self::UpdateNote(_) => UPDATE_NOTE,
            Self::UpdateTodo(_) => UPDATE_TODO,
            Self::UpdateAction(_) => UPDATE_ACTION,
            Self::Unknown { name } => name,
        }
    }

    /// Category a creation tool derives records for; `None` for
    /// annotations, updates and unknown calls.
    pub fn created_category(&self) -> Option<Category> {
        match self {
            Self::CreateAction(_) => Some(Category::Action),
            Self::CreateTodo(_) => Some(Category::Todo),
            Self::CreateCuriosity(_) => Some(Category::Curiosity),
            _ => None,
        }
    }
}

impl SelectMatchArgs {
    pub fn parse(invocation: &ToolInvocation) -> Result<Self, ToolArgsError> {
        if invocation.name != SELECT_MATCH {
            return Err(ToolArgsError::new(
                &invocation.name,
                format!("expected `{SELECT_MATCH}`"),
            ));
        }
        decode(invocation)
    }
}

impl CreateCommandArgs {
    pub fn parse(invocation: &ToolInvocation) -> Result<Self, ToolArgsError> {
        if invocation.name != CREATE_COMMAND {
            return Err(ToolArgsError::new(
                &invocation.name,
                format!("expected `{CREATE_COMMAND}`"),
            ));
        }
        let mut args: Self = decode(invocation)?;
        require_text(CREATE_COMMAND, "command_text", &args.command_text)?;
        args.value_before = non_blank(args.value_before);
        args.desired_value = non_blank(args.desired_value);
        Ok(args)
    }
}

fn decode<T: DeserializeOwned>(invocation: &ToolInvocation) -> Result<T, ToolArgsError> {
    serde_json::from_value(invocation.arguments.clone())
        .map_err(|err| ToolArgsError::new(&invocation.name, err.to_string()))
}

fn require_text(tool: &str, field: &str, value: &str) -> Result<(), ToolArgsError> {
    if value.trim().is_empty() {
        return Err(ToolArgsError::new(tool, format!("`{field}` must not be blank")));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::{CreateCommandArgs, SelectMatchArgs, ToolRequest};
    use crate::llm::ToolInvocation;
    use crate::model::category::Category;
    use serde_json::json;

    fn call(name: &str, arguments: serde_json::Value) -> ToolInvocation {
        ToolInvocation::new(name, arguments)
    }

    #[test]
    fn parses_annotation_with_category_name() {
        let request = ToolRequest::parse(&call(
            "create_annotation",
            json!({"category": "todo", "annotation_text": "call mom", "processed_note_text": ""}),
        ))
        .unwrap();
        let ToolRequest::CreateAnnotation(args) = request else {
            panic!("expected annotation");
        };
        assert_eq!(args.category, Category::Todo);
        assert_eq!(args.processed_note_text, None);
    }

    #[test]
    fn unknown_category_is_validation_error() {
        let err = ToolRequest::parse(&call(
            "create_annotation",
            json!({"category": "dream", "annotation_text": "x"}),
        ))
        .unwrap_err();
        assert_eq!(err.tool, "create_annotation");
    }

    #[test]
    fn missing_required_argument_is_validation_error() {
        assert!(ToolRequest::parse(&call("create_todo", json!({}))).is_err());
        assert!(ToolRequest::parse(&call("create_curiosity", json!({"curiosity_text": "  "}))).is_err());
        assert!(ToolRequest::parse(&call("update_note", json!({"note_id": "five", "note_text": "x"}))).is_err());
    }

    #[test]
    fn unknown_tool_is_skippable_variant() {
        let request = ToolRequest::parse(&call("launch_rockets", json!({"count": 3}))).unwrap();
        assert_eq!(
            request,
            ToolRequest::Unknown {
                name: "launch_rockets".to_string()
            }
        );
        assert_eq!(request.created_category(), None);
    }

    #[test]
    fn null_optionals_are_absent() {
        let request = ToolRequest::parse(&call(
            "create_todo",
            json!({"todo_text": "call mom", "target_start_time": null, "target_end_time": "", "parent_id": null}),
        ))
        .unwrap();
        let ToolRequest::CreateTodo(args) = request else {
            panic!("expected todo");
        };
        assert_eq!(args.target_start_time, None);
        assert_eq!(args.target_end_time, None);
        assert_eq!(args.parent_id, None);
    }

    #[test]
    fn creation_tools_report_their_category() {
        let action = ToolRequest::parse(&call("create_action", json!({"action_text": "woke up"}))).unwrap();
        assert_eq!(action.created_category(), Some(Category::Action));
        let update = ToolRequest::parse(&call("update_todo", json!({"todo_id": 3, "complete": true}))).unwrap();
        assert_eq!(update.created_category(), None);
    }

    #[test]
    fn select_match_requires_its_own_name() {
        let args = SelectMatchArgs::parse(&call("select_match", json!({"id": 0}))).unwrap();
        assert_eq!(args.id, 0);
        assert!(SelectMatchArgs::parse(&call("create_todo", json!({"id": 1}))).is_err());
    }

    #[test]
    fn command_args_default_values_to_absent() {
        let args = CreateCommandArgs::parse(&call(
            "create_command",
            json!({"command_text": "complete_todo", "target_id": 4}),
        ))
        .unwrap();
        assert_eq!(args.target_id, Some(4));
        assert_eq!(args.desired_value, None);
    }
}
