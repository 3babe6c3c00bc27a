//! JSON schemas of the offered tools.
//!
//! Id-valued arguments carry an `enum` of the ids the model may pick from;
//! `0` is always allowed where it means "search further".

use super::{
    CREATE_ACTION, CREATE_ANNOTATION, CREATE_COMMAND, CREATE_CURIOSITY, CREATE_TODO,
    SELECT_MATCH, UPDATE_ACTION, UPDATE_NOTE, UPDATE_TODO,
};
use crate::llm::ToolSchema;
use crate::model::category::Category;
use crate::model::command::CommandKind;
use crate::model::timestamp::TIMESTAMP_FORMAT;
use crate::model::{RecordId, NO_MATCH_ID};
use serde_json::{json, Value};

fn id_enum(ids: &[RecordId]) -> Value {
    let mut values = vec![NO_MATCH_ID];
    values.extend(ids.iter().copied().filter(|id| *id != NO_MATCH_ID));
    json!(values)
}

/// Annotation tool; `pinned` restricts the category enum when an existing
/// annotation is regenerated after a recategorization.
pub fn create_annotation_tool(pinned: Option<Category>) -> ToolSchema {
    let categories: Vec<&str> = match pinned {
        Some(category) => vec![category.name()],
        None => Category::ALL.iter().map(|category| category.name()).collect(),
    };
    ToolSchema::new(
        CREATE_ANNOTATION,
        "Classify the note into exactly one category and restate it as a short annotation. \
         Call this exactly once per note.",
        json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "enum": categories,
                    "description": "Category of the note."
                },
                "annotation_text": {
                    "type": "string",
                    "description": "One-line restatement of the note in the user's voice."
                },
                "processed_note_text": {
                    "type": "string",
                    "description": "The note text with spelling and grammar cleaned up. Omit to keep the raw text."
                }
            },
            "required": ["category", "annotation_text"],
            "additionalProperties": false
        }),
    )
}

pub fn create_action_tool(todo_ids: &[RecordId]) -> ToolSchema {
    ToolSchema::new(
        CREATE_ACTION,
        "Log an action the user took or is starting right now. One call per action; no call when \
         the note logs no action.",
        json!({
            "type": "object",
            "properties": {
                "action_text": {
                    "type": "string",
                    "description": "Text of the action, written like a logbook entry."
                },
                "action_timestamp": {
                    "type": "string",
                    "description": format!(
                        "When the action happened, format {TIMESTAMP_FORMAT}. Use the note's \
                         timestamp unless the note states or implies another time."
                    )
                },
                "todo_id": {
                    "type": "integer",
                    "enum": id_enum(todo_ids),
                    "description": "Listed todo this action works on. 0 when the user refers to \
                                    a todo that is not listed; omit when no todo is involved."
                },
                "mark_complete": {
                    "type": "boolean",
                    "description": "True when the action finishes the linked todo."
                }
            },
            "required": ["action_text", "action_timestamp"],
            "additionalProperties": false
        }),
    )
}

pub fn create_todo_tool(todo_ids: &[RecordId]) -> ToolSchema {
    ToolSchema::new(
        CREATE_TODO,
        "Create a todo for something the user intends to do later. One call per todo.",
        json!({
            "type": "object",
            "properties": {
                "todo_text": {
                    "type": "string",
                    "description": "Text of the todo, written like a todo list item."
                },
                "target_start_time": {
                    "type": ["string", "null"],
                    "description": format!(
                        "Planned start, format {TIMESTAMP_FORMAT}. Null unless the user names a start time."
                    )
                },
                "target_end_time": {
                    "type": ["string", "null"],
                    "description": format!(
                        "Deadline, format {TIMESTAMP_FORMAT}. Null unless the user names a deadline."
                    )
                },
                "parent_id": {
                    "type": "integer",
                    "enum": id_enum(todo_ids),
                    "description": "Listed todo that depends on this one. 0 when the parent is \
                                    not listed; omit when there is no parent."
                }
            },
            "required": ["todo_text"],
            "additionalProperties": false
        }),
    )
}

pub fn create_curiosity_tool() -> ToolSchema {
    ToolSchema::new(
        CREATE_CURIOSITY,
        "Record something the user wonders about or wants to learn.",
        json!({
            "type": "object",
            "properties": {
                "curiosity_text": {
                    "type": "string",
                    "description": "The question or topic, stated plainly."
                }
            },
            "required": ["curiosity_text"],
            "additionalProperties": false
        }),
    )
}

pub fn update_note_tool() -> ToolSchema {
    ToolSchema::new(
        UPDATE_NOTE,
        "Replace the raw text of an earlier note. Only when the user clearly asks for it.",
        json!({
            "type": "object",
            "properties": {
                "note_id": { "type": "integer", "description": "Note to rewrite." },
                "note_text": { "type": "string", "description": "New raw text of the note." }
            },
            "required": ["note_id", "note_text"],
            "additionalProperties": false
        }),
    )
}

pub fn update_todo_tool() -> ToolSchema {
    ToolSchema::new(
        UPDATE_TODO,
        "Change fields of an existing todo. Only set the fields the user asked to change.",
        json!({
            "type": "object",
            "properties": {
                "todo_id": { "type": "integer", "description": "Todo to change." },
                "todo_text": { "type": "string" },
                "target_start_time": {
                    "type": "string",
                    "description": format!("Format {TIMESTAMP_FORMAT}.")
                },
                "target_end_time": {
                    "type": "string",
                    "description": format!("Format {TIMESTAMP_FORMAT}.")
                },
                "parent_id": { "type": "integer", "description": "New parent todo." },
                "complete": { "type": "boolean" },
                "cancelled": { "type": "boolean" }
            },
            "required": ["todo_id"],
            "additionalProperties": false
        }),
    )
}

pub fn update_action_tool() -> ToolSchema {
    ToolSchema::new(
        UPDATE_ACTION,
        "Change fields of an existing action. Only set the fields the user asked to change.",
        json!({
            "type": "object",
            "properties": {
                "action_id": { "type": "integer", "description": "Action to change." },
                "action_text": { "type": "string" },
                "timestamp": {
                    "type": "string",
                    "description": format!("Format {TIMESTAMP_FORMAT}.")
                },
                "todo_id": { "type": "integer", "description": "Todo the action works on." },
                "mark_complete": { "type": "boolean", "description": "Whether the action completes that todo." }
            },
            "required": ["action_id"],
            "additionalProperties": false
        }),
    )
}

/// Full menu of the processor's single classification call.
pub fn processor_menu(todo_ids: &[RecordId], pinned: Option<Category>) -> Vec<ToolSchema> {
    vec![
        create_annotation_tool(pinned),
        create_action_tool(todo_ids),
        create_todo_tool(todo_ids),
        create_curiosity_tool(),
        update_note_tool(),
        update_todo_tool(),
        update_action_tool(),
    ]
}

/// Matcher tool over one page of `entity` candidates.
pub fn select_match_tool(entity: &str, candidate_ids: &[RecordId], with_mark_complete: bool) -> ToolSchema {
    let mut properties = json!({
        "id": {
            "type": "integer",
            "enum": id_enum(candidate_ids),
            "description": format!(
                "Id of the {entity} the input refers to, or 0 when none of the listed {entity}s match. \
                 Do not guess."
            )
        }
    });
    if with_mark_complete {
        properties["mark_complete"] = json!({
            "type": "boolean",
            "description": "True when the input finishes the matched item rather than starting or remarking on it."
        });
    }
    ToolSchema::new(
        SELECT_MATCH,
        format!("Pick the {entity} the input refers to."),
        json!({
            "type": "object",
            "properties": properties,
            "required": ["id"],
            "additionalProperties": false
        }),
    )
}

pub fn create_command_tool() -> ToolSchema {
    let kinds: Vec<&str> = CommandKind::ALL.iter().map(|kind| kind.as_str()).collect();
    ToolSchema::new(
        CREATE_COMMAND,
        "Turn the user's instruction into one command against an existing note, todo or action.",
        json!({
            "type": "object",
            "properties": {
                "command_text": {
                    "type": "string",
                    "enum": kinds,
                    "description": "Kind of change requested."
                },
                "value_before": {
                    "type": "string",
                    "description": "Current value of the field being changed, if known."
                },
                "desired_value": {
                    "type": "string",
                    "description": format!(
                        "New value. Category names for update_note_category, {TIMESTAMP_FORMAT} \
                         for times, a todo id for update_todo_parent."
                    )
                },
                "target_id": {
                    "type": "integer",
                    "description": "Id of the record to change when the user names it; 0 or omitted otherwise."
                }
            },
            "required": ["command_text", "desired_value"],
            "additionalProperties": false
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::{create_annotation_tool, create_command_tool, processor_menu, select_match_tool};
    use crate::model::category::Category;
    use crate::model::command::CommandKind;

    #[test]
    fn menu_offers_annotation_plus_six_tools() {
        let names: Vec<String> = processor_menu(&[1, 2], None)
            .into_iter()
            .map(|tool| tool.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "create_annotation",
                "create_action",
                "create_todo",
                "create_curiosity",
                "update_note",
                "update_todo",
                "update_action"
            ]
        );
    }

    #[test]
    fn annotation_enum_lists_every_category() {
        let tool = create_annotation_tool(None);
        let values = tool.parameters["properties"]["category"]["enum"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(values.len(), Category::ALL.len());
        for category in Category::ALL {
            assert!(values.iter().any(|value| value == category.name()));
        }
    }

    #[test]
    fn pinned_annotation_offers_single_category() {
        let tool = create_annotation_tool(Some(Category::Observation));
        assert_eq!(
            tool.parameters["properties"]["category"]["enum"],
            serde_json::json!(["observation"])
        );
    }

    #[test]
    fn select_match_always_allows_zero() {
        let tool = select_match_tool("todo", &[7, 9], true);
        assert_eq!(tool.parameters["properties"]["id"]["enum"], serde_json::json!([0, 7, 9]));
        assert!(tool.parameters["properties"].get("mark_complete").is_some());

        let bare = select_match_tool("note", &[], false);
        assert_eq!(bare.parameters["properties"]["id"]["enum"], serde_json::json!([0]));
        assert!(bare.parameters["properties"].get("mark_complete").is_none());
    }

    #[test]
    fn command_enum_matches_supported_kinds() {
        let tool = create_command_tool();
        let values = tool.parameters["properties"]["command_text"]["enum"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(values, CommandKind::ALL.len());
    }
}
