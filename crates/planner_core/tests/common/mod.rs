#![allow(dead_code)]

use planner_core::config::{MatcherSettings, ProcessorSettings};
use planner_core::llm::{GatewayError, ToolGateway, ToolInvocation, ToolSchema};
use planner_core::model::note::Note;
use planner_core::model::timestamp::parse_timestamp;
use planner_core::repo::NoteRepository;
use planner_core::SqliteStore;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;

/// One request seen by [`ScriptedGateway`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub instructions: String,
    pub input: String,
    pub tools: Vec<ToolSchema>,
}

impl RecordedRequest {
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name.as_str()).collect()
    }

    pub fn tool(&self, name: &str) -> &ToolSchema {
        self.tools
            .iter()
            .find(|tool| tool.name == name)
            .unwrap_or_else(|| panic!("tool {name} was not offered"))
    }
}

/// In-process gateway replaying queued replies in order. An exhausted
/// script answers with no tool calls.
#[derive(Default)]
pub struct ScriptedGateway {
    replies: RefCell<VecDeque<Result<Vec<ToolInvocation>, GatewayError>>>,
    requests: RefCell<Vec<RecordedRequest>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, calls: Vec<ToolInvocation>) -> Self {
        self.replies.borrow_mut().push_back(Ok(calls));
        self
    }

    pub fn fail(self, error: GatewayError) -> Self {
        self.replies.borrow_mut().push_back(Err(error));
        self
    }

    pub fn push_reply(&self, calls: Vec<ToolInvocation>) {
        self.replies.borrow_mut().push_back(Ok(calls));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn pending(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl ToolGateway for ScriptedGateway {
    fn call(
        &self,
        instructions: &str,
        input: &str,
        tools: &[ToolSchema],
    ) -> Result<Vec<ToolInvocation>, GatewayError> {
        self.requests.borrow_mut().push(RecordedRequest {
            instructions: instructions.to_string(),
            input: input.to_string(),
            tools: tools.to_vec(),
        });
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub fn call(name: &str, arguments: Value) -> ToolInvocation {
    ToolInvocation::new(name, arguments)
}

pub fn ts(value: &str) -> i64 {
    parse_timestamp(value).unwrap()
}

pub fn note_at(store: &SqliteStore<'_>, text: &str, at: &str) -> Note {
    store.create_note(text, ts(at)).unwrap()
}

pub fn settings() -> ProcessorSettings {
    ProcessorSettings::default()
}

pub fn matcher_settings(page_size: u32, lookback: u32) -> MatcherSettings {
    MatcherSettings {
        page_size,
        lookback,
        window_days: 30,
    }
}
