//! Closed category taxonomy.
//!
//! # Responsibility
//! - Name the five classification tags a note can receive.
//! - Own the natural-language descriptions embedded verbatim in prompts.
//!
//! # Invariants
//! - The set is closed; adding a category means updating the schema seed,
//!   the annotation tool enum and the prompt together.
//! - Seed ids are stable: `Category::id()` is the `categories.id` value.

use serde::{Deserialize, Serialize};

/// Classification tag of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Action,
    Todo,
    Curiosity,
    Observation,
    Command,
}

/// Kind of record a category derives from its note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedKind {
    Action,
    Todo,
    Curiosity,
}

impl DerivedKind {
    /// Storage table holding this kind.
    pub fn table(self) -> &'static str {
        match self {
            Self::Action => "actions",
            Self::Todo => "todos",
            Self::Curiosity => "curiosities",
        }
    }
}

impl Category {
    /// All categories in seed order.
    pub const ALL: [Category; 5] = [
        Category::Action,
        Category::Todo,
        Category::Curiosity,
        Category::Observation,
        Category::Command,
    ];

    /// Stable seed id.
    pub fn id(self) -> i64 {
        match self {
            Self::Action => 1,
            Self::Todo => 2,
            Self::Curiosity => 3,
            Self::Observation => 4,
            Self::Command => 5,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Todo => "todo",
            Self::Curiosity => "curiosity",
            Self::Observation => "observation",
            Self::Command => "command",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.name() == normalized)
    }

    /// Display color used by front ends.
    pub fn color(self) -> &'static str {
        match self {
            Self::Action => "blue",
            Self::Todo => "cyan",
            Self::Curiosity => "yellow",
            Self::Observation => "magenta",
            Self::Command => "red",
        }
    }

    /// Prompt description, embedded verbatim into gateway instructions.
    pub fn description(self) -> &'static str {
        match self {
            Self::Action => {
                "Documents an action taken by the user. Anything the user says they did, or \
                 anything the user says they are about to do in the immediate future. This \
                 pertains to an action that was taken, not a task to be completed. It excludes \
                 something that seems like an action but is actually an observation. It does \
                 include future tense actions that sound like they happen immediately. For \
                 example, I am -> action, I just -> action, I will later -> not an action."
            }
            Self::Todo => {
                "Indicates a user's intention to complete a task. It is the intent to do an \
                 action at some later point rather than right away."
            }
            Self::Curiosity => {
                "Something the user is curious about, or wants to learn more about. This can \
                 be a wondering, or a direct question to the system. I wonder, I am curious \
                 about."
            }
            Self::Observation => {
                "Documents something the user has learned or observed. It is anything the user \
                 puts in that is simply storing a thought. A user cannot observe their own \
                 action; if it seems like the user is observing the result of something they \
                 did, it is an observation."
            }
            Self::Command => {
                "A command from the user to the system, for example an instruction to change \
                 the category of a note, to update an existing todo, to update a note, or to \
                 change the timing of something already logged. Any time the user is talking \
                 to the system rather than describing something they have done, experienced \
                 or need to do, it is a command."
            }
        }
    }

    /// Derived record kind owned by notes of this category.
    pub fn derives(self) -> Option<DerivedKind> {
        match self {
            Self::Action => Some(DerivedKind::Action),
            Self::Todo => Some(DerivedKind::Todo),
            Self::Curiosity => Some(DerivedKind::Curiosity),
            Self::Observation | Self::Command => None,
        }
    }

    /// One prompt line: `\t - name - description`.
    pub fn prompt_line(self) -> String {
        format!("\t - {} - {}", self.name(), self.description())
    }
}
