//! Processing pipeline services.
//!
//! # Responsibility
//! - Orchestrate repository and gateway calls into the note pipeline:
//!   matching, processing, dispatch, command routing and scheduling.
//! - Keep front ends decoupled from storage and LLM details.

pub mod command_builder;
pub mod dispatch;
pub mod matcher;
pub mod processor;
pub mod router;
pub mod scheduler;

pub use command_builder::CommandBuilder;
pub use dispatch::{Applied, Dispatcher};
pub use matcher::{EntityMatcher, MatchRequest, MatchResult, MatchTarget, MatchedEntity};
pub use processor::{ContextWindow, NoteProcessor, ProcessReport, NOT_ANNOTATED_ERROR};
pub use router::{cascade_plan, CascadePlan, CommandRouter, RouteOutcome};
pub use scheduler::{CycleOutcome, Scheduler};
