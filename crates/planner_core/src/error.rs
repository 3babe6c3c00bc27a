//! Error taxonomy of the processing pipeline.
//!
//! Storage errors are folded into the pipeline kinds where they carry the
//! same meaning (`NotFound`, `ParentCycle`, todo field validation) so callers
//! match on one enum.

use crate::llm::GatewayError;
use crate::model::RecordId;
use crate::repo::RepoError;
use crate::tools::ToolArgsError;
use thiserror::Error;

pub type ProcessResult<T> = Result<T, ProcessError>;

#[derive(Debug, Error)]
pub enum ProcessError {
    /// Referenced record is absent.
    #[error("{table} {id} not found")]
    NotFound { table: &'static str, id: RecordId },
    /// Malformed or incomplete tool-call arguments or field values.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Gateway unreachable or repeatedly malformed after retries.
    #[error(transparent)]
    Transport(#[from] GatewayError),
    /// Target is in a state the requested change cannot apply to.
    #[error("{0}")]
    Consistency(String),
    #[error("todo {todo_id} cannot be placed under {parent_id}: parent chain would loop")]
    ParentCycle {
        todo_id: RecordId,
        parent_id: RecordId,
    },
    #[error(transparent)]
    Repo(RepoError),
}

impl ProcessError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency(message.into())
    }

    /// Stable short code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "validation",
            Self::Transport(_) => "transport",
            Self::Consistency(_) => "consistency",
            Self::ParentCycle { .. } => "parent_cycle",
            Self::Repo(_) => "repo",
        }
    }
}

impl From<RepoError> for ProcessError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { table, id } => Self::NotFound { table, id },
            RepoError::ParentCycle { todo_id, parent_id } => {
                Self::ParentCycle { todo_id, parent_id }
            }
            RepoError::Todo(err) => Self::Validation(err.to_string()),
            other => Self::Repo(other),
        }
    }
}

impl From<ToolArgsError> for ProcessError {
    fn from(value: ToolArgsError) -> Self {
        Self::Validation(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::ProcessError;
    use crate::model::todo::TodoValidationError;
    use crate::repo::RepoError;

    #[test]
    fn repo_errors_map_onto_pipeline_kinds() {
        let not_found: ProcessError = RepoError::NotFound { table: "todos", id: 4 }.into();
        assert_eq!(not_found.code(), "not_found");
        assert_eq!(not_found.to_string(), "todos 4 not found");

        let cycle: ProcessError = RepoError::ParentCycle {
            todo_id: 1,
            parent_id: 2,
        }
        .into();
        assert_eq!(cycle.code(), "parent_cycle");

        let invalid: ProcessError = RepoError::Todo(TodoValidationError::BlankText).into();
        assert_eq!(invalid.code(), "validation");
    }
}
