//! Note domain model.
//!
//! # Responsibility
//! - Hold raw user input and its processing outcome.
//! - Expose the processing lifecycle as an explicit state.
//!
//! # Invariants
//! - A note is created unprocessed with empty processed text and error.
//! - `processing_error` non-empty on a processed note is terminal: the
//!   scheduler never picks it again on its own.

use super::timestamp::format_timestamp;
use super::RecordId;
use serde::{Deserialize, Serialize};

/// Raw user-entered text with a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: RecordId,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    pub note_text: String,
    /// Model rewording of `note_text`; empty until processed.
    pub processed_note_text: String,
    /// Empty when the last processing attempt succeeded.
    pub processing_error: String,
    pub processed: bool,
}

/// Lifecycle of a note inside the pipeline.
///
/// `Processing` only exists in memory while a cycle carries the note; it is
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Unprocessed,
    Processed,
    ProcessedWithError,
}

impl Note {
    pub fn state(&self) -> NoteState {
        match (self.processed, self.processing_error.is_empty()) {
            (false, _) => NoteState::Unprocessed,
            (true, true) => NoteState::Processed,
            (true, false) => NoteState::ProcessedWithError,
        }
    }

    /// Returns the note to the unprocessed queue, optionally replacing text.
    pub fn reset_processing(&mut self, note_text: Option<String>) {
        if let Some(text) = note_text {
            self.note_text = text;
        }
        self.processed_note_text.clear();
        self.processing_error.clear();
        self.processed = false;
    }

    /// Appends an error without discarding earlier ones from the same batch.
    pub fn record_error(&mut self, message: impl AsRef<str>) {
        if !self.processing_error.is_empty() {
            self.processing_error.push_str("; ");
        }
        self.processing_error.push_str(message.as_ref());
    }

    /// Compact one-line rendering used in prompts.
    pub fn prompt_line(&self) -> String {
        format!(
            "[note {}] {} - {}",
            self.id,
            format_timestamp(self.timestamp),
            if self.processed_note_text.is_empty() {
                self.note_text.as_str()
            } else {
                self.processed_note_text.as_str()
            }
        )
    }
}
