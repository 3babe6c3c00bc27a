//! Annotation domain model.
//!
//! # Invariants
//! - At most one annotation exists per note (`annotations.note_id` is unique).
//! - `reprocess = true` means the next cycle regenerates this annotation in
//!   place; the row itself is not deleted.

use super::category::Category;
use super::RecordId;
use serde::{Deserialize, Serialize};

/// Live classification and rephrased text for a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: RecordId,
    pub note_id: RecordId,
    /// Persisted as `categories.id`.
    pub category: Category,
    pub annotation_text: String,
    pub reprocess: bool,
}

impl Annotation {
    /// Switches category and flags the annotation for regeneration.
    pub fn mark_for_reprocess(&mut self, category: Category) {
        self.category = category;
        self.reprocess = true;
    }
}
