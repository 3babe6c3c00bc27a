//! Curiosity domain model. Terminal: nothing derives from a curiosity.

use super::RecordId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Curiosity {
    pub id: RecordId,
    pub text: String,
    pub source_note_id: RecordId,
}
