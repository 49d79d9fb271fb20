//! Note domain model.
//!
//! # Responsibility
//! - Define the persisted note record and its create/update inputs.
//! - Validate create candidates before they reach storage.
//!
//! # Invariants
//! - `id`, `local_id` and `created_at` never change after creation.
//! - `local_id` identifies at most one note (upsert key).
//! - Updates replace the full mutable field set (`title`, `content`,
//!   `cover_image`); there is no field-level patching.

use crate::model::cover::CoverImage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable server-assigned identifier of a note.
pub type NoteId = Uuid;

/// Title applied upstream when the user has not typed one yet.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Body used for freshly created notes: one empty paragraph.
pub const EMPTY_NOTE_CONTENT: &str = "<p></p>";

const LOCAL_ID_MAX_CHARS: usize = 128;

/// Persisted note record, as returned by the store boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    /// Client-generated idempotency key.
    pub local_id: String,
    pub title: String,
    /// Serialized document body. Opaque to the store.
    pub content: String,
    pub cover_image: CoverImage,
    pub created_at: DateTime<Utc>,
    /// Bumped on every write. Informational only.
    pub updated_at: DateTime<Utc>,
    /// Highest edit sequence accepted for this note.
    pub edit_seq: u64,
}

/// Create candidate for `NoteService::create`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteDraft {
    pub local_id: Option<String>,
    pub title: Option<String>,
    pub content: String,
    pub cover_image: CoverImage,
}

impl NoteDraft {
    /// Builds the candidate the dashboard sends for "new note".
    pub fn untitled(local_id: impl Into<String>) -> Self {
        Self {
            local_id: Some(local_id.into()),
            title: Some(DEFAULT_TITLE.to_string()),
            content: EMPTY_NOTE_CONTENT.to_string(),
            cover_image: CoverImage::none(),
        }
    }

    /// Checks the schema requirements of a create candidate.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.title.is_none() {
            return Err(NoteValidationError::MissingTitle);
        }
        if let Some(local_id) = self.local_id.as_deref() {
            validate_local_id(local_id)?;
        }
        Ok(())
    }
}

/// Full replacement of a note's mutable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub cover_image: CoverImage,
    /// Monotonic stamp from the editing client. `None` means last write wins.
    #[serde(default)]
    pub edit_seq: Option<u64>,
}

impl NotePatch {
    /// Captures the current mutable fields of `note` as a patch.
    pub fn from_note(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            cover_image: note.cover_image.clone(),
            edit_seq: None,
        }
    }
}

/// Schema violations detected before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteValidationError {
    #[error("note title is required")]
    MissingTitle,
    #[error("local id cannot be blank")]
    EmptyLocalId,
    #[error("local id exceeds {max} characters")]
    LocalIdTooLong { max: usize },
}

fn validate_local_id(local_id: &str) -> Result<(), NoteValidationError> {
    if local_id.trim().is_empty() {
        return Err(NoteValidationError::EmptyLocalId);
    }
    if local_id.chars().count() > LOCAL_ID_MAX_CHARS {
        return Err(NoteValidationError::LocalIdTooLong {
            max: LOCAL_ID_MAX_CHARS,
        });
    }
    Ok(())
}
