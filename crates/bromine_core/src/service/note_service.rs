//! Note Store use-case service.
//!
//! # Responsibility
//! - Provide list/create/update/delete with the store boundary's error
//!   semantics.
//! - Resolve Link Node targets and build the dashboard projection.
//!
//! # Invariants
//! - `create` is idempotent per `local_id` (upsert).
//! - `update` uses full replacement semantics and fails loud on unknown ids.
//! - `delete` succeeds whether or not the note existed.

use crate::model::document::Document;
use crate::model::note::{Note, NoteDraft, NoteId, NotePatch, NoteValidationError, DEFAULT_TITLE};
use crate::repo::note_repo::{NoteRepository, RepoError};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

const CARD_PREVIEW_MAX_CHARS: usize = 100;
const CARD_EMPTY_PREVIEW: &str = "No content";

/// Service error for note use-cases.
#[derive(Debug, Error)]
pub enum NoteServiceError {
    #[error(transparent)]
    Validation(NoteValidationError),
    #[error("note not found: {0}")]
    NoteNotFound(NoteId),
    #[error("stale write for note {id}: stored edit_seq {stored} is newer than {attempted}")]
    StaleWrite {
        id: NoteId,
        stored: u64,
        attempted: u64,
    },
    #[error(transparent)]
    Repo(RepoError),
}

impl NoteServiceError {
    /// Short stable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NoteNotFound(_) => "not_found",
            Self::StaleWrite { .. } => "stale_write",
            Self::Repo(_) => "storage",
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NoteNotFound(id),
            RepoError::StaleWrite {
                id,
                stored,
                attempted,
            } => Self::StaleWrite {
                id,
                stored,
                attempted,
            },
            other => Self::Repo(other),
        }
    }
}

/// Dashboard card for one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteCard {
    pub id: NoteId,
    pub title: String,
    pub preview: String,
    /// CSS declaration painting the card cover.
    pub cover_style: String,
    pub created_at: DateTime<Utc>,
}

impl NoteCard {
    pub fn from_note(note: &Note) -> Self {
        let title = if note.title.trim().is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            note.title.clone()
        };
        let text = Document::parse_html(&note.content).plain_text();
        let preview = if text.is_empty() {
            CARD_EMPTY_PREVIEW.to_string()
        } else {
            text.chars().take(CARD_PREVIEW_MAX_CHARS).collect()
        };
        Self {
            id: note.id,
            title,
            preview,
            cover_style: note.cover_image.css_background(),
            created_at: note.created_at,
        }
    }
}

/// Note service facade over repository implementations.
pub struct NoteService<R: NoteRepository> {
    repo: R,
}

impl<R: NoteRepository> NoteService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// All notes. Ordering is not part of the contract; consumers sort.
    pub fn list(&self) -> Result<Vec<Note>, NoteServiceError> {
        Ok(self.repo.list_notes()?)
    }

    /// Creates a note, or updates the note already owning `draft.local_id`.
    pub fn create(&self, draft: &NoteDraft) -> Result<Note, NoteServiceError> {
        match self.repo.upsert_by_local_id(draft) {
            Ok(note) => {
                info!(
                    "event=note_create module=service status=ok note_id={} created_now={}",
                    note.id,
                    note.created_at == note.updated_at
                );
                Ok(note)
            }
            Err(err) => Err(log_failure("note_create", err.into())),
        }
    }

    /// Replaces the mutable fields of note `id`.
    pub fn update(&self, id: NoteId, patch: &NotePatch) -> Result<Note, NoteServiceError> {
        match self.repo.update_note(id, patch) {
            Ok(note) => {
                info!(
                    "event=note_update module=service status=ok note_id={} edit_seq={}",
                    note.id, note.edit_seq
                );
                Ok(note)
            }
            Err(err) => Err(log_failure("note_update", err.into())),
        }
    }

    /// Removes note `id`. Unknown ids are not an error.
    pub fn delete(&self, id: NoteId) -> Result<(), NoteServiceError> {
        let existed = self
            .repo
            .delete_note(id)
            .map_err(|err| log_failure("note_delete", err.into()))?;
        info!("event=note_delete module=service status=ok note_id={id} existed={existed}");
        Ok(())
    }

    pub fn get(&self, id: NoteId) -> Result<Option<Note>, NoteServiceError> {
        Ok(self.repo.get_note(id)?)
    }

    /// Loads the target of a Link Node; a deleted target is `NoteNotFound`.
    pub fn resolve_link_target(&self, id: NoteId) -> Result<Note, NoteServiceError> {
        self.repo.get_note(id)?.ok_or_else(|| {
            warn!(
                "event=link_resolve module=service status=error note_id={id} error_code=not_found"
            );
            NoteServiceError::NoteNotFound(id)
        })
    }

    /// Notes that may be linked from `current`: everything except itself.
    pub fn link_candidates(&self, current: NoteId) -> Result<Vec<Note>, NoteServiceError> {
        let mut notes = self.repo.list_notes()?;
        notes.retain(|note| note.id != current);
        Ok(notes)
    }

    /// Dashboard cards, newest first.
    pub fn dashboard(&self) -> Result<Vec<NoteCard>, NoteServiceError> {
        let notes = self.repo.list_notes()?;
        Ok(notes.iter().rev().map(NoteCard::from_note).collect())
    }
}

fn log_failure(event: &str, err: NoteServiceError) -> NoteServiceError {
    warn!(
        "event={} module=service status=error error_code={}",
        event,
        err.code()
    );
    err
}

#[cfg(test)]
mod tests {
    use super::NoteCard;
    use crate::model::cover::CoverImage;
    use crate::model::note::Note;
    use chrono::Utc;
    use uuid::Uuid;

    fn note(title: &str, content: &str) -> Note {
        let now = Utc::now();
        Note {
            id: Uuid::new_v4(),
            local_id: "l".to_string(),
            title: title.to_string(),
            content: content.to_string(),
            cover_image: CoverImage::none(),
            created_at: now,
            updated_at: now,
            edit_seq: 0,
        }
    }

    #[test]
    fn card_falls_back_for_blank_title_and_empty_body() {
        let card = NoteCard::from_note(&note("  ", "<p></p>"));
        assert_eq!(card.title, "Untitled");
        assert_eq!(card.preview, "No content");
        assert!(card.cover_style.contains("repeating-linear-gradient"));
    }

    #[test]
    fn card_preview_is_plain_text() {
        let card = NoteCard::from_note(&note(
            "Recipes",
            "<h1>Cake</h1><p>Flour, <em>eggs</em></p>",
        ));
        assert_eq!(card.preview, "Cake Flour, eggs");
    }
}
