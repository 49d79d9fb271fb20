//! Persistence seam used by the editor session.

use crate::model::note::{Note, NoteId, NotePatch};
use crate::repo::note_repo::NoteRepository;
use crate::service::note_service::{NoteService, NoteServiceError};
use thiserror::Error;

/// Failure of a persistence call seen from the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    /// The store could not be reached or failed internally. Worth retrying.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The store refused the write (unknown note, stale edit, invalid data).
    #[error("save rejected: {0}")]
    Rejected(String),
}

/// Loads and saves notes on behalf of an editor session.
pub trait NoteGateway {
    fn fetch(&mut self, id: NoteId) -> Result<Option<Note>, SaveError>;
    /// Sends the full mutable field set of note `id`.
    fn save(&mut self, id: NoteId, patch: &NotePatch) -> Result<Note, SaveError>;
}

impl<G: NoteGateway + ?Sized> NoteGateway for &mut G {
    fn fetch(&mut self, id: NoteId) -> Result<Option<Note>, SaveError> {
        (**self).fetch(id)
    }

    fn save(&mut self, id: NoteId, patch: &NotePatch) -> Result<Note, SaveError> {
        (**self).save(id, patch)
    }
}

/// In-process gateway backed by a `NoteService`.
pub struct StoreGateway<R: NoteRepository> {
    service: NoteService<R>,
}

impl<R: NoteRepository> StoreGateway<R> {
    pub fn new(service: NoteService<R>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &NoteService<R> {
        &self.service
    }
}

impl<R: NoteRepository> NoteGateway for StoreGateway<R> {
    fn fetch(&mut self, id: NoteId) -> Result<Option<Note>, SaveError> {
        self.service.get(id).map_err(SaveError::from)
    }

    fn save(&mut self, id: NoteId, patch: &NotePatch) -> Result<Note, SaveError> {
        self.service.update(id, patch).map_err(SaveError::from)
    }
}

impl From<NoteServiceError> for SaveError {
    fn from(value: NoteServiceError) -> Self {
        match value {
            NoteServiceError::Repo(err) => Self::Transport(err.to_string()),
            other => Self::Rejected(other.to_string()),
        }
    }
}
