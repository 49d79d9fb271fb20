//! Core domain logic for Bromine notes.
//! This crate owns the note store, the document model with embedded note
//! links, and the editor session that ties them together.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;

pub use config::{BromineConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{
    default_log_level, init_from_config, init_logging, init_stderr_logging, logging_status,
    LogSink, LoggingError,
};
pub use model::commands::SlashCommand;
pub use model::cover::{CoverImage, CoverKind, CoverPalette};
pub use model::document::{Block, CommandEffect, Document, DocumentError, Inline, Mark};
pub use model::note::{Note, NoteDraft, NoteId, NotePatch, NoteValidationError};
pub use model::note_link::{NavigationRequest, NoteLink, ViewMode};
pub use repo::note_repo::{NoteRepository, RepoError, RepoResult, SqliteNoteRepository};
pub use service::note_service::{NoteCard, NoteService, NoteServiceError};
pub use session::{
    EditorSession, NoteGateway, OpenNote, SaveError, SaveOutcome, SessionError, StoreGateway,
};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
