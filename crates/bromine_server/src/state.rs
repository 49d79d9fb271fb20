//! Shared handler state.
//!
//! # Invariants
//! - The SQLite connection is only touched on the blocking pool, one
//!   request at a time.

use crate::error::ApiError;
use bromine_core::{CoverPalette, NoteService, NoteServiceError, SqliteNoteRepository};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
    palette: CoverPalette,
}

impl AppState {
    /// Wraps a migrated connection.
    pub fn new(conn: Connection, palette: CoverPalette) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            palette,
        }
    }

    pub fn palette(&self) -> &CoverPalette {
        &self.palette
    }

    /// Runs `op` against a note service on the blocking pool.
    pub async fn with_notes<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: for<'c> FnOnce(&NoteService<SqliteNoteRepository<'c>>) -> Result<T, NoteServiceError>
            + Send
            + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| ApiError::Internal("note store lock poisoned".to_string()))?;
            let repo = SqliteNoteRepository::try_new(&conn).map_err(NoteServiceError::from)?;
            op(&NoteService::new(repo)).map_err(ApiError::from)
        })
        .await
        .map_err(|err| ApiError::Internal(format!("note store task failed: {err}")))?
    }
}
