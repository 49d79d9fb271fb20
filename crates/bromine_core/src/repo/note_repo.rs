//! Note repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist notes keyed by `id`, deduplicated by `local_id`.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Create is an upsert on `local_id`: `id` and `created_at` of an existing
//!   row are never rewritten.
//! - Update replaces `title`, `content` and `cover_image` as a whole.
//! - An update carrying an `edit_seq` lower than the stored one is rejected
//!   without writing.
//! - Delete is a hard delete and reports whether a row existed.

use crate::db::DbError;
use crate::model::cover::CoverImage;
use crate::model::note::{Note, NoteDraft, NoteId, NotePatch, NoteValidationError};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use uuid::Uuid;

const NOTE_COLUMNS: &str =
    "id, local_id, title, content, cover_image, created_at, updated_at, edit_seq";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note persistence and query operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] NoteValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("note not found: {0}")]
    NotFound(NoteId),
    #[error("stale write for note {id}: stored edit_seq {stored} is newer than {attempted}")]
    StaleWrite {
        id: NoteId,
        stored: u64,
        attempted: u64,
    },
    #[error("invalid persisted note data: {0}")]
    InvalidData(String),
    #[error("missing required table `{0}`")]
    MissingRequiredTable(&'static str),
    #[error("missing required column `{table}.{column}`")]
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for note persistence.
pub trait NoteRepository {
    /// Inserts a note, or overwrites the mutable fields of the note that
    /// already owns `draft.local_id`.
    fn upsert_by_local_id(&self, draft: &NoteDraft) -> RepoResult<Note>;
    /// Replaces the mutable fields of note `id`.
    fn update_note(&self, id: NoteId, patch: &NotePatch) -> RepoResult<Note>;
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    /// All notes in insertion order.
    fn list_notes(&self) -> RepoResult<Vec<Note>>;
    /// Returns `false` when no note had this id.
    fn delete_note(&self, id: NoteId) -> RepoResult<bool>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// Fails when the `notes` table or one of its columns is missing.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_note_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn upsert_by_local_id(&self, draft: &NoteDraft) -> RepoResult<Note> {
        draft.validate()?;

        let local_id = draft
            .local_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let title = draft.title.as_deref().unwrap_or_default();
        let now = Utc::now().timestamp_millis();

        let note = self.conn.query_row(
            &format!(
                "INSERT INTO notes (
                    id, local_id, title, content, cover_image, created_at, updated_at, edit_seq
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, 0)
                ON CONFLICT(local_id) DO UPDATE SET
                    title = excluded.title,
                    content = excluded.content,
                    cover_image = excluded.cover_image,
                    updated_at = excluded.updated_at
                RETURNING {NOTE_COLUMNS};"
            ),
            params![
                Uuid::new_v4().to_string(),
                local_id,
                title,
                draft.content.as_str(),
                draft.cover_image.as_str(),
                now,
            ],
            |row| Ok(parse_note_row(row)),
        )??;

        Ok(note)
    }

    fn update_note(&self, id: NoteId, patch: &NotePatch) -> RepoResult<Note> {
        let attempted = patch.edit_seq.map(seq_to_db).transpose()?;

        let updated = self
            .conn
            .query_row(
                &format!(
                    "UPDATE notes
                     SET
                        title = ?2,
                        content = ?3,
                        cover_image = ?4,
                        updated_at = ?5,
                        edit_seq = CASE WHEN ?6 IS NULL THEN edit_seq ELSE MAX(edit_seq, ?6) END
                     WHERE id = ?1
                       AND (?6 IS NULL OR edit_seq <= ?6)
                     RETURNING {NOTE_COLUMNS};"
                ),
                params![
                    id.to_string(),
                    patch.title.as_str(),
                    patch.content.as_str(),
                    patch.cover_image.as_str(),
                    Utc::now().timestamp_millis(),
                    attempted,
                ],
                |row| Ok(parse_note_row(row)),
            )
            .optional()?;

        if let Some(note) = updated {
            return note;
        }

        let stored: Option<i64> = self
            .conn
            .query_row(
                "SELECT edit_seq FROM notes WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match (stored, patch.edit_seq) {
            (Some(stored), Some(attempted)) => Err(RepoError::StaleWrite {
                id,
                stored: seq_from_db(stored)?,
                attempted,
            }),
            _ => Err(RepoError::NotFound(id)),
        }
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_note_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_notes(&self) -> RepoResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in notes.id"))
    })?;

    Ok(Note {
        id,
        local_id: row.get("local_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        cover_image: CoverImage::new(row.get::<_, String>("cover_image")?),
        created_at: parse_epoch_ms(row.get("created_at")?, "created_at")?,
        updated_at: parse_epoch_ms(row.get("updated_at")?, "updated_at")?,
        edit_seq: seq_from_db(row.get("edit_seq")?)?,
    })
}

fn parse_epoch_ms(value: i64, column: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid timestamp `{value}` in notes.{column}"))
    })
}

fn seq_to_db(value: u64) -> RepoResult<i64> {
    i64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("edit_seq `{value}` exceeds storage range")))
}

fn seq_from_db(value: i64) -> RepoResult<u64> {
    u64::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid edit_seq `{value}` in notes.edit_seq"))
    })
}

fn ensure_note_connection_ready(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, "notes")? {
        return Err(RepoError::MissingRequiredTable("notes"));
    }

    for column in [
        "id",
        "local_id",
        "title",
        "content",
        "cover_image",
        "created_at",
        "updated_at",
        "edit_seq",
    ] {
        if !table_has_column(conn, "notes", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "notes",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
