//! Editor session: the single-document editing surface.
//!
//! # Responsibility
//! - Own the one open note and its parsed document.
//! - Turn every local edit into a full-note save through a `NoteGateway`.
//!
//! # Invariants
//! - Opening a note replaces all in-memory state; nothing from the
//!   previous note is merged into the new one.
//! - A failed save never rolls back local edits.

pub mod editor;
pub mod gateway;

pub use editor::{EditorSession, OpenNote, SaveOutcome, SessionError};
pub use gateway::{NoteGateway, SaveError, StoreGateway};
