//! Editor session state machine.
//!
//! # Invariants
//! - At most one note is open.
//! - Every successful local mutation bumps `edit_seq` and sends the full
//!   reconstructed note (title + cover + serialized body).
//! - A failed save leaves the local state and `dirty` flag in place; the
//!   next mutation or `retry_save` sends everything again.

use crate::model::commands::SlashCommand;
use crate::model::cover::CoverImage;
use crate::model::document::{CommandEffect, Document, DocumentError};
use crate::model::note::{Note, NoteId, NotePatch};
use crate::model::note_link::{NavigationRequest, NoteLink, ViewMode};
use crate::session::gateway::{NoteGateway, SaveError};
use log::{info, warn};
use thiserror::Error;

/// Result of the save triggered by a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The edit is applied locally but not persisted.
    Failed(SaveError),
    /// Nothing changed, so nothing was sent.
    Skipped,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no note is open")]
    NoOpenNote,
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("a note cannot link to itself")]
    SelfLink,
    #[error("note not found: {}", .0.map_or_else(|| "<missing id>".to_string(), |id| id.to_string()))]
    DanglingLink(Option<NoteId>),
    #[error("failed to load linked note: {0}")]
    Load(SaveError),
}

/// In-memory state of the open note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenNote {
    /// Last record received from the store.
    note: Note,
    title: String,
    cover: CoverImage,
    document: Document,
    edit_seq: u64,
    dirty: bool,
    /// Set once the body is edited; until then `note.content` is sent as is.
    body_dirty: bool,
}

impl OpenNote {
    fn from_note(note: Note) -> Self {
        Self {
            title: note.title.clone(),
            cover: note.cover_image.clone(),
            document: Document::parse_html(&note.content),
            edit_seq: note.edit_seq,
            dirty: false,
            body_dirty: false,
            note,
        }
    }

    pub fn id(&self) -> NoteId {
        self.note.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn cover(&self) -> &CoverImage {
        &self.cover
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn edit_seq(&self) -> u64 {
        self.edit_seq
    }

    /// `true` while local edits are not confirmed by the store.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Full note as it would be saved now.
    pub fn to_note(&self) -> Note {
        Note {
            title: self.title.clone(),
            content: self.content(),
            cover_image: self.cover.clone(),
            edit_seq: self.edit_seq,
            ..self.note.clone()
        }
    }

    fn content(&self) -> String {
        if self.body_dirty {
            self.document.to_html()
        } else {
            self.note.content.clone()
        }
    }

    fn patch(&self) -> NotePatch {
        NotePatch {
            title: self.title.clone(),
            content: self.content(),
            cover_image: self.cover.clone(),
            edit_seq: Some(self.edit_seq),
        }
    }
}

/// Single-document editing surface over a persistence gateway.
pub struct EditorSession<G: NoteGateway> {
    gateway: G,
    open: Option<OpenNote>,
}

impl<G: NoteGateway> EditorSession<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            open: None,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    pub fn current(&self) -> Option<&OpenNote> {
        self.open.as_ref()
    }

    /// Reconstructed full note, or `None` when nothing is open.
    pub fn snapshot(&self) -> Option<Note> {
        self.open.as_ref().map(OpenNote::to_note)
    }

    /// Opens `note`, discarding all state of the previously open note.
    ///
    /// Unsaved edits of the previous note get one last save attempt; the
    /// previous state is handed back so a failed attempt loses nothing.
    pub fn open(&mut self, note: Note) -> Option<OpenNote> {
        if self.open.as_ref().is_some_and(OpenNote::is_dirty) {
            let failure = match self.send() {
                Ok(SaveOutcome::Failed(err)) => Some(err.to_string()),
                Ok(SaveOutcome::Saved | SaveOutcome::Skipped) => None,
                Err(err) => Some(err.to_string()),
            };
            if let Some(error) = failure {
                warn!(
                    "event=session_switch module=session status=error next_note_id={} error={}",
                    note.id, error
                );
            }
        }
        info!("event=session_open module=session status=ok note_id={}", note.id);
        self.open.replace(OpenNote::from_note(note))
    }

    pub fn close(&mut self) -> Option<OpenNote> {
        self.open.take()
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<SaveOutcome, SessionError> {
        self.open_mut()?.title = title.into();
        self.commit_edit()
    }

    pub fn set_cover(&mut self, cover: CoverImage) -> Result<SaveOutcome, SessionError> {
        self.open_mut()?.cover = cover;
        self.commit_edit()
    }

    pub fn remove_cover(&mut self) -> Result<SaveOutcome, SessionError> {
        self.set_cover(CoverImage::none())
    }

    /// Applies an arbitrary body edit. A failing edit saves nothing.
    pub fn edit_document<T>(
        &mut self,
        edit: impl FnOnce(&mut Document) -> Result<T, DocumentError>,
    ) -> Result<(T, SaveOutcome), SessionError> {
        let open = self.open_mut()?;
        let value = edit(&mut open.document)?;
        open.body_dirty = true;
        let outcome = self.commit_edit()?;
        Ok((value, outcome))
    }

    /// Inserts a Link Node to `target` before block `at`.
    ///
    /// Returns the ordinal of the new link.
    pub fn insert_link(
        &mut self,
        at: usize,
        target: &Note,
    ) -> Result<(usize, SaveOutcome), SessionError> {
        let link = self.link_to(target)?;
        self.edit_document(|document| document.insert_note_link(at, link))
    }

    /// Completes the "link to note" slash command typed in block `at`.
    pub fn run_link_command(
        &mut self,
        at: usize,
        target: &Note,
    ) -> Result<(usize, SaveOutcome), SessionError> {
        let link = self.link_to(target)?;
        self.edit_document(|document| document.replace_trigger_with_link(at, link))
    }

    /// Runs a slash command on block `at`.
    ///
    /// `LinkToNote` only reports that a target must be picked; the host
    /// follows up with `run_link_command`.
    pub fn apply_command(
        &mut self,
        at: usize,
        command: SlashCommand,
    ) -> Result<(CommandEffect, SaveOutcome), SessionError> {
        if command == SlashCommand::LinkToNote {
            let len = self.open_ref()?.document.len();
            if at > len {
                return Err(DocumentError::PositionOutOfRange { at, len }.into());
            }
            return Ok((CommandEffect::PickNote { at }, SaveOutcome::Skipped));
        }
        self.edit_document(|document| document.apply_block_command(at, command))
    }

    /// Flips the view mode of link `ordinal` in the open note.
    pub fn toggle_link_view(
        &mut self,
        ordinal: usize,
    ) -> Result<(ViewMode, SaveOutcome), SessionError> {
        self.edit_document(|document| document.toggle_link_view(ordinal))
    }

    /// Navigation signal for the body of link `ordinal`. Does not resolve it.
    pub fn activate_link(&self, ordinal: usize) -> Result<NavigationRequest, SessionError> {
        Ok(self.open_ref()?.document.activate_link(ordinal)?)
    }

    /// Resolves link `ordinal` and opens its target.
    ///
    /// A dangling link reports `DanglingLink` and keeps the current note open.
    pub fn follow_link(&mut self, ordinal: usize) -> Result<NoteId, SessionError> {
        let request = self.activate_link(ordinal)?;
        let target_id = request
            .target_id
            .ok_or(SessionError::DanglingLink(None))?;
        let target = self
            .gateway
            .fetch(target_id)
            .map_err(SessionError::Load)?
            .ok_or_else(|| {
                warn!(
                    "event=session_follow_link module=session status=error note_id={target_id} error_code=dangling_link"
                );
                SessionError::DanglingLink(Some(target_id))
            })?;
        self.open(target);
        Ok(target_id)
    }

    /// Notes offered by the link picker: all but the open note.
    pub fn link_candidates<'a>(&self, notes: &'a [Note]) -> Vec<&'a Note> {
        let current = self.open.as_ref().map(OpenNote::id);
        notes
            .iter()
            .filter(|note| Some(note.id) != current)
            .collect()
    }

    /// Re-sends the full note when the last save failed.
    pub fn retry_save(&mut self) -> Result<SaveOutcome, SessionError> {
        if !self.open_ref()?.dirty {
            return Ok(SaveOutcome::Skipped);
        }
        self.send()
    }

    fn link_to(&self, target: &Note) -> Result<NoteLink, SessionError> {
        if self.open_ref()?.id() == target.id {
            return Err(SessionError::SelfLink);
        }
        Ok(NoteLink::snapshot_of(target))
    }

    fn commit_edit(&mut self) -> Result<SaveOutcome, SessionError> {
        let open = self.open_mut()?;
        open.edit_seq += 1;
        open.dirty = true;
        self.send()
    }

    fn send(&mut self) -> Result<SaveOutcome, SessionError> {
        let open = self.open.as_mut().ok_or(SessionError::NoOpenNote)?;
        let patch = open.patch();
        match self.gateway.save(open.note.id, &patch) {
            Ok(saved) => {
                open.edit_seq = open.edit_seq.max(saved.edit_seq);
                open.note = saved;
                open.dirty = false;
                open.body_dirty = false;
                Ok(SaveOutcome::Saved)
            }
            Err(err) => {
                warn!(
                    "event=session_save module=session status=error note_id={} edit_seq={} error={}",
                    open.note.id,
                    patch.edit_seq.unwrap_or_default(),
                    err
                );
                Ok(SaveOutcome::Failed(err))
            }
        }
    }

    fn open_ref(&self) -> Result<&OpenNote, SessionError> {
        self.open.as_ref().ok_or(SessionError::NoOpenNote)
    }

    fn open_mut(&mut self) -> Result<&mut OpenNote, SessionError> {
        self.open.as_mut().ok_or(SessionError::NoOpenNote)
    }
}
