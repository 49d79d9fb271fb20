//! Link Node: an atomic embedded reference to another note.
//!
//! # Responsibility
//! - Carry a point-in-time snapshot (title, cover, preview, creation time)
//!   of the target note.
//! - Carry the per-embedding view mode (`card` or `link`).
//!
//! # Invariants
//! - Snapshots are never refreshed from the target after insertion.
//! - Toggling the view mode edits only the hosting document.
//! - `target_id` is not checked against the store; it may dangle.

use crate::model::cover::CoverImage;
use crate::model::document::Document;
use crate::model::note::{Note, NoteId};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// HTML element name of the Link Node.
pub const NOTE_LINK_TAG: &str = "note-link";
/// Title shown when a link was stored without one.
pub const DEFAULT_LINK_TITLE: &str = "Untitled Note";
/// Preview stored when the target had no text at insertion time.
pub const EMPTY_PREVIEW_FALLBACK: &str = "No preview";
/// Maximum preview length in characters.
pub const PREVIEW_MAX_CHARS: usize = 100;

/// Per-embedding display mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Expanded card with cover, title, date and preview.
    #[default]
    Card,
    /// Compact inline anchor with title only.
    Link,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Link => "link",
        }
    }

    /// Parses a stored attribute. Unknown values fall back to `Card`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "link" => Self::Link,
            _ => Self::Card,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Card => Self::Link,
            Self::Link => Self::Card,
        }
    }
}

/// Embedded reference to another note with a denormalized snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteLink {
    pub target_id: Option<NoteId>,
    pub title: String,
    pub cover: Option<CoverImage>,
    pub preview: String,
    pub view_mode: ViewMode,
    /// RFC 3339 creation time of the target, as captured.
    pub created_at: Option<String>,
}

impl NoteLink {
    /// Captures the snapshot of `target` used when inserting a link.
    ///
    /// The view mode starts as `Card`.
    pub fn snapshot_of(target: &Note) -> Self {
        Self {
            target_id: Some(target.id),
            title: target.title.clone(),
            cover: (!target.cover_image.is_none()).then(|| target.cover_image.clone()),
            preview: preview_snapshot(&target.content),
            view_mode: ViewMode::Card,
            created_at: Some(
                target
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        }
    }

    /// Builds a link from parsed element attributes (lowercase names).
    ///
    /// Missing attributes take their defaults; an unparseable `id` leaves
    /// the link without a target.
    pub fn from_attributes<'a>(attrs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut link = Self {
            target_id: None,
            title: DEFAULT_LINK_TITLE.to_string(),
            cover: None,
            preview: String::new(),
            view_mode: ViewMode::Card,
            created_at: None,
        };
        for (name, value) in attrs {
            match name {
                "id" => link.target_id = Uuid::parse_str(value.trim()).ok(),
                "title" => link.title = value.to_string(),
                "cover" => {
                    let cover = CoverImage::new(value);
                    link.cover = (!cover.is_none()).then_some(cover);
                }
                "preview" => link.preview = value.to_string(),
                "viewmode" => link.view_mode = ViewMode::parse(value),
                "createdat" => {
                    link.created_at = (!value.trim().is_empty()).then(|| value.to_string())
                }
                _ => {}
            }
        }
        link
    }

    /// Attribute list in serialization order.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        let mut attrs = Vec::with_capacity(6);
        if let Some(target_id) = self.target_id {
            attrs.push(("id", target_id.to_string()));
        }
        attrs.push(("title", self.title.clone()));
        if let Some(cover) = &self.cover {
            attrs.push(("cover", cover.as_str().to_string()));
        }
        attrs.push(("preview", self.preview.clone()));
        attrs.push(("viewmode", self.view_mode.as_str().to_string()));
        if let Some(created_at) = &self.created_at {
            attrs.push(("createdat", created_at.clone()));
        }
        attrs
    }

    /// Flips the view mode and returns the new one.
    pub fn toggle_view_mode(&mut self) -> ViewMode {
        self.view_mode = self.view_mode.toggled();
        self.view_mode
    }

    /// Signal for the host to open the referenced note.
    pub fn navigation_request(&self) -> NavigationRequest {
        NavigationRequest {
            target_id: self.target_id,
        }
    }
}

/// "Navigate to note" signal emitted when a link body is activated.
///
/// The document model does not resolve it; the host does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationRequest {
    pub target_id: Option<NoteId>,
}

/// Plain-text preview of a serialized note body.
pub fn preview_snapshot(content: &str) -> String {
    let text = Document::parse_html(content).plain_text();
    if text.is_empty() {
        EMPTY_PREVIEW_FALLBACK.to_string()
    } else {
        text.chars().take(PREVIEW_MAX_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{preview_snapshot, NoteLink, ViewMode, DEFAULT_LINK_TITLE};

    #[test]
    fn preview_strips_markup_and_caps_length() {
        assert_eq!(preview_snapshot("<p>Flour, eggs</p>"), "Flour, eggs");
        assert_eq!(preview_snapshot("<p></p>"), "No preview");
        assert_eq!(preview_snapshot(""), "No preview");

        let long = format!("<p>{}</p>", "a".repeat(250));
        assert_eq!(preview_snapshot(&long).chars().count(), 100);
    }

    #[test]
    fn preview_decodes_entities() {
        assert_eq!(preview_snapshot("<p>salt &amp; pepper</p>"), "salt & pepper");
    }

    #[test]
    fn view_mode_parse_defaults_to_card() {
        assert_eq!(ViewMode::parse("LINK"), ViewMode::Link);
        assert_eq!(ViewMode::parse("card"), ViewMode::Card);
        assert_eq!(ViewMode::parse("grid"), ViewMode::Card);
        assert_eq!(ViewMode::Card.toggled(), ViewMode::Link);
    }

    #[test]
    fn attributes_fall_back_to_defaults() {
        let link = NoteLink::from_attributes([("id", "not-a-uuid"), ("viewmode", "link")]);
        assert_eq!(link.target_id, None);
        assert_eq!(link.title, DEFAULT_LINK_TITLE);
        assert_eq!(link.view_mode, ViewMode::Link);
        assert_eq!(link.navigation_request().target_id, None);
    }
}
