//! Cover image tokens and the cover palette.
//!
//! The store treats a cover as an opaque string. Only rendering consumers
//! call [`CoverImage::kind`] or [`CoverImage::css_background`].
//!
//! Grammar: empty (no cover) | `#RRGGBB` | CSS gradient | absolute image URL.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Fill used by cards whose note has no cover.
pub const PLACEHOLDER_BACKGROUND: &str =
    "repeating-linear-gradient(45deg, #f7f7f5, #f7f7f5 10px, #f0f0f0 10px, #f0f0f0 20px)";

/// Opaque cover token stored on notes and copied into link snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverImage(String);

/// Rendering classification of a cover token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverKind {
    None,
    Color,
    Gradient,
    Image,
    /// Anything else; rendered as a raw CSS background value.
    Unknown,
}

impl CoverImage {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The "no cover" token.
    pub fn none() -> Self {
        Self(String::new())
    }

    pub fn is_none(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn kind(&self) -> CoverKind {
        let value = self.0.trim();
        if value.is_empty() {
            CoverKind::None
        } else if is_hex_color(value) {
            CoverKind::Color
        } else if value.contains("gradient(") {
            CoverKind::Gradient
        } else if value.starts_with("https://") || value.starts_with("http://") {
            CoverKind::Image
        } else {
            CoverKind::Unknown
        }
    }

    /// CSS declaration that paints this cover.
    pub fn css_background(&self) -> String {
        match self.kind() {
            CoverKind::None => format!("background: {PLACEHOLDER_BACKGROUND}"),
            CoverKind::Image => format!(
                "background-image: url({}); background-size: cover",
                self.0.trim()
            ),
            CoverKind::Color | CoverKind::Gradient | CoverKind::Unknown => {
                format!("background: {}", self.0.trim())
            }
        }
    }
}

impl Display for CoverImage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CoverImage {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CoverImage {
    fn from(value: String) -> Self {
        Self(value)
    }
}

fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Immutable list of covers offered by the cover picker.
///
/// Built once from configuration and shared by clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverPalette(Arc<[CoverImage]>);

impl CoverPalette {
    pub fn new(entries: Vec<CoverImage>) -> Self {
        Self(entries.into())
    }

    pub fn entries(&self) -> &[CoverImage] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, cover: &CoverImage) -> bool {
        self.0.iter().any(|entry| entry == cover)
    }

    /// Cover applied by "Add cover" before the user picks one.
    pub fn first(&self) -> Option<&CoverImage> {
        self.0.first()
    }
}

impl Default for CoverPalette {
    fn default() -> Self {
        Self::new(default_palette_entries())
    }
}

/// Built-in palette: solid colors, gradients, then photo covers.
pub fn default_palette_entries() -> Vec<CoverImage> {
    DEFAULT_COLORS
        .iter()
        .chain(DEFAULT_GRADIENTS)
        .map(|value| CoverImage::new(*value))
        .chain(
            DEFAULT_PHOTOS
                .iter()
                .map(|photo| CoverImage::new(format!("{UNSPLASH_BASE}{photo}{UNSPLASH_PARAMS}"))),
        )
        .collect()
}

const DEFAULT_COLORS: &[&str] = &[
    "#E5E5E5", "#FFD700", "#FF6B6B", "#4ECDC4", "#1A535C", "#F7FFF7", "#FFE66D", "#292F36",
    "#5F0F40", "#9A031E", "#FB8B24", "#3D348B", "#7678ED", "#F18701",
];

const DEFAULT_GRADIENTS: &[&str] = &[
    "linear-gradient(90deg, #ff9a9e 0%, #fecfef 99%, #fecfef 100%)",
    "linear-gradient(120deg, #a1c4fd 0%, #c2e9fb 100%)",
    "linear-gradient(120deg, #84fab0 0%, #8fd3f4 100%)",
    "linear-gradient(120deg, #fccb90 0%, #d57eeb 100%)",
    "linear-gradient(120deg, #e0c3fc 0%, #8ec5fc 100%)",
    "linear-gradient(120deg, #f093fb 0%, #f5576c 100%)",
    "linear-gradient(to right, #43e97b 0%, #38f9d7 100%)",
    "linear-gradient(to top, #30cfd0 0%, #330867 100%)",
    "linear-gradient(to top, #5ee7df 0%, #b490ca 100%)",
    "linear-gradient(to right, #b8cbb8 0%, #b8cbb8 0%, #b465da 0%, #cf6cc9 33%, #ee609c 66%, #ee609c 100%)",
    "linear-gradient(to right, #6a11cb 0%, #2575fc 100%)",
    "linear-gradient(to top, #c471f5 0%, #fa71cd 100%)",
    "linear-gradient(to right, #f83600 0%, #f9d423 100%)",
    "linear-gradient(to top, #0ba360 0%, #3cba92 100%)",
];

const UNSPLASH_BASE: &str = "https://images.unsplash.com/";
const UNSPLASH_PARAMS: &str = "?auto=format&fit=crop&w=1200&q=80";

const DEFAULT_PHOTOS: &[&str] = &[
    "photo-1506744038136-46273834b3fb",
    "photo-1470071459604-3b5ec3a7fe05",
    "photo-1441974231531-c6227db76b6e",
    "photo-1472214103451-9374bd1c798e",
    "photo-1465146344425-f00d5f5c8f07",
    "photo-1501785888041-af3ef285b470",
    "photo-1507525428034-b723cf961d3e",
    "photo-1451187580459-43490279c0fa",
    "photo-1534796636912-3b95b3ab5986",
    "photo-1462331940025-496dfbfc7564",
    "photo-1481026469463-66327c86e544",
    "photo-1550684848-fac1c5b4e853",
    "photo-1541701494587-cb58502866ab",
    "photo-1558591710-4b4a1ae0f04d",
    "photo-1508615039623-a25605d2b022",
    "photo-1534237710431-e2fc698436d0",
    "photo-1497215728101-856f4ea42174",
    "photo-1494438639946-1ebd1d20bf85",
    "photo-1519710164239-da123dc03ef4",
];
