//! Resource request model.
//!
//! Every fetch the engine performs is described by a [`ResourceRequest`]:
//! the kind of resource being fetched and its URL. Requests are immutable
//! once issued; a transform produces a new URL rather than mutating the
//! request.

use serde::{Deserialize, Serialize};

/// Category of a resource requested by the fetch engine.
///
/// The integer code is part of the host contract: a host transform receives
/// the kind as a plain integer. Codes are stable and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Anything that does not fit a more specific category.
    Other,
    /// A style document.
    Style,
    /// A source description (e.g. TileJSON).
    Source,
    /// A map tile.
    Tile,
    /// A glyph range.
    Glyph,
    /// A sprite sheet.
    Sprite,
    /// A standalone image.
    Image,
}

impl ResourceKind {
    /// Get the stable integer code for this kind.
    pub const fn code(self) -> i32 {
        match self {
            ResourceKind::Other => 0,
            ResourceKind::Style => 1,
            ResourceKind::Source => 2,
            ResourceKind::Tile => 3,
            ResourceKind::Glyph => 4,
            ResourceKind::Sprite => 5,
            ResourceKind::Image => 6,
        }
    }

    /// Map an integer code back to a kind.
    ///
    /// Unknown codes map to [`ResourceKind::Other`] so that a host built
    /// against a newer kind table degrades instead of failing.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => ResourceKind::Style,
            2 => ResourceKind::Source,
            3 => ResourceKind::Tile,
            4 => ResourceKind::Glyph,
            5 => ResourceKind::Sprite,
            6 => ResourceKind::Image,
            _ => ResourceKind::Other,
        }
    }

    /// Get the lowercase name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Other => "other",
            ResourceKind::Style => "style",
            ResourceKind::Source => "source",
            ResourceKind::Tile => "tile",
            ResourceKind::Glyph => "glyph",
            ResourceKind::Sprite => "sprite",
            ResourceKind::Image => "image",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single resource request issued by the fetch engine.
///
/// Immutable once constructed: transforms receive the kind and URL and
/// return a new URL; they never modify the request itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    kind: ResourceKind,
    url: String,
}

impl ResourceRequest {
    /// Create a new request.
    pub fn new(kind: ResourceKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
        }
    }

    /// The kind of resource requested.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The requested URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Display for ResourceRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.url)
    }
}
