//! Tag model
//!
//! Tags label recipes ("breakfast", "dinner") and drive the tag filter of
//! the recipe list. Each tag carries a display color.

use serde::{Deserialize, Serialize};

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Display name (unique)
    pub name: String,
    /// Hex color, `#RRGGBB`
    pub color: String,
    /// URL-friendly slug (unique)
    pub slug: String,
}

impl Tag {
    /// Create a new Tag with the given parameters.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(name: String, color: String, slug: String) -> Self {
        Self {
            id: 0, // Will be set by the database
            name,
            color,
            slug,
        }
    }
}
