//! Favourites and shopping cart entries
//!
//! Both are `(user, recipe)` join rows with identical behavior, so they share
//! one repository parameterised by `BookmarkKind`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which list a bookmark belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookmarkKind {
    Favourite,
    ShoppingCart,
}

impl BookmarkKind {
    /// Backing table
    pub fn table(self) -> &'static str {
        match self {
            BookmarkKind::Favourite => "favourites",
            BookmarkKind::ShoppingCart => "shopping_carts",
        }
    }

    /// Field name used in validation errors
    pub fn field(self) -> &'static str {
        match self {
            BookmarkKind::Favourite => "favorite",
            BookmarkKind::ShoppingCart => "shopping_cart",
        }
    }
}

impl fmt::Display for BookmarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookmarkKind::Favourite => write!(f, "favourites"),
            BookmarkKind::ShoppingCart => write!(f, "shopping cart"),
        }
    }
}

/// A favourite or shopping cart row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub user_id: i64,
    pub recipe_id: i64,
    pub date_added: DateTime<Utc>,
}
