//! Data models
//!
//! This module contains the data structures used throughout the Foodgram service.
//! Models represent:
//! - Database entities (User, Session, Tag, Ingredient, Recipe, Follow, Bookmark)
//! - Validated unit-of-work inputs handed to repositories
//! - Pagination types

mod bookmark;
mod follow;
mod ingredient;
mod pagination;
mod recipe;
mod session;
mod tag;
mod user;

pub use bookmark::{Bookmark, BookmarkKind};
pub use follow::Follow;
pub use ingredient::{Ingredient, IngredientAmount, ShoppingListItem};
pub use pagination::{ListParams, PagedResult};
pub use recipe::{IngredientLine, NewRecipe, Recipe, RecipeChanges, RecipeFilter, MAX_AMOUNT};
pub use session::{Session, SESSION_TTL_DAYS};
pub use tag::Tag;
pub use user::{CreateUserInput, User, UserRole};
