//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the operations for a specific entity.

pub mod admin;
pub mod bookmark;
pub mod follow;
pub mod ingredient;
pub mod recipe;
pub mod session;
pub mod tag;
pub mod user;

pub use admin::{AdminRepository, Condition, ListingQuery, ListingRows, SqlxAdminRepository};
pub use bookmark::{BookmarkRepository, SqlxBookmarkRepository};
pub use follow::{FollowRepository, SqlxFollowRepository};
pub use ingredient::{IngredientRepository, SqlxIngredientRepository};
pub use recipe::{RecipeRepository, SqlxRecipeRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};
