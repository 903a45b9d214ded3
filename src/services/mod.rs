//! Services layer - Business logic
//!
//! Services own the rules of the domain: they look up what a validator needs,
//! run it, and coordinate repositories and media storage. Each service has its
//! own error enum that the API layer maps to HTTP responses.

pub mod admin;
pub mod bookmark;
pub mod follow;
pub mod ingredient;
pub mod media;
pub mod password;
pub mod recipe;
pub mod tag;
pub mod user;

pub use admin::{AdminService, AdminServiceError};
pub use bookmark::{BookmarkService, BookmarkServiceError};
pub use follow::{FollowService, FollowServiceError};
pub use ingredient::{IngredientService, IngredientServiceError};
pub use media::{MediaError, MediaStorage};
pub use password::{hash_password, verify_password};
pub use recipe::{render_shopping_list, RecipeService, RecipeServiceError};
pub use tag::{TagService, TagServiceError};
pub use user::{LoginInput, UserService, UserServiceError};
