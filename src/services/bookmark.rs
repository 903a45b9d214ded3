//! Favourites and shopping cart
//!
//! Both are per-user recipe lists with the same rules: a recipe appears at
//! most once, and removing a recipe that isn't there is an error.

use crate::db::is_unique_violation;
use crate::db::repositories::{BookmarkRepository, RecipeRepository};
use crate::models::{BookmarkKind, Recipe, User};
use crate::serializers::FieldErrors;
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum BookmarkServiceError {
    #[error("Recipe not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

fn already_added(kind: BookmarkKind) -> BookmarkServiceError {
    let message = match kind {
        BookmarkKind::Favourite => "The recipe is already in favourites.",
        BookmarkKind::ShoppingCart => "The recipe is already in the shopping cart.",
    };
    BookmarkServiceError::Validation(FieldErrors::single("errors", message))
}

fn not_present(kind: BookmarkKind) -> BookmarkServiceError {
    let message = match kind {
        BookmarkKind::Favourite => "The recipe is not in favourites.",
        BookmarkKind::ShoppingCart => "The recipe is not in the shopping cart.",
    };
    BookmarkServiceError::Validation(FieldErrors::single("errors", message))
}

pub struct BookmarkService {
    bookmarks: Arc<dyn BookmarkRepository>,
    recipes: Arc<dyn RecipeRepository>,
}

impl BookmarkService {
    pub fn new(bookmarks: Arc<dyn BookmarkRepository>, recipes: Arc<dyn RecipeRepository>) -> Self {
        Self { bookmarks, recipes }
    }

    async fn recipe(&self, recipe_id: i64) -> Result<Recipe, BookmarkServiceError> {
        self.recipes
            .get_by_id(recipe_id)
            .await
            .context("Failed to get recipe")?
            .ok_or_else(|| BookmarkServiceError::NotFound(recipe_id.to_string()))
    }

    /// Put a recipe on one of the user's lists, returning the recipe
    pub async fn add(&self, kind: BookmarkKind, user: &User, recipe_id: i64) -> Result<Recipe, BookmarkServiceError> {
        let recipe = self.recipe(recipe_id).await?;
        if self
            .bookmarks
            .exists(kind, user.id, recipe.id)
            .await
            .context("Failed to check bookmark")?
        {
            return Err(already_added(kind));
        }

        match self.bookmarks.add(kind, user.id, recipe.id).await {
            Ok(_) => {
                tracing::debug!(%kind, user_id = user.id, recipe_id = recipe.id, "Recipe bookmarked");
                Ok(recipe)
            }
            Err(e) if is_unique_violation(&e) => Err(already_added(kind)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn remove(&self, kind: BookmarkKind, user: &User, recipe_id: i64) -> Result<(), BookmarkServiceError> {
        let recipe = self.recipe(recipe_id).await?;
        let removed = self
            .bookmarks
            .remove(kind, user.id, recipe.id)
            .await
            .context("Failed to remove bookmark")?;
        if !removed {
            return Err(not_present(kind));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxBookmarkRepository, SqlxRecipeRepository, SqlxUserRepository, UserRepository};
    use crate::db::testing::{insert_recipe, insert_user, migrated_pool};

    async fn setup() -> (BookmarkService, User, i64) {
        let pool = migrated_pool().await;
        let user_id = insert_user(&pool, "reader").await;
        let author = insert_user(&pool, "chef").await;
        let recipe = insert_recipe(&pool, author, "Борщ").await;
        let user = SqlxUserRepository::new(pool.clone())
            .get_by_id(user_id)
            .await
            .unwrap()
            .unwrap();
        let service = BookmarkService::new(
            SqlxBookmarkRepository::boxed(pool.clone()),
            SqlxRecipeRepository::boxed(pool),
        );
        (service, user, recipe)
    }

    #[tokio::test]
    async fn test_add_and_remove_favourite() {
        let (service, user, recipe) = setup().await;

        let added = service.add(BookmarkKind::Favourite, &user, recipe).await.unwrap();
        assert_eq!(added.name, "Борщ");
        assert!(matches!(
            service.add(BookmarkKind::Favourite, &user, recipe).await,
            Err(BookmarkServiceError::Validation(_))
        ));

        // The cart is a separate list
        service.add(BookmarkKind::ShoppingCart, &user, recipe).await.unwrap();

        service.remove(BookmarkKind::Favourite, &user, recipe).await.unwrap();
        assert!(matches!(
            service.remove(BookmarkKind::Favourite, &user, recipe).await,
            Err(BookmarkServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_recipe() {
        let (service, user, _) = setup().await;
        assert!(matches!(
            service.add(BookmarkKind::ShoppingCart, &user, 404).await,
            Err(BookmarkServiceError::NotFound(_))
        ));
    }
}
