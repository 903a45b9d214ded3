//! Read shapes
//!
//! Response representations of users and recipes. Viewer-dependent flags
//! (`is_subscribed`, `is_favorited`, `is_in_shopping_cart`) are computed from
//! the `ViewContext` and are always `false` for anonymous viewers.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::sync::Arc;

use super::ViewContext;
use crate::db::repositories::{
    BookmarkRepository, FollowRepository, IngredientRepository, RecipeRepository, TagRepository,
    UserRepository,
};
use crate::models::{BookmarkKind, IngredientAmount, Recipe, Tag, User};

/// Public user representation
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserRead {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_subscribed: bool,
}

/// Response to a successful registration
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserCreated {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&User> for UserCreated {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Compact recipe used in subscriptions and favourite/cart responses
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecipeShort {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i64,
}

/// Full recipe representation
#[derive(Debug, Clone, Serialize)]
pub struct RecipeRead {
    pub id: i64,
    pub tags: Vec<Tag>,
    pub author: UserRead,
    pub ingredients: Vec<IngredientAmount>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
}

/// A followed author with their recipes
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionRead {
    #[serde(flatten)]
    pub user: UserRead,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}

/// Builds read shapes, resolving related rows through the repositories
#[derive(Clone)]
pub struct ReadShapes {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
    tags: Arc<dyn TagRepository>,
    ingredients: Arc<dyn IngredientRepository>,
    recipes: Arc<dyn RecipeRepository>,
    bookmarks: Arc<dyn BookmarkRepository>,
    media_url: String,
}

impl ReadShapes {
    pub fn new(
        users: Arc<dyn UserRepository>,
        follows: Arc<dyn FollowRepository>,
        tags: Arc<dyn TagRepository>,
        ingredients: Arc<dyn IngredientRepository>,
        recipes: Arc<dyn RecipeRepository>,
        bookmarks: Arc<dyn BookmarkRepository>,
        media_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            follows,
            tags,
            ingredients,
            recipes,
            bookmarks,
            media_url: media_url.into(),
        }
    }

    /// Absolute URL of a stored media file
    pub fn image_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.media_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub async fn user(&self, user: &User, ctx: &ViewContext) -> Result<UserRead> {
        let is_subscribed = match ctx.viewer {
            Some(viewer) => self.follows.exists(viewer, user.id).await?,
            None => false,
        };

        Ok(UserRead {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            is_subscribed,
        })
    }

    pub fn recipe_short(&self, recipe: &Recipe) -> RecipeShort {
        RecipeShort {
            id: recipe.id,
            name: recipe.name.clone(),
            image: self.image_url(&recipe.image),
            cooking_time: recipe.cooking_time,
        }
    }

    pub async fn recipe(&self, recipe: &Recipe, ctx: &ViewContext) -> Result<RecipeRead> {
        let author = self
            .users
            .get_by_id(recipe.author_id)
            .await?
            .ok_or_else(|| anyhow!("Author {} of recipe {} not found", recipe.author_id, recipe.id))?;

        let (is_favorited, is_in_shopping_cart) = match ctx.viewer {
            Some(viewer) => (
                self.bookmarks.exists(BookmarkKind::Favourite, viewer, recipe.id).await?,
                self.bookmarks.exists(BookmarkKind::ShoppingCart, viewer, recipe.id).await?,
            ),
            None => (false, false),
        };

        Ok(RecipeRead {
            id: recipe.id,
            tags: self.tags.get_by_recipe(recipe.id).await?,
            author: self.user(&author, ctx).await?,
            ingredients: self.ingredients.get_by_recipe(recipe.id).await?,
            is_favorited,
            is_in_shopping_cart,
            name: recipe.name.clone(),
            image: self.image_url(&recipe.image),
            text: recipe.text.clone(),
            cooking_time: recipe.cooking_time,
        })
    }

    pub async fn recipes(&self, recipes: &[Recipe], ctx: &ViewContext) -> Result<Vec<RecipeRead>> {
        let mut shapes = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            shapes.push(self.recipe(recipe, ctx).await?);
        }
        Ok(shapes)
    }

    pub async fn subscription(&self, author: &User, ctx: &ViewContext) -> Result<SubscriptionRead> {
        let recipes = self.recipes.list_by_author(author.id, ctx.recipes_limit).await?;

        Ok(SubscriptionRead {
            user: self.user(author, ctx).await?,
            recipes: recipes.iter().map(|r| self.recipe_short(r)).collect(),
            recipes_count: self.recipes.count_by_author(author.id).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxBookmarkRepository, SqlxFollowRepository, SqlxIngredientRepository,
        SqlxRecipeRepository, SqlxTagRepository, SqlxUserRepository,
    };
    use crate::db::testing::{insert_ingredient, insert_recipe, insert_tag, insert_user, migrated_pool};
    use crate::db::DbPool;

    fn shapes(pool: &DbPool) -> ReadShapes {
        ReadShapes::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxFollowRepository::boxed(pool.clone()),
            SqlxTagRepository::boxed(pool.clone()),
            SqlxIngredientRepository::boxed(pool.clone()),
            SqlxRecipeRepository::boxed(pool.clone()),
            SqlxBookmarkRepository::boxed(pool.clone()),
            "http://localhost:8000/media/",
        )
    }

    async fn recipe_with_relations(pool: &DbPool, author: i64) -> Recipe {
        let recipe_id = insert_recipe(pool, author, "Soup").await;
        let tag = insert_tag(pool, "Lunch", "lunch").await;
        let beet = insert_ingredient(pool, "beet", "g").await;
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(tag)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (?, ?, 300)")
            .bind(recipe_id)
            .bind(beet)
            .execute(pool)
            .await
            .unwrap();
        SqlxRecipeRepository::new(pool.clone())
            .get_by_id(recipe_id)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_flags_are_false() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "chef").await;
        let reader = insert_user(&pool, "reader").await;
        let recipe = recipe_with_relations(&pool, author).await;
        for table in ["favourites", "shopping_carts"] {
            sqlx::query(&format!("INSERT INTO {} (user_id, recipe_id) VALUES (?, ?)", table))
                .bind(reader)
                .bind(recipe.id)
                .execute(&pool)
                .await
                .unwrap();
        }
        sqlx::query("INSERT INTO follows (user_id, author_id) VALUES (?, ?)")
            .bind(reader)
            .bind(author)
            .execute(&pool)
            .await
            .unwrap();

        let shapes = shapes(&pool);

        let anonymous = shapes.recipe(&recipe, &ViewContext::anonymous()).await.unwrap();
        assert!(!anonymous.is_favorited);
        assert!(!anonymous.is_in_shopping_cart);
        assert!(!anonymous.author.is_subscribed);

        let viewed = shapes
            .recipe(&recipe, &ViewContext::for_viewer(Some(reader)))
            .await
            .unwrap();
        assert!(viewed.is_favorited);
        assert!(viewed.is_in_shopping_cart);
        assert!(viewed.author.is_subscribed);
    }

    #[tokio::test]
    async fn test_recipe_shape_json() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "chef").await;
        let recipe = recipe_with_relations(&pool, author).await;

        let read = shapes(&pool).recipe(&recipe, &ViewContext::anonymous()).await.unwrap();
        let json = serde_json::to_value(&read).unwrap();

        assert_eq!(json["image"], "http://localhost:8000/media/recipes/images/test.png");
        assert_eq!(json["tags"][0]["slug"], "lunch");
        assert_eq!(json["tags"][0]["color"], "#49B64E");
        assert_eq!(json["ingredients"][0]["amount"], 300);
        assert_eq!(json["ingredients"][0]["measurement_unit"], "g");
        assert_eq!(json["author"]["username"], "chef");
        assert!(json.get("pub_date").is_none());
    }

    #[tokio::test]
    async fn test_subscription_caps_recipes() {
        let pool = migrated_pool().await;
        let author_id = insert_user(&pool, "chef").await;
        for name in ["One", "Two", "Three"] {
            insert_recipe(&pool, author_id, name).await;
        }
        let author = SqlxUserRepository::new(pool.clone())
            .get_by_id(author_id)
            .await
            .unwrap()
            .unwrap();

        let ctx = ViewContext::anonymous().with_recipes_limit(Some(2));
        let read = shapes(&pool).subscription(&author, &ctx).await.unwrap();
        assert_eq!(read.recipes.len(), 2);
        assert_eq!(read.recipes_count, 3);

        let json = serde_json::to_value(&read).unwrap();
        assert_eq!(json["username"], "chef");
        assert_eq!(json["recipes_count"], 3);
    }
}
