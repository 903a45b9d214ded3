//! Recipe service
//!
//! Create and update run as one unit of work: referenced tags and ingredients
//! are looked up, the payload is validated, the image is stored, and only then
//! is the recipe with all of its associations written in a single transaction.
//! If that transaction fails the freshly stored image is removed again.

use crate::db::repositories::{IngredientRepository, RecipeRepository, TagRepository};
use crate::models::{
    ListParams, NewRecipe, PagedResult, Recipe, RecipeChanges, RecipeFilter, ShoppingListItem, User,
};
use crate::serializers::{
    FieldErrors, RecipeDraft, RecipeWriteInput, RecipeWriteValidator, Validator, WriteMode,
};
use crate::services::media::{MediaError, MediaStorage};
use anyhow::{anyhow, Context};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

/// Error types for recipe service operations
#[derive(Debug, thiserror::Error)]
pub enum RecipeServiceError {
    #[error("Recipe not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<MediaError> for RecipeServiceError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::TooLarge { .. } => RecipeServiceError::Validation(FieldErrors::single("image", err.to_string())),
            MediaError::InternalError(e) => RecipeServiceError::InternalError(e),
        }
    }
}

/// Recipe service
pub struct RecipeService {
    recipes: Arc<dyn RecipeRepository>,
    tags: Arc<dyn TagRepository>,
    ingredients: Arc<dyn IngredientRepository>,
    media: Arc<MediaStorage>,
}

impl RecipeService {
    pub fn new(
        recipes: Arc<dyn RecipeRepository>,
        tags: Arc<dyn TagRepository>,
        ingredients: Arc<dyn IngredientRepository>,
        media: Arc<MediaStorage>,
    ) -> Self {
        Self {
            recipes,
            tags,
            ingredients,
            media,
        }
    }

    pub async fn get(&self, id: i64) -> Result<Recipe, RecipeServiceError> {
        self.recipes
            .get_by_id(id)
            .await
            .context("Failed to get recipe")?
            .ok_or_else(|| RecipeServiceError::NotFound(id.to_string()))
    }

    /// Newest first, narrowed by the filter
    pub async fn list(
        &self,
        filter: &RecipeFilter,
        params: &ListParams,
    ) -> Result<PagedResult<Recipe>, RecipeServiceError> {
        let (recipes, total) = self
            .recipes
            .list(filter, params)
            .await
            .context("Failed to list recipes")?;
        Ok(PagedResult::new(recipes, total, params))
    }

    pub async fn create(&self, author: &User, input: RecipeWriteInput) -> Result<Recipe, RecipeServiceError> {
        let draft = self.validate(WriteMode::Create, input).await?;

        let (name, image, text, cooking_time) = match (draft.name, draft.image, draft.text, draft.cooking_time) {
            (Some(name), Some(image), Some(text), Some(cooking_time)) => (name, image, text, cooking_time),
            _ => return Err(anyhow!("Validated recipe draft is missing required fields").into()),
        };

        let image_path = self.media.save(&image).await?;
        let new_recipe = NewRecipe {
            author_id: author.id,
            name,
            image: image_path.clone(),
            text,
            cooking_time,
            tag_ids: draft.tag_ids,
            ingredients: draft.ingredients,
        };

        match self.recipes.create(&new_recipe).await {
            Ok(recipe) => {
                tracing::info!(recipe_id = recipe.id, author_id = author.id, "Recipe created");
                Ok(recipe)
            }
            Err(e) => {
                self.discard_image(&image_path).await;
                Err(e.into())
            }
        }
    }

    /// Apply a partial update. Tags and ingredients are always replaced.
    pub async fn update(&self, recipe: &Recipe, input: RecipeWriteInput) -> Result<Recipe, RecipeServiceError> {
        let draft = self.validate(WriteMode::Update, input).await?;

        let image_path = match &draft.image {
            Some(image) => Some(self.media.save(image).await?),
            None => None,
        };
        let changes = RecipeChanges {
            name: draft.name,
            image: image_path.clone(),
            text: draft.text,
            cooking_time: draft.cooking_time,
            tag_ids: draft.tag_ids,
            ingredients: draft.ingredients,
        };

        match self.recipes.update(recipe.id, &changes).await {
            Ok(updated) => {
                if image_path.is_some() {
                    self.discard_image(&recipe.image).await;
                }
                tracing::info!(recipe_id = recipe.id, "Recipe updated");
                Ok(updated)
            }
            Err(e) => {
                if let Some(path) = &image_path {
                    self.discard_image(path).await;
                }
                Err(e.into())
            }
        }
    }

    pub async fn delete(&self, recipe: &Recipe) -> Result<(), RecipeServiceError> {
        self.recipes.delete(recipe.id).await.context("Failed to delete recipe")?;
        self.discard_image(&recipe.image).await;
        tracing::info!(recipe_id = recipe.id, "Recipe deleted");
        Ok(())
    }

    /// Aggregated ingredients of every recipe in the user's cart
    pub async fn shopping_list(&self, user: &User) -> Result<Vec<ShoppingListItem>, RecipeServiceError> {
        Ok(self
            .recipes
            .shopping_list(user.id)
            .await
            .context("Failed to build shopping list")?)
    }

    async fn validate(&self, mode: WriteMode, input: RecipeWriteInput) -> Result<RecipeDraft, RecipeServiceError> {
        let known_tags: HashSet<i64> = self
            .tags
            .existing_ids(&input.tag_ids())
            .await
            .context("Failed to look up tags")?
            .into_iter()
            .collect();
        let known_ingredients: HashSet<i64> = self
            .ingredients
            .existing_ids(&input.ingredient_ids())
            .await
            .context("Failed to look up ingredients")?
            .into_iter()
            .collect();

        RecipeWriteValidator {
            mode,
            known_tags: &known_tags,
            known_ingredients: &known_ingredients,
        }
        .validate(input)
        .map_err(RecipeServiceError::Validation)
    }

    async fn discard_image(&self, path: &str) {
        if let Err(e) = self.media.remove(path).await {
            tracing::warn!(path, error = %e, "Failed to remove recipe image");
        }
    }
}

/// Plain-text shopping list, one aggregated ingredient per line
pub fn render_shopping_list(items: &[ShoppingListItem]) -> String {
    let mut out = String::from("Shopping list\n\n");
    if items.is_empty() {
        out.push_str("Your shopping cart is empty.\n");
        return out;
    }
    for item in items {
        let _ = writeln!(out, "* {} ({}) - {}", item.name, item.measurement_unit, item.total);
    }
    out
}
