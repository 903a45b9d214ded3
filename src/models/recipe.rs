//! Recipe model
//!
//! This module provides:
//! - `Recipe` entity as stored
//! - `NewRecipe` / `RecipeChanges` unit-of-work inputs built by the validators
//! - `RecipeFilter` for the public recipe list

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Largest amount a recipe ingredient row may carry
pub const MAX_AMOUNT: i64 = 32767;

/// Recipe entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique identifier
    pub id: i64,
    /// Author user ID
    pub author_id: i64,
    /// Recipe title
    pub name: String,
    /// Image path relative to the media root
    pub image: String,
    /// Description
    pub text: String,
    /// Cooking time in minutes
    pub cooking_time: i64,
    /// Publication timestamp
    pub pub_date: DateTime<Utc>,
}

/// Validated `(ingredient, amount)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientLine {
    pub ingredient_id: i64,
    pub amount: i64,
}

/// A validated recipe ready to be persisted in one transaction
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub author_id: i64,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
    pub tag_ids: Vec<i64>,
    pub ingredients: Vec<IngredientLine>,
}

/// A validated recipe update.
///
/// Tags and ingredients are always replaced in full; scalar fields are only
/// written when present.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub tag_ids: Vec<i64>,
    pub ingredients: Vec<IngredientLine>,
}

/// Filters accepted by the recipe list
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    /// Only recipes by this author
    pub author: Option<i64>,
    /// Recipes having any of these tag slugs
    pub tags: Vec<String>,
    /// Only recipes favourited by this user
    pub favorited_by: Option<i64>,
    /// Only recipes in this user's shopping cart
    pub in_cart_of: Option<i64>,
}
