//! Recipe write validation
//!
//! Both create and update validate tags and ingredients in full; they differ
//! only in whether the scalar fields are required.

use serde::Deserialize;
use std::collections::HashSet;

use super::image::{decode_data_uri, DecodedImage};
use super::{optional_text, FieldErrors, LenientInt, Validator, REQUIRED};
use crate::models::{IngredientLine, MAX_AMOUNT};

pub const RECIPE_NAME_MAX: usize = 200;
pub const RECIPE_TEXT_MAX: usize = 1000;

/// One `{id, amount}` entry of the ingredients list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngredientRef {
    pub id: Option<i64>,
    pub amount: Option<LenientInt>,
}

/// Recipe create/update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeWriteInput {
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<IngredientRef>>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<LenientInt>,
}

impl RecipeWriteInput {
    /// Tag ids referenced by the payload
    pub fn tag_ids(&self) -> Vec<i64> {
        self.tags.clone().unwrap_or_default()
    }

    /// Ingredient ids referenced by the payload
    pub fn ingredient_ids(&self) -> Vec<i64> {
        self.ingredients
            .iter()
            .flatten()
            .filter_map(|item| item.id)
            .collect()
    }
}

/// Whether scalar fields are required
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

/// A validated payload. On create every scalar is `Some`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub name: Option<String>,
    pub image: Option<DecodedImage>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub tag_ids: Vec<i64>,
    pub ingredients: Vec<IngredientLine>,
}

/// Validates a recipe payload against the tag and ingredient ids that exist
pub struct RecipeWriteValidator<'a> {
    pub mode: WriteMode,
    pub known_tags: &'a HashSet<i64>,
    pub known_ingredients: &'a HashSet<i64>,
}

fn missing_object(id: i64) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

impl RecipeWriteValidator<'_> {
    fn validate_tags(&self, errors: &mut FieldErrors, tags: Option<Vec<i64>>) -> Vec<i64> {
        let Some(tags) = tags else {
            errors.add("tags", REQUIRED);
            return Vec::new();
        };
        if tags.is_empty() {
            errors.add("tags", "At least one tag is required.");
            return Vec::new();
        }

        let mut seen = HashSet::new();
        for id in &tags {
            if !seen.insert(*id) {
                errors.add("tags", "Tags must be unique.");
                break;
            }
        }
        for id in &tags {
            if !self.known_tags.contains(id) {
                errors.add("tags", missing_object(*id));
            }
        }
        tags
    }

    fn validate_ingredients(
        &self,
        errors: &mut FieldErrors,
        ingredients: Option<Vec<IngredientRef>>,
    ) -> Vec<IngredientLine> {
        let Some(ingredients) = ingredients else {
            errors.add("ingredients", REQUIRED);
            return Vec::new();
        };
        if ingredients.is_empty() {
            errors.add("ingredients", "At least one ingredient is required.");
            return Vec::new();
        }

        let mut lines = Vec::with_capacity(ingredients.len());
        let mut seen = HashSet::new();
        for item in ingredients {
            let Some(id) = item.id else {
                errors.add("ingredients", "Each ingredient needs an id.");
                continue;
            };
            if !self.known_ingredients.contains(&id) {
                errors.add("ingredients", missing_object(id));
            }
            if !seen.insert(id) {
                errors.add("ingredients", "Ingredients must be unique.");
            }

            match item.amount.as_ref().map(LenientInt::value) {
                None => errors.add("ingredients", "Each ingredient needs an amount."),
                Some(None) => errors.add("ingredients", "The amount must be an integer."),
                Some(Some(amount)) if amount <= 0 => {
                    errors.add("ingredients", "The amount must be greater than 0.")
                }
                Some(Some(amount)) if amount > MAX_AMOUNT => errors.add(
                    "ingredients",
                    format!("The amount must not exceed {}.", MAX_AMOUNT),
                ),
                Some(Some(amount)) => lines.push(IngredientLine {
                    ingredient_id: id,
                    amount,
                }),
            }
        }
        lines
    }

    fn validate_cooking_time(
        &self,
        errors: &mut FieldErrors,
        value: Option<LenientInt>,
    ) -> Option<i64> {
        let value = match value {
            None if self.mode == WriteMode::Create => {
                errors.add("cooking_time", REQUIRED);
                return None;
            }
            None => return None,
            Some(value) => value,
        };
        match value.value() {
            None => {
                errors.add("cooking_time", "A valid integer is required.");
                None
            }
            Some(minutes) if minutes < 1 => {
                errors.add("cooking_time", "Ensure this value is greater than or equal to 1.");
                None
            }
            Some(minutes) => Some(minutes),
        }
    }

    fn validate_image(&self, errors: &mut FieldErrors, value: Option<String>) -> Option<DecodedImage> {
        match value {
            None if self.mode == WriteMode::Create => {
                errors.add("image", REQUIRED);
                None
            }
            None => None,
            Some(value) => match decode_data_uri(&value) {
                Ok(image) => Some(image),
                Err(message) => {
                    errors.add("image", message);
                    None
                }
            },
        }
    }

    fn text(&self, errors: &mut FieldErrors, field: &str, value: Option<String>, max: usize) -> Option<String> {
        if value.is_none() && self.mode == WriteMode::Create {
            errors.add(field, REQUIRED);
            return None;
        }
        optional_text(errors, field, value, max)
    }
}

impl Validator<RecipeWriteInput> for RecipeWriteValidator<'_> {
    type Output = RecipeDraft;

    fn validate(&self, input: RecipeWriteInput) -> Result<RecipeDraft, FieldErrors> {
        let mut errors = FieldErrors::new();

        let tag_ids = self.validate_tags(&mut errors, input.tags);
        let ingredients = self.validate_ingredients(&mut errors, input.ingredients);
        let name = self.text(&mut errors, "name", input.name, RECIPE_NAME_MAX);
        let text = self.text(&mut errors, "text", input.text, RECIPE_TEXT_MAX);
        let cooking_time = self.validate_cooking_time(&mut errors, input.cooking_time);
        let image = self.validate_image(&mut errors, input.image);

        errors.into_result(RecipeDraft {
            name,
            image,
            text,
            cooking_time,
            tag_ids,
            ingredients,
        })
    }
}
