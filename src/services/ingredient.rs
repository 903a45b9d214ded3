//! Ingredient service

use crate::db::is_unique_violation;
use crate::db::repositories::IngredientRepository;
use crate::models::Ingredient;
use crate::serializers::{FieldErrors, IngredientInput, IngredientValidator, Validator};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum IngredientServiceError {
    #[error("Ingredient not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct IngredientService {
    repo: Arc<dyn IngredientRepository>,
}

impl IngredientService {
    pub fn new(repo: Arc<dyn IngredientRepository>) -> Self {
        Self { repo }
    }

    /// Ingredients whose name starts with `name`, or all of them
    pub async fn search(&self, name: Option<&str>) -> Result<Vec<Ingredient>, IngredientServiceError> {
        Ok(self.repo.search(name).await.context("Failed to search ingredients")?)
    }

    pub async fn get(&self, id: i64) -> Result<Ingredient, IngredientServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get ingredient")?
            .ok_or_else(|| IngredientServiceError::NotFound(id.to_string()))
    }

    pub async fn create(&self, input: IngredientInput) -> Result<Ingredient, IngredientServiceError> {
        let pair_taken = match (input.name.as_deref(), input.measurement_unit.as_deref()) {
            (Some(name), Some(unit)) => self
                .repo
                .find(name, unit)
                .await
                .context("Failed to check ingredient")?
                .is_some(),
            _ => false,
        };

        let ingredient = IngredientValidator { pair_taken }
            .validate(input)
            .map_err(IngredientServiceError::Validation)?;

        match self.repo.create(&ingredient).await {
            Ok(created) => {
                tracing::info!(ingredient_id = created.id, name = %created.name, "Ingredient created");
                Ok(created)
            }
            Err(e) if is_unique_violation(&e) => Err(IngredientServiceError::Validation(FieldErrors::single(
                "non_field_errors",
                "This ingredient already exists with the same measurement unit.",
            ))),
            Err(e) => Err(e.into()),
        }
    }
}
