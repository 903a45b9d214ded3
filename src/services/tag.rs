//! Tag service
//!
//! Tags are a fixed, staff-managed vocabulary; everyone else only reads them.

use crate::db::is_unique_violation;
use crate::db::repositories::TagRepository;
use crate::models::Tag;
use crate::serializers::{FieldErrors, TagInput, TagValidator, Validator};
use anyhow::Context;
use std::sync::Arc;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        Ok(self.repo.list().await.context("Failed to list tags")?)
    }

    pub async fn get(&self, id: i64) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag")?
            .ok_or_else(|| TagServiceError::NotFound(id.to_string()))
    }

    /// Validate and store a new tag
    pub async fn create(&self, input: TagInput) -> Result<Tag, TagServiceError> {
        let name_taken = match input.name.as_deref() {
            Some(name) => self.repo.get_by_name(name).await.context("Failed to check tag name")?.is_some(),
            None => false,
        };
        let slug_taken = match input.slug.as_deref() {
            Some(slug) => self.repo.get_by_slug(slug).await.context("Failed to check tag slug")?.is_some(),
            None => false,
        };

        let tag = TagValidator { name_taken, slug_taken }
            .validate(input)
            .map_err(TagServiceError::Validation)?;

        match self.repo.create(&tag).await {
            Ok(created) => {
                tracing::info!(tag_id = created.id, slug = %created.slug, "Tag created");
                Ok(created)
            }
            Err(e) if is_unique_violation(&e) => Err(TagServiceError::Validation(FieldErrors::single(
                "slug",
                "A tag with this slug already exists.",
            ))),
            Err(e) => Err(e.into()),
        }
    }
}
