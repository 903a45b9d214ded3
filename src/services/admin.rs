//! Admin listing service
//!
//! Runs `ModelAdmin` listings: resolves the entity by name, builds its query
//! from `q` and the filter parameters, and labels the resulting cells.

use crate::admin::{self, ModelAdmin};
use crate::db::repositories::AdminRepository;
use crate::models::{ListParams, PagedResult};
use anyhow::Context;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum AdminServiceError {
    #[error("Unknown admin model: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct AdminService {
    repo: Arc<dyn AdminRepository>,
}

impl AdminService {
    pub fn new(repo: Arc<dyn AdminRepository>) -> Self {
        Self { repo }
    }

    /// Every registered entity configuration
    pub fn models(&self) -> &'static [ModelAdmin] {
        admin::MODEL_ADMINS
    }

    /// One page of an entity's list view
    pub async fn list(
        &self,
        model: &str,
        search: Option<&str>,
        filters: &HashMap<String, String>,
        params: &ListParams,
    ) -> Result<PagedResult<Map<String, Value>>, AdminServiceError> {
        let model_admin = admin::find(model).ok_or_else(|| AdminServiceError::NotFound(model.to_string()))?;

        let query = model_admin.listing(search, filters);
        let (rows, total) = self
            .repo
            .list(&query, params)
            .await
            .with_context(|| format!("Failed to list {}", model_admin.name))?;

        Ok(PagedResult::new(model_admin.render(rows), total, params))
    }
}
