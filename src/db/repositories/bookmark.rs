//! Bookmark repository
//!
//! Favourites and shopping cart entries. Both tables share a shape, so one
//! repository serves both and the `BookmarkKind` picks the table.

use crate::db::DbPool;
use crate::models::{Bookmark, BookmarkKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Bookmark repository trait
#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// Add a recipe to a user's list
    async fn add(&self, kind: BookmarkKind, user_id: i64, recipe_id: i64) -> Result<Bookmark>;

    /// Remove a recipe from a user's list; returns whether a row was removed
    async fn remove(&self, kind: BookmarkKind, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Whether a recipe is on a user's list
    async fn exists(&self, kind: BookmarkKind, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// How many users have a recipe on their list
    async fn count_for_recipe(&self, kind: BookmarkKind, recipe_id: i64) -> Result<i64>;
}

/// SQLx-based bookmark repository implementation
pub struct SqlxBookmarkRepository {
    pool: DbPool,
}

impl SqlxBookmarkRepository {
    /// Create a new SQLx bookmark repository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn BookmarkRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl BookmarkRepository for SqlxBookmarkRepository {
    async fn add(&self, kind: BookmarkKind, user_id: i64, recipe_id: i64) -> Result<Bookmark> {
        let now = Utc::now();

        let result = sqlx::query(&format!(
            "INSERT INTO {} (user_id, recipe_id, date_added) VALUES (?, ?, ?)",
            kind.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to add recipe to {}", kind))?;

        Ok(Bookmark {
            id: result.last_insert_rowid(),
            user_id,
            recipe_id,
            date_added: now,
        })
    }

    async fn remove(&self, kind: BookmarkKind, user_id: i64, recipe_id: i64) -> Result<bool> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = ? AND recipe_id = ?",
            kind.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to remove recipe from {}", kind))?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, kind: BookmarkKind, user_id: i64, recipe_id: i64) -> Result<bool> {
        let row = sqlx::query(&format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = ? AND recipe_id = ?) AS found",
            kind.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to check {}", kind))?;

        Ok(row.get::<i64, _>("found") != 0)
    }

    async fn count_for_recipe(&self, kind: BookmarkKind, recipe_id: i64) -> Result<i64> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS count FROM {} WHERE recipe_id = ?",
            kind.table()
        ))
        .bind(recipe_id)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to count {}", kind))?;

        Ok(row.get("count"))
    }
}
