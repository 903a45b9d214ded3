//! Follow repository
//!
//! Subscriptions between users.

use crate::db::repositories::user::row_to_user;
use crate::db::DbPool;
use crate::models::{Follow, ListParams, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Follow repository trait
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Subscribe `user_id` to `author_id`
    async fn create(&self, user_id: i64, author_id: i64) -> Result<Follow>;

    /// Unsubscribe; returns whether a row was removed
    async fn delete(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Whether `user_id` follows `author_id`
    async fn exists(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Authors followed by a user, most recent subscription first
    async fn list_authors(&self, user_id: i64, params: &ListParams) -> Result<(Vec<User>, i64)>;
}

/// SQLx-based follow repository implementation
pub struct SqlxFollowRepository {
    pool: DbPool,
}

impl SqlxFollowRepository {
    /// Create a new SQLx follow repository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn FollowRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FollowRepository for SqlxFollowRepository {
    async fn create(&self, user_id: i64, author_id: i64) -> Result<Follow> {
        let result = sqlx::query("INSERT INTO follows (user_id, author_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await
            .context("Failed to create follow")?;

        Ok(Follow {
            id: result.last_insert_rowid(),
            user_id,
            author_id,
        })
    }

    async fn delete(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete follow")?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = ? AND author_id = ?) AS found",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check follow")?;

        Ok(row.get::<i64, _>("found") != 0)
    }

    async fn list_authors(&self, user_id: i64, params: &ListParams) -> Result<(Vec<User>, i64)> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS count FROM follows WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count follows")?
            .get("count");

        let rows = sqlx::query(
            r#"
            SELECT u.id, u.username, u.email, u.first_name, u.last_name,
                   u.password_hash, u.role, u.created_at
            FROM follows f
            INNER JOIN users u ON u.id = f.author_id
            WHERE f.user_id = ?
            ORDER BY f.id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list followed authors")?;

        let authors = rows.iter().map(row_to_user).collect::<Result<Vec<_>>>()?;
        Ok((authors, total))
    }
}
