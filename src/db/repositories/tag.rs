//! Tag repository
//!
//! Database operations for tags.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite

use crate::db::DbPool;
use crate::models::Tag;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// Get tag by name
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// List all tags, newest first
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Return which of the given IDs exist
    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>>;

    /// Get tags attached to a recipe
    async fn get_by_recipe(&self, recipe_id: i64) -> Result<Vec<Tag>>;

    /// Delete a tag
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DbPool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        let result = sqlx::query(
            r#"
            INSERT INTO tags (name, color, slug)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&tag.name)
        .bind(&tag.color)
        .bind(&tag.slug)
        .execute(&self.pool)
        .await
        .context("Failed to create tag")?;

        Ok(Tag {
            id: result.last_insert_rowid(),
            ..tag.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT id, name, color, slug FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get tag by ID")?;

        Ok(row.as_ref().map(row_to_tag))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT id, name, color, slug FROM tags WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get tag by slug")?;

        Ok(row.as_ref().map(row_to_tag))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT id, name, color, slug FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get tag by name")?;

        Ok(row.as_ref().map(row_to_tag))
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT id, name, color, slug FROM tags ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list tags")?;

        Ok(rows.iter().map(row_to_tag).collect())
    }

    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT id FROM tags WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to look up tag IDs")?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn get_by_recipe(&self, recipe_id: i64) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.name, t.color, t.slug
            FROM tags t
            INNER JOIN recipe_tags rt ON t.id = rt.tag_id
            WHERE rt.recipe_id = ?
            ORDER BY t.id
            "#,
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to get tags by recipe")?;

        Ok(rows.iter().map(row_to_tag).collect())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        // recipe_tags rows go with it (ON DELETE CASCADE)
        sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete tag")?;

        Ok(())
    }
}

fn row_to_tag(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        color: row.get("color"),
        slug: row.get("slug"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::is_unique_violation;
    use crate::db::testing::{insert_recipe, insert_user, migrated_pool};

    fn tag(name: &str, slug: &str) -> Tag {
        Tag::new(name.to_string(), "#E26C2D".to_string(), slug.to_string())
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = SqlxTagRepository::new(migrated_pool().await);

        let created = repo.create(&tag("Breakfast", "breakfast")).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_slug("breakfast").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(repo.get_by_name("Breakfast").await.unwrap(), Some(created));
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let repo = SqlxTagRepository::new(migrated_pool().await);
        repo.create(&tag("Breakfast", "breakfast")).await.unwrap();
        repo.create(&tag("Dinner", "dinner")).await.unwrap();

        let tags = repo.list().await.unwrap();
        let slugs: Vec<_> = tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["dinner", "breakfast"]);
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let repo = SqlxTagRepository::new(migrated_pool().await);
        repo.create(&tag("Breakfast", "breakfast")).await.unwrap();

        let err = repo.create(&tag("Morning", "breakfast")).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_existing_ids() {
        let repo = SqlxTagRepository::new(migrated_pool().await);
        let a = repo.create(&tag("Breakfast", "breakfast")).await.unwrap();
        let b = repo.create(&tag("Dinner", "dinner")).await.unwrap();

        let mut found = repo.existing_ids(&[a.id, b.id, 404]).await.unwrap();
        found.sort();
        assert_eq!(found, vec![a.id, b.id]);
        assert!(repo.existing_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_by_recipe_and_cascade() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "chef").await;
        let recipe = insert_recipe(&pool, author, "Porridge").await;
        let repo = SqlxTagRepository::new(pool.clone());
        let breakfast = repo.create(&tag("Breakfast", "breakfast")).await.unwrap();

        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe)
            .bind(breakfast.id)
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(repo.get_by_recipe(recipe).await.unwrap(), vec![breakfast.clone()]);

        repo.delete(breakfast.id).await.unwrap();
        assert!(repo.get_by_recipe(recipe).await.unwrap().is_empty());
    }
}
