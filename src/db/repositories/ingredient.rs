//! Ingredient repository
//!
//! Database operations for ingredients and their per-recipe amounts.

use crate::db::DbPool;
use crate::models::{Ingredient, IngredientAmount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::sync::Arc;

/// Ingredient repository trait
#[async_trait]
pub trait IngredientRepository: Send + Sync {
    /// Create a new ingredient
    async fn create(&self, ingredient: &Ingredient) -> Result<Ingredient>;

    /// Get ingredient by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Ingredient>>;

    /// Get ingredient by its `(name, measurement_unit)` pair
    async fn find(&self, name: &str, measurement_unit: &str) -> Result<Option<Ingredient>>;

    /// List ingredients ordered by name, optionally restricted to a name prefix
    async fn search(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>>;

    /// Return which of the given IDs exist
    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>>;

    /// Ingredients of a recipe with their amounts
    async fn get_by_recipe(&self, recipe_id: i64) -> Result<Vec<IngredientAmount>>;
}

/// SQLx-based ingredient repository implementation
pub struct SqlxIngredientRepository {
    pool: DbPool,
}

impl SqlxIngredientRepository {
    /// Create a new SQLx ingredient repository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn IngredientRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Lowercased name used for prefix search
///
/// SQLite's LIKE folds ASCII letters only, so the stored key and the
/// search prefix are both lowercased with full Unicode rules.
pub(crate) fn search_key(name: &str) -> String {
    name.to_lowercase()
}

/// Escape LIKE wildcards so user input matches literally
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl IngredientRepository for SqlxIngredientRepository {
    async fn create(&self, ingredient: &Ingredient) -> Result<Ingredient> {
        let result = sqlx::query(
            "INSERT INTO ingredients (name, measurement_unit, search_name) VALUES (?, ?, ?)",
        )
        .bind(&ingredient.name)
        .bind(&ingredient.measurement_unit)
        .bind(search_key(&ingredient.name))
            .execute(&self.pool)
            .await
            .context("Failed to create ingredient")?;

        Ok(Ingredient {
            id: result.last_insert_rowid(),
            ..ingredient.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Ingredient>> {
        let row = sqlx::query("SELECT id, name, measurement_unit FROM ingredients WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get ingredient by ID")?;

        Ok(row.as_ref().map(row_to_ingredient))
    }

    async fn find(&self, name: &str, measurement_unit: &str) -> Result<Option<Ingredient>> {
        let row = sqlx::query(
            "SELECT id, name, measurement_unit FROM ingredients WHERE name = ? AND measurement_unit = ?",
        )
        .bind(name)
        .bind(measurement_unit)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find ingredient")?;

        Ok(row.as_ref().map(row_to_ingredient))
    }

    async fn search(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>> {
        let rows = match name_prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => sqlx::query(
                r#"
                SELECT id, name, measurement_unit
                FROM ingredients
                WHERE search_name LIKE ? ESCAPE '\'
                ORDER BY name, id
                "#,
            )
            .bind(format!("{}%", escape_like(&search_key(prefix))))
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query("SELECT id, name, measurement_unit FROM ingredients ORDER BY name, id")
                .fetch_all(&self.pool)
                .await,
        }
        .context("Failed to search ingredients")?;

        Ok(rows.iter().map(row_to_ingredient).collect())
    }

    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id FROM ingredients WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to look up ingredient IDs")?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn get_by_recipe(&self, recipe_id: i64) -> Result<Vec<IngredientAmount>> {
        let rows = sqlx::query(
            r#"
            SELECT i.id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ?
            ORDER BY ri.id
            "#,
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to get ingredients by recipe")?;

        Ok(rows
            .iter()
            .map(|row| IngredientAmount {
                id: row.get("id"),
                name: row.get("name"),
                measurement_unit: row.get("measurement_unit"),
                amount: row.get("amount"),
            })
            .collect())
    }
}

fn row_to_ingredient(row: &sqlx::sqlite::SqliteRow) -> Ingredient {
    Ingredient {
        id: row.get("id"),
        name: row.get("name"),
        measurement_unit: row.get("measurement_unit"),
    }
}
