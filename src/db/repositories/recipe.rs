//! Recipe repository
//!
//! Database operations for recipes.
//!
//! This module provides:
//! - `RecipeRepository` trait defining the interface for recipe data access
//! - `SqlxRecipeRepository` implementing the trait for SQLite
//!
//! Creating and updating a recipe is a unit of work: the recipe row, its tag
//! associations and its ingredient rows are written in one transaction, so a
//! failure part-way leaves nothing behind.

use crate::db::DbPool;
use crate::models::{
    IngredientLine, ListParams, NewRecipe, Recipe, RecipeChanges, RecipeFilter, ShoppingListItem,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteConnection;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::sync::Arc;

/// Recipe repository trait
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Insert a recipe together with its tags and ingredient rows
    async fn create(&self, recipe: &NewRecipe) -> Result<Recipe>;

    /// Get recipe by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>>;

    /// Replace tags and ingredients, then apply scalar changes
    async fn update(&self, id: i64, changes: &RecipeChanges) -> Result<Recipe>;

    /// Delete a recipe
    async fn delete(&self, id: i64) -> Result<()>;

    /// List recipes newest first, returning the page and the total count
    async fn list(&self, filter: &RecipeFilter, params: &ListParams) -> Result<(Vec<Recipe>, i64)>;

    /// Recipes by one author, newest first, optionally capped
    async fn list_by_author(&self, author_id: i64, limit: Option<i64>) -> Result<Vec<Recipe>>;

    /// Number of recipes by one author
    async fn count_by_author(&self, author_id: i64) -> Result<i64>;

    /// Ingredient totals across every recipe in the user's shopping cart
    async fn shopping_list(&self, user_id: i64) -> Result<Vec<ShoppingListItem>>;
}

/// SQLx-based recipe repository implementation
pub struct SqlxRecipeRepository {
    pool: DbPool,
}

impl SqlxRecipeRepository {
    /// Create a new SQLx recipe repository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn RecipeRepository> {
        Arc::new(Self::new(pool))
    }
}

const RECIPE_COLUMNS: &str = "r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.pub_date";

#[async_trait]
impl RecipeRepository for SqlxRecipeRepository {
    async fn create(&self, recipe: &NewRecipe) -> Result<Recipe> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let result = sqlx::query(
            r#"
            INSERT INTO recipes (author_id, name, image, text, cooking_time, pub_date)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(recipe.author_id)
        .bind(&recipe.name)
        .bind(&recipe.image)
        .bind(&recipe.text)
        .bind(recipe.cooking_time)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create recipe")?;

        let id = result.last_insert_rowid();
        write_associations(&mut tx, id, &recipe.tag_ids, &recipe.ingredients).await?;

        tx.commit().await.context("Failed to commit recipe")?;

        Ok(Recipe {
            id,
            author_id: recipe.author_id,
            name: recipe.name.clone(),
            image: recipe.image.clone(),
            text: recipe.text.clone(),
            cooking_time: recipe.cooking_time,
            pub_date: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>> {
        let row = sqlx::query(&format!("SELECT {} FROM recipes r WHERE r.id = ?", RECIPE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get recipe by ID")?;

        Ok(row.as_ref().map(row_to_recipe))
    }

    async fn update(&self, id: i64, changes: &RecipeChanges) -> Result<Recipe> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear recipe tags")?;
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear recipe ingredients")?;

        write_associations(&mut tx, id, &changes.tag_ids, &changes.ingredients).await?;

        let result = sqlx::query(
            r#"
            UPDATE recipes SET
                name = COALESCE(?, name),
                image = COALESCE(?, image),
                text = COALESCE(?, text),
                cooking_time = COALESCE(?, cooking_time)
            WHERE id = ?
            "#,
        )
        .bind(changes.name.as_deref())
        .bind(changes.image.as_deref())
        .bind(changes.text.as_deref())
        .bind(changes.cooking_time)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update recipe")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("Recipe {} does not exist", id));
        }

        tx.commit().await.context("Failed to commit recipe update")?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("Recipe {} disappeared after update", id))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        // Join rows, favourites and cart entries cascade
        sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete recipe")?;

        Ok(())
    }

    async fn list(&self, filter: &RecipeFilter, params: &ListParams) -> Result<(Vec<Recipe>, i64)> {
        let mut count_query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) AS count FROM recipes r WHERE 1 = 1");
        push_filter(&mut count_query, filter);
        let total: i64 = count_query
            .build()
            .fetch_one(&self.pool)
            .await
            .context("Failed to count recipes")?
            .get("count");

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM recipes r WHERE 1 = 1", RECIPE_COLUMNS));
        push_filter(&mut query, filter);
        query.push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ");
        query.push_bind(params.limit());
        query.push(" OFFSET ");
        query.push_bind(params.offset());

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list recipes")?;

        Ok((rows.iter().map(row_to_recipe).collect(), total))
    }

    async fn list_by_author(&self, author_id: i64, limit: Option<i64>) -> Result<Vec<Recipe>> {
        // A negative LIMIT means no limit in SQLite
        let rows = sqlx::query(&format!(
            "SELECT {} FROM recipes r WHERE r.author_id = ? ORDER BY r.pub_date DESC, r.id DESC LIMIT ?",
            RECIPE_COLUMNS
        ))
        .bind(author_id)
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list recipes by author")?;

        Ok(rows.iter().map(row_to_recipe).collect())
    }

    async fn count_by_author(&self, author_id: i64) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM recipes WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count recipes by author")?;

        Ok(row.get("count"))
    }

    async fn shopping_list(&self, user_id: i64) -> Result<Vec<ShoppingListItem>> {
        let rows = sqlx::query(
            r#"
            SELECT i.name, i.measurement_unit, SUM(ri.amount) AS total
            FROM shopping_carts sc
            INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE sc.user_id = ?
            GROUP BY i.id, i.name, i.measurement_unit
            ORDER BY i.name, i.measurement_unit
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to build shopping list")?;

        Ok(rows
            .iter()
            .map(|row| ShoppingListItem {
                name: row.get("name"),
                measurement_unit: row.get("measurement_unit"),
                total: row.get("total"),
            })
            .collect())
    }
}

/// Insert tag associations and ingredient rows for a recipe
async fn write_associations(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    tag_ids: &[i64],
    ingredients: &[IngredientLine],
) -> Result<()> {
    for tag_id in tag_ids {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to attach tag {}", tag_id))?;
    }

    for line in ingredients {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (?, ?, ?)",
        )
        .bind(recipe_id)
        .bind(line.ingredient_id)
        .bind(line.amount)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to attach ingredient {}", line.ingredient_id))?;
    }

    Ok(())
}

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &RecipeFilter) {
    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ");
        query.push_bind(author);
    }

    if !filter.tags.is_empty() {
        query.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug IN (",
        );
        let mut separated = query.separated(", ");
        for slug in &filter.tags {
            separated.push_bind(slug.clone());
        }
        separated.push_unseparated("))");
    }

    if let Some(user_id) = filter.favorited_by {
        query.push(" AND EXISTS (SELECT 1 FROM favourites f WHERE f.recipe_id = r.id AND f.user_id = ");
        query.push_bind(user_id);
        query.push(")");
    }

    if let Some(user_id) = filter.in_cart_of {
        query.push(
            " AND EXISTS (SELECT 1 FROM shopping_carts sc WHERE sc.recipe_id = r.id AND sc.user_id = ",
        );
        query.push_bind(user_id);
        query.push(")");
    }
}

fn row_to_recipe(row: &sqlx::sqlite::SqliteRow) -> Recipe {
    Recipe {
        id: row.get("id"),
        author_id: row.get("author_id"),
        name: row.get("name"),
        image: row.get("image"),
        text: row.get("text"),
        cooking_time: row.get("cooking_time"),
        pub_date: row.get("pub_date"),
    }
}
