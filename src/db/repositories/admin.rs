//! Admin listing repository
//!
//! Executes the list queries assembled from `ModelAdmin` configurations.
//! SQL fragments come only from static configuration; every user-supplied
//! value is bound.

use crate::db::DbPool;
use crate::models::ListParams;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::sync::Arc;

/// A predicate group: the fragments are OR-ed, each contains exactly one `?`
/// which receives `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub predicates: Vec<&'static str>,
    pub value: String,
}

/// A fully described admin list query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    /// Column expressions, rendered as text
    pub columns: Vec<&'static str>,
    /// FROM clause, including joins
    pub from: &'static str,
    /// AND-ed predicate groups
    pub conditions: Vec<Condition>,
    pub order_by: &'static str,
}

/// Rows of rendered cells; `None` is a NULL cell
pub type ListingRows = Vec<Vec<Option<String>>>;

/// Admin repository trait
#[async_trait]
pub trait AdminRepository: Send + Sync {
    /// Run a listing, returning one page of rows and the total count
    async fn list(&self, query: &ListingQuery, params: &ListParams) -> Result<(ListingRows, i64)>;
}

/// SQLx-based admin repository implementation
pub struct SqlxAdminRepository {
    pool: DbPool,
}

impl SqlxAdminRepository {
    /// Create a new SQLx admin repository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn AdminRepository> {
        Arc::new(Self::new(pool))
    }
}

fn push_conditions(builder: &mut QueryBuilder<'_, Sqlite>, conditions: &[Condition]) {
    for condition in conditions {
        builder.push(" AND (");
        for (i, predicate) in condition.predicates.iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            let (head, tail) = predicate.split_once('?').unwrap_or((*predicate, ""));
            builder.push(head);
            builder.push_bind(condition.value.clone());
            builder.push(tail);
        }
        builder.push(")");
    }
}

#[async_trait]
impl AdminRepository for SqlxAdminRepository {
    async fn list(&self, query: &ListingQuery, params: &ListParams) -> Result<(ListingRows, i64)> {
        let mut count: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT COUNT(*) AS count FROM {} WHERE 1 = 1", query.from));
        push_conditions(&mut count, &query.conditions);
        let total: i64 = count
            .build()
            .fetch_one(&self.pool)
            .await
            .context("Failed to count admin listing")?
            .get("count");

        let columns = query
            .columns
            .iter()
            .map(|expr| format!("CAST({} AS TEXT)", expr))
            .collect::<Vec<_>>()
            .join(", ");
        let mut select: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM {} WHERE 1 = 1", columns, query.from));
        push_conditions(&mut select, &query.conditions);
        select.push(format!(" ORDER BY {} LIMIT ", query.order_by));
        select.push_bind(params.limit());
        select.push(" OFFSET ");
        select.push_bind(params.offset());

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to run admin listing")?;

        let mut cells = Vec::with_capacity(rows.len());
        for row in rows {
            let mut rendered = Vec::with_capacity(query.columns.len());
            for i in 0..query.columns.len() {
                rendered.push(row.try_get::<Option<String>, _>(i)?);
            }
            cells.push(rendered);
        }

        Ok((cells, total))
    }
}
