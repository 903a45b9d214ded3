//! Database layer
//!
//! SQLite storage for the Foodgram service: the connection pool, embedded
//! migrations, and one repository per entity.
//!
//! # Usage
//!
//! ```ignore
//! use foodgram::config::DatabaseConfig;
//! use foodgram::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, ping, DbPool};

/// Whether an error (possibly wrapped in context) is a unique-constraint violation.
///
/// Storage constraints are the backstop for concurrent duplicate inserts, so
/// services translate these into the same validation error as their own checks.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_unique_violation())
            .unwrap_or(false)
    })
}

/// Whether an error (possibly wrapped in context) is a foreign-key violation.
pub fn is_foreign_key_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_foreign_key_violation())
            .unwrap_or(false)
    })
}
