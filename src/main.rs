//! Foodgram - recipe sharing backend

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foodgram::{
    api::{self, AppState},
    config::Config,
    db,
};

/// How often expired sessions are swept
const SESSION_PURGE_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodgram=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Foodgram...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    db::ping(&pool).await?;
    tracing::info!("Database connected: {}", config.database.url);

    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!(applied, "Database migrations completed");

    tokio::fs::create_dir_all(&config.media.root).await?;

    let state = AppState::new(pool, &config);

    if let Some(admin) = &config.admin {
        state.user_service.ensure_admin(admin).await?;
    }

    // Sweep expired sessions in the background
    {
        let users = state.user_service.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(SESSION_PURGE_INTERVAL_SECS));
            loop {
                interval.tick().await;
                match users.purge_expired_sessions().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::info!(removed, "Expired sessions purged"),
                    Err(e) => tracing::warn!(error = %e, "Session purge failed"),
                }
            }
        });
    }

    let app = api::build_router(state, &config);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
