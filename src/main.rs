use anyhow::Context;
use oxidesk_routing::bootstrap;
use oxidesk_routing::config::{Config, SettingsHandle};
use oxidesk_routing::infrastructure::http::router::build_router;
use oxidesk_routing::infrastructure::observability;
use oxidesk_routing::infrastructure::persistence::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("invalid configuration")?;

    // Initialize tracing and metrics
    let _guard = observability::init(&config)
        .map_err(|e| anyhow::anyhow!("failed to initialise observability: {}", e))?;
    tracing::info!("Configuration loaded: {:?}", config.routing);

    // Initialize database connection
    let db = Database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    tracing::info!("Database connection established");

    // Run migrations
    db.run_migrations()
        .await
        .context("failed to run migrations")?;
    tracing::info!("Database migrations applied");

    // Build application state (and start background services)
    let settings = SettingsHandle::new(config.routing.clone());
    let state = bootstrap::build_app_state(db, settings)
        .await
        .map_err(|e| anyhow::anyhow!("failed to build application state: {}", e))?;

    // Build router
    let app = build_router(state);

    // Start server
    let addr = config.server_address();
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
