//! Gatehouse - Main Entry Point

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatehouse_backend::{
    api,
    config::{Config, SeedSpec},
    db,
    error::Result,
    services::seed_service::SeedService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatehouse_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Starting Gatehouse");

    // Connect to database
    let db_pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Connected to database");

    // Run migrations
    db::run_migrations(&db_pool).await?;
    tracing::info!("Database migrations complete");

    // Seed permissions and roles before accepting traffic. A broken seed
    // spec aborts startup here, with nothing partially committed.
    let seed = match &config.seed_file {
        Some(path) => {
            tracing::info!(path = %path, "Loading seed spec");
            SeedSpec::from_file(path)?
        }
        None => SeedSpec::builtin(),
    };
    SeedService::new(db_pool.clone()).seed(&seed).await?;

    // Build router
    let state = Arc::new(api::AppState::new(config.clone(), db_pool, seed));
    let app = api::routes::create_router(state);

    // Start server
    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
