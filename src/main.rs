// src/main.rs

use std::{net::SocketAddr, sync::Arc, time::Duration};

use dating_assessment::{
    config::{Config, SESSION_SWEEP_INTERVAL},
    routes,
    state::AppState,
    store::{Backend, BucketPolicy, BucketStatus, BlobStore, local::LocalBlobStore, postgres::PgStore},
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (.env included); nothing starts without it
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to connect to database after 5 retries: {}", e);
                    return Err(e.into());
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied successfully.");

    let records = Arc::new(PgStore::new(pool));
    let blobs = Arc::new(LocalBlobStore::new(config.storage_root.clone(), config.photo_bucket.clone()));

    // Make sure uploads have somewhere to go; the admin endpoint can retry later
    match blobs
        .ensure_bucket(&BucketPolicy::photos(config.photo_bucket.clone()))
        .await
    {
        Ok(BucketStatus::Created) => tracing::info!("Created bucket {}", config.photo_bucket),
        Ok(BucketStatus::AlreadyExists) => {}
        Err(e) => tracing::error!("Failed to prepare bucket {}: {:?}", config.photo_bucket, e),
    }

    let backend = Backend::new(records.clone(), records, blobs);
    let state = AppState::new(backend, config.clone());

    // Drop abandoned assessments and their previews in the background
    state
        .sessions
        .spawn_sweeper(config.session_ttl, SESSION_SWEEP_INTERVAL);

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start the server
    axum::serve(listener, app).await?;
    Ok(())
}
