use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, ProfilerTask};
use moonlight_core::config::{
    data_dir_from_env_value, interval_from_env_value, page_size_from_env_value,
    utc_offset_from_env_value,
};
use moonlight_core::constants::DEFAULT_PROFILE_INTERVAL_SECS;
use moonlight_core::{CoreConfig, Profiler, Services};

/// Main entry point for the moonlight service
///
/// Loads configuration, opens the collection files, then serves the REST API
/// until interrupted. The request profiler is flushed on a fixed interval and
/// once more on shutdown.
///
/// # Environment Variables
/// - `MOONLIGHT_REST_ADDR`: REST server address (default: "0.0.0.0:8080")
/// - `MOONLIGHT_DATA_DIR`: Directory holding `<collection>.json` files (default: "hospital_data")
/// - `MOONLIGHT_UTC_OFFSET`: Operating timezone (default: "+09:00")
/// - `MOONLIGHT_PAGE_SIZE`: Hospitals per search page (default: 15)
/// - `MOONLIGHT_PROFILE_INTERVAL_SECS`: Seconds between profiling summaries (default: 3600)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - any environment value is malformed or the data directory is missing,
/// - a collection file cannot be loaded,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("moonlight=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr =
        std::env::var("MOONLIGHT_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());
    let data_dir = data_dir_from_env_value(std::env::var("MOONLIGHT_DATA_DIR").ok())?;
    let offset = utc_offset_from_env_value(std::env::var("MOONLIGHT_UTC_OFFSET").ok())?;
    let page_size = page_size_from_env_value(std::env::var("MOONLIGHT_PAGE_SIZE").ok())?;
    let profile_every = interval_from_env_value(
        std::env::var("MOONLIGHT_PROFILE_INTERVAL_SECS").ok(),
        DEFAULT_PROFILE_INTERVAL_SECS,
    )?;

    let cfg = Arc::new(CoreConfig::new(data_dir, offset, page_size)?);
    let profiler = Arc::new(Profiler::new());
    let services = Services::open(cfg, profiler.clone())?;

    let app = api_rest::router(AppState { services });
    let profiler_task = ProfilerTask::start(profiler, profile_every);

    tracing::info!("++ Starting moonlight REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    profiler_task.stop().await;
    tracing::info!("-- moonlight stopped");
    served?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("-- shutdown requested");
}
