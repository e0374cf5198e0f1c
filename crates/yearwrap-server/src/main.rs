mod api;
mod middleware;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use yearwrap_db::PgResultStore;
use yearwrap_ingest::{FetchPipeline, GatewayConfig, GatewaySource, ProgressStore};

use crate::api::{build_app, default_rate_limit_state, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = yearwrap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = yearwrap_db::PoolConfig::from_app_config(&config);
    let pool = yearwrap_db::connect_pool(&config.database_url, pool_config).await?;
    yearwrap_db::run_migrations(&pool).await?;

    let progress = ProgressStore::new(Duration::from_millis(config.progress_grace_ms));
    let source = GatewaySource::new(GatewayConfig::from_app_config(&config))?;
    tracing::info!(
        gateway = %config.gateway_url,
        strategy = %config.query_strategy,
        post_cap = config.post_cap,
        "post source configured"
    );

    let pipeline = Arc::new(FetchPipeline::new(
        source,
        PgResultStore::new(pool.clone()),
        progress.clone(),
        config.post_cap,
    ));
    let app = build_app(AppState { pool, pipeline }, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "yearwrap-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    progress.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
