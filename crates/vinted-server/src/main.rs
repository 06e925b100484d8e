mod api;
mod middleware;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use vinted_cache::{Orchestrator, OrchestratorConfig, PgStore};
use vinted_scraper::{ClientConfig, VintedClient};

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = vinted_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting vinted-server");

    let pool_config = vinted_db::PoolConfig::from_app_config(&config);
    let pool = vinted_db::connect_pool(&config.database_url, pool_config).await?;
    vinted_db::run_migrations(&pool).await?;

    let store = Arc::new(PgStore::new(pool));
    let client = VintedClient::new(ClientConfig::from_app_config(&config))?;
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(client),
        Arc::clone(&store) as Arc<dyn vinted_cache::ItemStore>,
        OrchestratorConfig::from_app_config(&config),
    ));

    let app = build_app(AppState {
        orchestrator: Arc::clone(&orchestrator),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    orchestrator.shutdown().await;
    store.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
