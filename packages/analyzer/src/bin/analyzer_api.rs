use std::sync::Arc;

use papersift_analyzer::api::{self, AppState};
use papersift_analyzer::{Analyzer, AnalyzerConfig, ServerConfig};
use papersift_fetcher::{ArxivFetcher, FetcherConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real deployments set the environment.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (analyzer_config, server_config) =
        match AnalyzerConfig::from_env().and_then(|a| Ok((a, ServerConfig::from_env()?))) {
            Ok(configs) => configs,
            Err(e) => {
                tracing::error!(error = %e, "failed to load configuration");
                std::process::exit(1);
            }
        };
    tracing::info!(config = ?analyzer_config, "loaded analyzer configuration");

    let analyzer = match Analyzer::from_config(analyzer_config) {
        Ok(analyzer) => analyzer,
        Err(e) => {
            tracing::error!(error = %e, "failed to create analyzer");
            std::process::exit(1);
        }
    };

    let fetcher = match ArxivFetcher::new(FetcherConfig::from_env()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            tracing::error!(error = %e, "failed to create fetcher");
            std::process::exit(1);
        }
    };

    let app = api::router(AppState {
        analyzer: Arc::new(analyzer),
        fetcher: Arc::new(fetcher),
    });

    let listener = match tokio::net::TcpListener::bind(server_config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %server_config.bind_addr, "failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!("listening on {}", server_config.bind_addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown handler");
        return;
    }
    tracing::info!("shutting down");
}
