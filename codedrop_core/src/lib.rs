//! Core library for the code-gated file-transfer server: path confinement,
//! one-time codes, upload tokens and the HTTP handlers built on them.

pub mod auth;
pub mod config;
pub mod error;
pub mod files;
pub mod handlers;
pub mod middleware;

pub use auth::{spawn_sweeper, CodeStore, MemoryTokenStore, Redemption, TokenStore};
pub use config::AppConfig;
pub use error::{AppError, Result};
pub use files::PathConfiner;
pub use handlers::create_routes;

use axum::Router;
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::services::ServeDir;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub confiner: Arc<PathConfiner>,
    pub codes: CodeStore,
    pub tokens: Arc<dyn TokenStore>,
    pub token_ttl: Duration,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let confiner = PathConfiner::new(&config.storage.root_dir)?;

        Ok(Self {
            app_name: "codedrop".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            confiner: Arc::new(confiner),
            codes: CodeStore::from_config(&config.codes),
            tokens: Arc::new(MemoryTokenStore::new()),
            token_ttl: config.tokens.ttl(),
            static_dir: config.storage.static_dir.clone(),
        })
    }

    pub fn with_token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }
}

/// API routes plus the static front-end as fallback.
pub fn create_app(state: AppState) -> Router {
    let assets = ServeDir::new(&state.static_dir);

    Router::new()
        .merge(create_routes())
        .fallback_service(assets)
        .layer(middleware::logging_layer())
        .with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
