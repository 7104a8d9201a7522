//! # Server Module
//!
//! HTTP server setup and route configuration for the counter page.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, http::HeaderValue, routing::get};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::config::Config;
use crate::onchain_instance::{connection::RpcConnector, idl::ProgramInterface};
use crate::routes::{self, health::ping};
use crate::services::{CounterEnv, PageRegistry};

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub pages: Arc<PageRegistry>,
    pub env: Arc<CounterEnv>,
    pub config: Arc<Config>,
}

/// Loads the interface description from `IDL_PATH`, or the bundled one.
fn load_interface(config: &Config) -> Result<ProgramInterface> {
    let interface = match &config.idl_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read IDL from {}", path))?;
            ProgramInterface::from_json(&json)?
        }
        None => ProgramInterface::bundled()?,
    };
    Ok(interface)
}

/// Builds the application router with all routes and the CORS layer.
pub fn build_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .server
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    Router::new()
        .route("/ping", get(ping)) // Health check endpoint
        .merge(routes::pages::create_routes())
        .merge(routes::wallet::create_routes())
        .merge(routes::counter::create_routes())
        .layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(origins)
                    .allow_methods([
                        axum::http::Method::GET,
                        axum::http::Method::POST,
                        axum::http::Method::DELETE,
                        axum::http::Method::OPTIONS,
                    ])
                    .allow_headers([
                        axum::http::header::ORIGIN,
                        axum::http::header::CONTENT_TYPE,
                        axum::http::header::ACCEPT,
                    ]),
            ),
        )
        .with_state(state)
}

/// Starts the counter page server.
///
/// Loads the program interface description, wires the RPC connector for the
/// configured cluster and serves until the process is terminated.
pub async fn start(config: Config) -> Result<()> {
    let interface = load_interface(&config)?;
    let env = CounterEnv::new(
        interface,
        Arc::new(RpcConnector),
        config.rpc_url().to_string(),
        config.commitment,
    )?;
    let program_address = env.program_address;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let pages = Arc::new(PageRegistry::with_limit(config.pages.max_pages));
    let _sweeper = pages.spawn_sweeper(config.pages);
    let state = AppState {
        pages,
        env: Arc::new(env),
        config: Arc::new(config),
    };
    let cluster_url = state.config.rpc_url().to_string();
    let commitment = state.config.commitment.commitment;
    let page_limits = state.config.pages;
    let app = build_router(state);

    // Create a TCP listener bound to the specified address
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {} - port may already be in use", addr))?;

    tracing::info!("🚀 Counter page server starting...");
    tracing::info!("📡 Listening on http://{}", addr);
    tracing::info!("🏥 Health check available at http://{}/ping", addr);
    tracing::info!("🌐 Cluster: {} ({:?})", cluster_url, commitment);
    tracing::info!("📜 Counter program: {}", program_address);
    tracing::info!(
        "🧹 Idle pages expire after {}s (max {} pages)",
        page_limits.idle_timeout_secs,
        page_limits.max_pages
    );

    axum::serve(listener, app).await.context("Server error")
}
