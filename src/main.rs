//! # Counter dApp
//!
//! Browser front-end for a pre-deployed Anchor counter program, served by an
//! Axum/Tokio process that owns the wallet connection and the program handle.
//!
//! ## Features
//! - Connect a wallet (burner keypair or keypair file)
//! - Initialize, increment, decrement and set the page's counter account
//! - Structured logging with tracing
//!
//! ## Architecture
//! The server is organized into modules:
//! - `server`: Router setup and server start-up
//! - `config`: Environment variable configuration
//! - `wallet`: Wallet capabilities
//! - `onchain_instance`: Connection factory, interface description and program handle
//! - `services`: Page contexts and the operation dispatcher
//! - `routes`: HTTP route handlers
//!
//! ## Running the Server
//! Start a local validator with the counter program deployed, then:
//! ```bash
//! cargo run
//! ```
//!
//! The page is served on `http://127.0.0.1:3000` by default.

mod config;
mod error;
mod onchain_instance;
mod routes;
mod server;
mod services;
mod state_structs;
mod wallet;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Pick up a local .env before reading any configuration
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false) // Don't show module targets for cleaner output
                .compact(),
        )
        .init();

    tracing::info!("🏁 Starting counter page server...");
    tracing::info!("📦 Package: {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    tracing::info!("🏗️  Build profile: {}", if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    });

    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server::start(config).await {
        tracing::error!("Server stopped: {:#}", e);
        std::process::exit(1);
    }
}
