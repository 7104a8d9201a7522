//! # Wallet Routes
//!
//! Connect control of the page: connect a burner or keypair-file wallet,
//! or disconnect the current one.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::post,
    Router,
};
use tracing::info;
use uuid::Uuid;

use crate::error::DappError;
use crate::server::AppState;
use crate::state_structs::{ConnectWalletRequest, PageResponse};
use crate::wallet;

/// Connect a wallet to a page
///
/// # Route
/// - **Method**: POST
/// - **Path**: `/api/v1/pages/{page_id}/wallet/connect`
/// - **Body**: `{ "wallet": "burner" | "keypair" }`
pub async fn connect_wallet(
    State(state): State<AppState>,
    Path(page_id): Path<Uuid>,
    Json(request): Json<ConnectWalletRequest>,
) -> Result<Json<PageResponse>, DappError> {
    let page = state.pages.get(page_id)?;
    let wallet = wallet::connect(request.wallet, &state.config.wallet_keypair_path)?;
    page.connect_wallet(wallet);
    Ok(Json(PageResponse::from(page.as_ref())))
}

/// Disconnect the page's wallet
pub async fn disconnect_wallet(
    State(state): State<AppState>,
    Path(page_id): Path<Uuid>,
) -> Result<Json<PageResponse>, DappError> {
    let page = state.pages.get(page_id)?;
    page.disconnect_wallet();
    info!("Wallet disconnected from page {}", page_id);
    Ok(Json(PageResponse::from(page.as_ref())))
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/pages/{page_id}/wallet/connect", post(connect_wallet))
        .route("/api/v1/pages/{page_id}/wallet/disconnect", post(disconnect_wallet))
}
