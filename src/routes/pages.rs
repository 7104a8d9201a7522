//! # Page Routes
//!
//! Page lifecycle: every page load opens a context with a fresh counter
//! identity, and the page closes it again on unload.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use tracing::info;
use uuid::Uuid;

use crate::error::DappError;
use crate::server::AppState;
use crate::state_structs::PageResponse;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Serves the counter page
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Open a page context
///
/// # Route
/// - **Method**: POST
/// - **Path**: `/api/v1/pages`
pub async fn open_page(State(state): State<AppState>) -> (StatusCode, Json<PageResponse>) {
    let page = state.pages.open();
    info!("Opened page {} ({} live)", page.id(), state.pages.len());
    (StatusCode::CREATED, Json(PageResponse::from(page.as_ref())))
}

/// Current page state: counter address, wallet and label
pub async fn get_page(
    State(state): State<AppState>,
    Path(page_id): Path<Uuid>,
) -> Result<Json<PageResponse>, DappError> {
    let page = state.pages.get(page_id)?;
    Ok(Json(PageResponse::from(page.as_ref())))
}

/// Drop a page context
pub async fn close_page(
    State(state): State<AppState>,
    Path(page_id): Path<Uuid>,
) -> Result<StatusCode, DappError> {
    state.pages.close(page_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/api/v1/pages", post(open_page))
        .route("/api/v1/pages/{page_id}", get(get_page).delete(close_page))
}
