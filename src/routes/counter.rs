//! # Counter Routes
//!
//! The four counter buttons. Each endpoint runs one operation through the
//! dispatcher and answers with the resulting label text.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use uuid::Uuid;

use crate::error::DappError;
use crate::onchain_instance::instance::Operation;
use crate::server::AppState;
use crate::services::counter_dispatcher::{Outcome, Stage};
use crate::services::{OperationReport, dispatch};
use crate::state_structs::SetValueRequest;

type CounterResponse = Result<(StatusCode, Json<OperationReport>), DappError>;

fn status_for(report: &OperationReport) -> StatusCode {
    match (report.outcome, report.stage) {
        (Outcome::Rendered | Outcome::Validation, _) => StatusCode::OK,
        (Outcome::Error, Some(Stage::EnsuringSession)) => StatusCode::PRECONDITION_FAILED,
        (Outcome::Error, Some(Stage::Invoking | Stage::Refetching)) => StatusCode::BAD_GATEWAY,
        (Outcome::Error, _) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn run(
    state: &AppState,
    page_id: Uuid,
    operation: Operation,
    input: Option<&str>,
) -> CounterResponse {
    let page = state.pages.get(page_id)?;
    let report = dispatch(&page, &state.env, operation, input).await;
    Ok((status_for(&report), Json(report)))
}

/// POST `/api/v1/pages/{page_id}/counter/initialize`
pub async fn initialize(State(state): State<AppState>, Path(page_id): Path<Uuid>) -> CounterResponse {
    run(&state, page_id, Operation::Initialize, None).await
}

/// POST `/api/v1/pages/{page_id}/counter/increment`
pub async fn increment(State(state): State<AppState>, Path(page_id): Path<Uuid>) -> CounterResponse {
    run(&state, page_id, Operation::Increment, None).await
}

/// POST `/api/v1/pages/{page_id}/counter/decrement`
pub async fn decrement(State(state): State<AppState>, Path(page_id): Path<Uuid>) -> CounterResponse {
    run(&state, page_id, Operation::Decrement, None).await
}

/// POST `/api/v1/pages/{page_id}/counter/set` with `{ "value": "<text>" }`
pub async fn set_value(
    State(state): State<AppState>,
    Path(page_id): Path<Uuid>,
    Json(request): Json<SetValueRequest>,
) -> CounterResponse {
    run(&state, page_id, Operation::Set, request.value.as_deref()).await
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/pages/{page_id}/counter/initialize", post(initialize))
        .route("/api/v1/pages/{page_id}/counter/increment", post(increment))
        .route("/api/v1/pages/{page_id}/counter/decrement", post(decrement))
        .route("/api/v1/pages/{page_id}/counter/set", post(set_value))
}
