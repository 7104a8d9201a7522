//! # Error Module
//!
//! Error taxonomy shared by the wallet layer, the on-chain program handle and
//! the operation dispatcher, plus its mapping onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::onchain_instance::instance::Operation;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DappError {
    /// No wallet is connected, so no session handle can be built.
    #[error("Provider is null: connect a wallet first")]
    SessionMissing,

    /// Rejected user input. Shown in the output label, never logged as a failure.
    #[error("{0}")]
    Validation(String),

    #[error("Transaction error while calling `{operation}`: {message}")]
    RemoteInvocation { operation: Operation, message: String },

    #[error("Failed to fetch counter account: {message}")]
    RemoteFetch { message: String },

    #[error("Invalid program interface description: {0}")]
    InterfaceDescription(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Page {0} not found")]
    PageNotFound(Uuid),
}

impl DappError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DappError::SessionMissing => StatusCode::PRECONDITION_FAILED,
            DappError::Validation(_) => StatusCode::BAD_REQUEST,
            DappError::RemoteInvocation { .. } | DappError::RemoteFetch { .. } => {
                StatusCode::BAD_GATEWAY
            }
            DappError::InterfaceDescription(_) | DappError::Wallet(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            DappError::PageNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for DappError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(DappError::SessionMissing.status_code(), StatusCode::PRECONDITION_FAILED);
        assert_eq!(
            DappError::RemoteFetch { message: "timeout".into() }.status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(DappError::PageNotFound(Uuid::nil()).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invocation_message_names_operation() {
        let err = DappError::RemoteInvocation {
            operation: Operation::Increment,
            message: "blockhash not found".into(),
        };
        assert_eq!(
            err.to_string(),
            "Transaction error while calling `increment`: blockhash not found"
        );
    }
}
