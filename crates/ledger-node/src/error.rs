use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ledger_core::LedgerError;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid transaction data")]
    InvalidTransaction,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("mining task failed: {0}")]
    MiningTask(#[from] JoinError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidTransaction => StatusCode::BAD_REQUEST,
            ApiError::Ledger(
                LedgerError::InvalidLinkage { .. } | LedgerError::InvalidIndex { .. },
            ) => StatusCode::CONFLICT,
            ApiError::Ledger(LedgerError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Ledger(_) | ApiError::MiningTask(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
