use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::{OrderId, TransitionError, ValidationError};
use crate::services::backend::BackendError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("service unavailable, please try again: {0}")]
    Transport(String),

    #[error("could not start payment: {reason}")]
    PaymentSetup { order_id: OrderId, reason: String },

    #[error("payment callback is missing {0}")]
    MissingCallbackParameter(&'static str),

    #[error("payment was not approved: {0}")]
    ApprovalRejected(String),

    #[error("reservation was not accepted: {0}")]
    ReservationRejected(String),

    #[error("this request is already being processed")]
    DuplicateSubmission,

    #[error("superseded by a newer request")]
    Superseded,

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Transport(err.to_string())
    }
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Transport(_) => "transport",
            AppError::PaymentSetup { .. } => "payment_setup",
            AppError::MissingCallbackParameter(_) => "missing_callback_parameter",
            AppError::ApprovalRejected(_) => "approval_rejected",
            AppError::ReservationRejected(_) => "reservation_rejected",
            AppError::DuplicateSubmission => "duplicate_submission",
            AppError::Superseded => "superseded",
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::NotFound(_) => "not_found",
            AppError::Database(_) => "database",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MissingCallbackParameter(_) => StatusCode::BAD_REQUEST,
            AppError::Transport(_) => StatusCode::BAD_GATEWAY,
            AppError::PaymentSetup { .. } => StatusCode::BAD_GATEWAY,
            AppError::ApprovalRejected(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::ReservationRejected(_) => StatusCode::CONFLICT,
            AppError::DuplicateSubmission => StatusCode::CONFLICT,
            AppError::Superseded => StatusCode::CONFLICT,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "request failed");
        }

        let mut body = serde_json::json!({ "error": self.to_string(), "kind": self.kind() });
        if let AppError::PaymentSetup { order_id, .. } = &self {
            // the same order may be retried, no charge was made
            body["order_id"] = serde_json::json!(order_id);
        }
        (status, axum::Json(body)).into_response()
    }
}
