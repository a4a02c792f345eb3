// stockroom_server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use stockroom::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  /// Malformed request: unparsable body, query or path.
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error(transparent)]
  Ledger(#[from] LedgerError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  /// Machine-readable error kind reported alongside the message.
  pub fn kind(&self) -> &'static str {
    match self {
      AppError::Validation(_) => "validation",
      AppError::Auth(_) => "auth",
      AppError::Config(_) => "config",
      AppError::Ledger(err) => err.kind(),
      AppError::Internal(_) => "internal",
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::Ledger(err) => match err {
        LedgerError::Validation { .. } => StatusCode::BAD_REQUEST,
        LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
        LedgerError::InvalidState(_) | LedgerError::Conflict(_) => StatusCode::CONFLICT,
        LedgerError::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::Timeout(_) | LedgerError::Storage { .. } => StatusCode::SERVICE_UNAVAILABLE,
      },
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Request rejected");
    }

    let body = match self {
      AppError::Ledger(LedgerError::InsufficientStock {
        item_id,
        requested,
        available,
      }) => json!({
        "error": self.to_string(),
        "kind": self.kind(),
        "item_id": item_id,
        "requested": requested,
        "available": available,
      }),
      AppError::Ledger(LedgerError::Validation { field, message }) => json!({
        "error": self.to_string(),
        "kind": self.kind(),
        "field": field,
        "detail": message,
      }),
      // Storage sources may carry connection details; keep them in the logs.
      AppError::Ledger(LedgerError::Storage { .. }) => json!({
        "error": "Storage is temporarily unavailable",
        "kind": self.kind(),
      }),
      AppError::Config(_) | AppError::Internal(_) => json!({
        "error": "An internal error occurred",
        "kind": self.kind(),
      }),
      _ => json!({ "error": self.to_string(), "kind": self.kind() }),
    };
    HttpResponse::build(status).json(body)
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;
