// core/src/error.rs
use std::time::Duration;

use anyhow::Error as AnyhowError;
use thiserror::Error;

use crate::model::ItemId;

#[derive(Debug, Error)]
pub enum LedgerError {
  /// Caller-supplied input violates a field constraint.
  #[error("Validation failed for '{field}': {message}")]
  Validation { field: &'static str, message: String },

  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: String },

  /// The cart (or item) is in a state that forbids the operation.
  #[error("Invalid state: {0}")]
  InvalidState(String),

  #[error("Insufficient stock for item {item_id}: requested {requested}, available {available}")]
  InsufficientStock {
    item_id: ItemId,
    requested: i32,
    available: i32,
  },

  /// Deletion blocked by existing references.
  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Operation timed out after {0:?}")]
  Timeout(Duration),

  #[error("Storage failure: {source}")]
  Storage {
    #[source]
    source: AnyhowError,
  },
}

impl LedgerError {
  pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
    LedgerError::Validation {
      field,
      message: message.into(),
    }
  }

  pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
    LedgerError::NotFound {
      entity,
      id: id.to_string(),
    }
  }

  pub fn storage(source: impl Into<AnyhowError>) -> Self {
    LedgerError::Storage { source: source.into() }
  }

  /// Infrastructure failures may succeed on a later attempt; domain
  /// rejections never will.
  pub fn is_retryable(&self) -> bool {
    matches!(self, LedgerError::Storage { .. } | LedgerError::Timeout(_))
  }

  /// Stable machine-readable name of the variant.
  pub fn kind(&self) -> &'static str {
    match self {
      LedgerError::Validation { .. } => "validation",
      LedgerError::NotFound { .. } => "not_found",
      LedgerError::InvalidState(_) => "invalid_state",
      LedgerError::InsufficientStock { .. } => "insufficient_stock",
      LedgerError::Conflict(_) => "conflict",
      LedgerError::Timeout(_) => "timeout",
      LedgerError::Storage { .. } => "storage",
    }
  }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for LedgerError {
  fn from(err: sqlx::Error) -> Self {
    match err {
      sqlx::Error::RowNotFound => LedgerError::not_found("row", "query returned no rows"),
      other => LedgerError::storage(other),
    }
  }
}

pub type LedgerResult<T, E = LedgerError> = std::result::Result<T, E>;
