//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use formwork_core::{Error as DomainError, StoreError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error by the domain error it carries. Anything
  /// without one is a storage fault.
  pub fn store<E: StoreError>(err: E) -> Self {
    let classified = err.domain().and_then(|domain| {
      let message = domain.to_string();
      if domain.is_not_found() {
        return Some(Self::NotFound(message));
      }
      if domain.is_protected() {
        return Some(Self::Forbidden(message));
      }
      match domain {
        DomainError::Duplicate(_) => Some(Self::Conflict(message)),
        DomainError::InvalidFieldName(..)
        | DomainError::InvalidRecordTypeName(_)
        | DomainError::ConstraintViolation(_)
        | DomainError::Serialization(_) => Some(Self::BadRequest(message)),
        _ => None,
      }
    });
    classified.unwrap_or_else(|| {
      tracing::error!(error = %err, "storage fault");
      Self::Store(Box::new(err))
    })
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
