//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use stop_core::{FailureKind, StoreFailure};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The engine refused an insert.
  #[error("rejected: {0}")]
  Rejected(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a backend error by its [`FailureKind`].
  pub fn from_store<E>(e: E) -> Self
  where
    E: std::error::Error + StoreFailure + Send + Sync + 'static,
  {
    match e.kind() {
      FailureKind::Routing => ApiError::NotFound(e.to_string()),
      FailureKind::InvalidRequest => ApiError::BadRequest(e.to_string()),
      FailureKind::Insert => ApiError::Rejected(e.to_string()),
      FailureKind::Engine => ApiError::Store(Box::new(e)),
    }
  }
}

impl From<stop_core::Error> for ApiError {
  fn from(e: stop_core::Error) -> Self { ApiError::from_store(e) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Rejected(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
