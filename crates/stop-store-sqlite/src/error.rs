//! Error type for `stop-store-sqlite`.

use stop_core::{FailureKind, StoreFailure};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] stop_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// The engine rejected the insert or produced no usable id. The table is
  /// unchanged.
  #[error("failed to insert row into {uri}: {reason}")]
  Insert { uri: String, reason: String },
}

impl Error {
  /// The engine handle has been closed.
  pub fn is_closed(&self) -> bool {
    matches!(self, Error::Database(tokio_rusqlite::Error::ConnectionClosed))
  }
}

impl StoreFailure for Error {
  fn kind(&self) -> FailureKind {
    match self {
      Error::Core(e) => e.kind(),
      Error::Database(tokio_rusqlite::Error::Rusqlite(e)) if is_caller_error(e) => {
        FailureKind::InvalidRequest
      }
      Error::Database(_) => FailureKind::Engine,
      Error::Insert { .. } => FailureKind::Insert,
    }
  }
}

/// Errors caused by the caller's selection or arguments rather than by the
/// engine: parameter mismatches, and SQL that fails to prepare.
fn is_caller_error(e: &rusqlite::Error) -> bool {
  match e {
    rusqlite::Error::InvalidParameterCount(..)
    | rusqlite::Error::InvalidParameterName(_)
    | rusqlite::Error::InvalidColumnName(_) => true,
    rusqlite::Error::SqliteFailure(err, _) => err.code == rusqlite::ErrorCode::Unknown,
    _ => false,
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
