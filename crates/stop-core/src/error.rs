//! Error types for `stop-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The URI matched none of the registered table patterns.
  #[error("unknown URI {0}")]
  UnknownUri(String),

  #[error("invalid URI {uri:?}: {reason}")]
  InvalidUri { uri: String, reason: String },

  #[error("unknown column {column:?} for table {table}")]
  UnknownColumn { table: &'static str, column: String },

  #[error("column {column:?} of table {table} is assigned by the store")]
  ReadOnlyColumn { table: &'static str, column: String },

  #[error("no values supplied for update of {0}")]
  EmptyValues(String),

  #[error("invalid sort order: {0}")]
  InvalidSortOrder(String),

  /// Inserts address a collection; an item URI cannot receive one.
  #[error("cannot insert into item URI {0}")]
  ItemScopeNotAllowed(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// Coarse classification of a store failure, independent of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
  /// The resource address did not resolve to a table.
  Routing,
  /// The request was well-addressed but malformed (bad column, bad sort).
  InvalidRequest,
  /// The engine rejected an insert; the table is unchanged.
  Insert,
  /// Any other engine-level failure, propagated unmodified.
  Engine,
}

/// Implemented by backend error types so transports can map failures without
/// depending on a concrete backend.
pub trait StoreFailure {
  fn kind(&self) -> FailureKind;
}

impl StoreFailure for Error {
  fn kind(&self) -> FailureKind {
    match self {
      Error::UnknownUri(_) | Error::ItemScopeNotAllowed(_) => FailureKind::Routing,
      Error::InvalidUri { .. }
      | Error::UnknownColumn { .. }
      | Error::ReadOnlyColumn { .. }
      | Error::EmptyValues(_)
      | Error::InvalidSortOrder(_) => FailureKind::InvalidRequest,
    }
  }
}
