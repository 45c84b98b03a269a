//! The `ResourceStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `stop-store-sqlite`).
//! Transports such as `stop-api` depend on this abstraction, not on any
//! concrete backend.

use std::{fmt, future::Future, str::FromStr};

use crate::{
  authority::Authority,
  error::StoreFailure,
  notify::Observer,
  uri::ResourceUri,
  value::{Record, Value, Values},
  Error, Result,
};

// ─── Predicate ───────────────────────────────────────────────────────────────

/// A selection condition plus its positional arguments.
///
/// `selection` is an SQL boolean expression over the table's columns, with
/// `?` (or `?N`) placeholders bound from `args` in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
  pub selection: String,
  pub args:      Vec<Value>,
}

impl Predicate {
  pub fn new(selection: impl Into<String>) -> Self {
    Self { selection: selection.into(), args: Vec::new() }
  }

  pub fn arg(mut self, value: impl Into<Value>) -> Self {
    self.args.push(value.into());
    self
  }
}

// ─── Sort order ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
  pub column:     String,
  pub descending: bool,
}

/// Ordered list of sort keys. Parsed from `"timestamp DESC, _id"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOrder(pub Vec<SortKey>);

impl SortOrder {
  pub fn asc(column: impl Into<String>) -> Self {
    Self(vec![SortKey { column: column.into(), descending: false }])
  }

  pub fn desc(column: impl Into<String>) -> Self {
    Self(vec![SortKey { column: column.into(), descending: true }])
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn keys(&self) -> &[SortKey] { &self.0 }
}

impl FromStr for SortOrder {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidSortOrder(s.to_owned());
    if s.trim().is_empty() {
      return Ok(Self::default());
    }
    s.split(',')
      .map(|term| {
        let mut words = term.split_whitespace();
        let column = words.next().ok_or_else(invalid)?;
        let descending = match words.next().map(str::to_ascii_lowercase).as_deref() {
          None | Some("asc") => false,
          Some("desc") => true,
          Some(_) => return Err(invalid()),
        };
        if words.next().is_some() {
          return Err(invalid());
        }
        Ok(SortKey { column: column.to_owned(), descending })
      })
      .collect::<Result<_>>()
      .map(Self)
  }
}

impl fmt::Display for SortOrder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, key) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      let dir = if key.descending { "DESC" } else { "ASC" };
      write!(f, "{} {dir}", key.column)?;
    }
    Ok(())
  }
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Parameters for [`ResourceStore::query`].
#[derive(Debug, Clone, Default)]
pub struct Query {
  /// Columns to return. `None` returns every column in schema order.
  /// Columns outside the table's schema are rejected.
  pub projection: Option<Vec<String>>,
  pub predicate:  Option<Predicate>,
  pub sort:       SortOrder,
}

impl Query {
  pub fn all() -> Self { Self::default() }

  pub fn project<I, S>(mut self, columns: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.projection = Some(columns.into_iter().map(Into::into).collect());
    self
  }

  pub fn filter(mut self, predicate: Predicate) -> Self {
    self.predicate = Some(predicate);
    self
  }

  pub fn sort(mut self, sort: SortOrder) -> Self {
    self.sort = sort;
    self
  }
}

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// The result of a query: the matching records plus a subscription on the
/// queried URI, so the caller can re-run the query when the data changes.
///
/// Records are a snapshot read in full when the query runs; iterating never
/// goes back to the engine and never sees later writes. Memory grows with the
/// result size, so narrow large tables with a predicate or projection.
///
/// The observer is registered before the read executes, so no change that
/// lands after the snapshot is missed.
#[derive(Debug)]
pub struct Cursor {
  notification_uri: ResourceUri,
  columns:          Vec<String>,
  records:          std::vec::IntoIter<Record>,
  observer:         Observer,
}

impl Cursor {
  pub fn new(columns: Vec<String>, records: Vec<Record>, observer: Observer) -> Self {
    Self {
      notification_uri: observer.watched().clone(),
      columns,
      records: records.into_iter(),
      observer,
    }
  }

  pub fn notification_uri(&self) -> &ResourceUri { &self.notification_uri }

  /// Projected column names, in projection order.
  pub fn columns(&self) -> &[String] { &self.columns }

  pub fn observer(&mut self) -> &mut Observer { &mut self.observer }

  pub fn into_observer(self) -> Observer { self.observer }
}

impl Iterator for Cursor {
  type Item = Record;

  fn next(&mut self) -> Option<Record> { self.records.next() }

  fn size_hint(&self) -> (usize, Option<usize>) { self.records.size_hint() }
}

impl ExactSizeIterator for Cursor {}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an addressed, transactional record store.
///
/// Every mutation is atomic and, once committed, publishes exactly one change
/// event keyed by the affected URI. Failed mutations publish nothing.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ResourceStore: Send + Sync {
  type Error: std::error::Error + StoreFailure + Send + Sync + 'static;

  /// The namespace every URI of this store lives under.
  fn authority(&self) -> &Authority;

  /// Read records under `uri`. Returns `None` when the engine is in a closed
  /// or otherwise invalid state.
  fn query<'a>(
    &'a self,
    uri: &'a ResourceUri,
    query: &'a Query,
  ) -> impl Future<Output = Result<Option<Cursor>, Self::Error>> + Send + 'a;

  /// Insert one record into the collection at `uri` and return its item URI.
  fn insert<'a>(
    &'a self,
    uri: &'a ResourceUri,
    values: Values,
  ) -> impl Future<Output = Result<ResourceUri, Self::Error>> + Send + 'a;

  /// Apply `values` to every row under `uri` matching `predicate`; returns
  /// the number of rows changed.
  fn update<'a>(
    &'a self,
    uri: &'a ResourceUri,
    values: Values,
    predicate: Option<Predicate>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Delete every row under `uri` matching `predicate`; returns the number of
  /// rows removed.
  fn delete<'a>(
    &'a self,
    uri: &'a ResourceUri,
    predicate: Option<Predicate>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// MIME-like content type of `uri`. Never touches the engine.
  fn describe_type(&self, uri: &ResourceUri) -> Result<&'static str, Self::Error>;

  /// Register an observer for changes under `uri`.
  fn subscribe(&self, uri: ResourceUri) -> Observer;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_sort_order() {
    let s: SortOrder = "timestamp DESC, _id".parse().unwrap();
    assert_eq!(s.keys().len(), 2);
    assert!(s.keys()[0].descending);
    assert_eq!(s.keys()[1].column, "_id");
    assert!(!s.keys()[1].descending);
    assert_eq!(s.to_string(), "timestamp DESC, _id ASC");
  }

  #[test]
  fn empty_sort_order_is_allowed() {
    assert!("".parse::<SortOrder>().unwrap().is_empty());
  }

  #[test]
  fn rejects_malformed_sort_order() {
    for bad in ["timestamp sideways", "timestamp desc extra", "timestamp,,_id"] {
      assert!(
        matches!(bad.parse::<SortOrder>(), Err(Error::InvalidSortOrder(_))),
        "{bad}"
      );
    }
  }
}
