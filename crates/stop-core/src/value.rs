//! Column values, write sets, and read records.
//!
//! Values mirror SQLite's storage classes. They serialise to plain JSON
//! scalars (untagged) so that HTTP clients and sync agents can exchange
//! records without a wrapper format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ─── Value ───────────────────────────────────────────────────────────────────

/// A single column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  Null,
  Integer(i64),
  Real(f64),
  Text(String),
  Blob(Vec<u8>),
}

impl Value {
  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Value::Integer(i) => Some(*i),
      _ => None,
    }
  }

  /// Reals, and integers widened to reals (SQLite may hand back either for a
  /// `real` column holding a whole number).
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Value::Real(r) => Some(*r),
      Value::Integer(i) => Some(*i as f64),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::Text(s) => Some(s),
      _ => None,
    }
  }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self { Value::Integer(v) }
}

impl From<i32> for Value {
  fn from(v: i32) -> Self { Value::Integer(v.into()) }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self { Value::Real(v) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Value::Text(v.to_owned()) }
}

impl From<String> for Value {
  fn from(v: String) -> Self { Value::Text(v) }
}

impl From<Vec<u8>> for Value {
  fn from(v: Vec<u8>) -> Self { Value::Blob(v) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self { v.map_or(Value::Null, Into::into) }
}

// ─── Values ──────────────────────────────────────────────────────────────────

/// The column → value set supplied to an insert or update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(BTreeMap<String, Value>);

impl Values {
  pub fn new() -> Self { Self::default() }

  /// Builder-style [`Values::put`].
  pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
    self.put(column, value);
    self
  }

  pub fn put(&mut self, column: impl Into<String>, value: impl Into<Value>) {
    self.0.insert(column.into(), value.into());
  }

  pub fn get(&self, column: &str) -> Option<&Value> { self.0.get(column) }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn columns(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }
}

impl FromIterator<(String, Value)> for Values {
  fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// One row returned by a query, holding exactly the projected columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
  pub fn get(&self, column: &str) -> Option<&Value> { self.0.get(column) }

  pub fn id(&self) -> Option<i64> { self.get(crate::schema::ID).and_then(Value::as_i64) }

  pub fn timestamp(&self) -> Option<f64> {
    self.get(crate::schema::TIMESTAMP).and_then(Value::as_f64)
  }

  pub fn device_id(&self) -> Option<&str> {
    self.get(crate::schema::DEVICE_ID).and_then(Value::as_str)
  }

  pub fn columns(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// True when every value in `values` is present in this record unchanged.
  pub fn contains(&self, values: &Values) -> bool {
    values.iter().all(|(column, value)| self.get(column) == Some(value))
  }
}

impl FromIterator<(String, Value)> for Record {
  fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn values_deserialize_from_plain_json() {
    let v: Values =
      serde_json::from_str(r#"{"timestamp":100.5,"device_id":"d1","data":null,"n":3}"#)
        .unwrap();
    assert_eq!(v.get("timestamp"), Some(&Value::Real(100.5)));
    assert_eq!(v.get("device_id"), Some(&Value::Text("d1".into())));
    assert_eq!(v.get("data"), Some(&Value::Null));
    assert_eq!(v.get("n"), Some(&Value::Integer(3)));
  }

  #[test]
  fn record_serializes_as_flat_object() {
    let r: Record = [
      ("_id".to_owned(), Value::Integer(1)),
      ("device_id".to_owned(), Value::Text("d1".into())),
    ]
    .into_iter()
    .collect();
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json, serde_json::json!({"_id": 1, "device_id": "d1"}));
    assert_eq!(r.id(), Some(1));
    assert_eq!(r.device_id(), Some("d1"));
  }

  #[test]
  fn integer_widens_to_real() {
    assert_eq!(Value::Integer(200).as_f64(), Some(200.0));
    assert_eq!(Value::Text("x".into()).as_f64(), None);
  }

  #[test]
  fn record_contains_checks_every_value() {
    let r: Record = [
      ("_id".to_owned(), Value::Integer(1)),
      ("timestamp".to_owned(), Value::Real(1.5)),
    ]
    .into_iter()
    .collect();
    assert!(r.contains(&Values::new().with("timestamp", 1.5)));
    assert!(!r.contains(&Values::new().with("timestamp", 2.5)));
    assert!(!r.contains(&Values::new().with("data", "x")));
  }
}
