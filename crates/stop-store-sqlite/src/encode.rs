//! Conversion between core [`Value`]s and SQLite storage values.

use rusqlite::types::Value as SqlValue;
use stop_core::value::{Record, Value};

pub fn encode_value(v: Value) -> SqlValue {
  match v {
    Value::Null => SqlValue::Null,
    Value::Integer(i) => SqlValue::Integer(i),
    Value::Real(r) => SqlValue::Real(r),
    Value::Text(s) => SqlValue::Text(s),
    Value::Blob(b) => SqlValue::Blob(b),
  }
}

pub fn decode_value(v: SqlValue) -> Value {
  match v {
    SqlValue::Null => Value::Null,
    SqlValue::Integer(i) => Value::Integer(i),
    SqlValue::Real(r) => Value::Real(r),
    SqlValue::Text(s) => Value::Text(s),
    SqlValue::Blob(b) => Value::Blob(b),
  }
}

/// One row exactly as SQLite returned it, in projection order.
pub struct RawRow(pub Vec<SqlValue>);

impl RawRow {
  pub fn from_row(row: &rusqlite::Row<'_>, width: usize) -> rusqlite::Result<Self> {
    (0..width)
      .map(|i| row.get::<_, SqlValue>(i))
      .collect::<rusqlite::Result<Vec<_>>>()
      .map(Self)
  }

  pub fn into_record(self, columns: &[String]) -> Record {
    columns
      .iter()
      .cloned()
      .zip(self.0.into_iter().map(decode_value))
      .collect()
  }
}
