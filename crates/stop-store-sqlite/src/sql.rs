//! Statement building and column whitelisting.
//!
//! Table and column names are interpolated into SQL, so every name is checked
//! against the table descriptor before a statement is built. Values and
//! predicate arguments are always bound as parameters.

use rusqlite::types::Value as SqlValue;
use stop_core::{
  schema::{ID, TableDescriptor},
  store::{Predicate, SortOrder},
  uri::Route,
  value::Values,
  Error as CoreError,
};

use crate::encode::encode_value;

#[derive(Debug)]
pub struct Statement {
  pub sql:    String,
  pub params: Vec<SqlValue>,
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Every column must exist, and `_id` is assigned by the store.
pub fn check_writable(table: &'static TableDescriptor, values: &Values) -> Result<(), CoreError> {
  for column in values.columns() {
    if !table.has_column(column) {
      return Err(CoreError::UnknownColumn { table: table.name, column: column.to_owned() });
    }
    if column == ID {
      return Err(CoreError::ReadOnlyColumn { table: table.name, column: column.to_owned() });
    }
  }
  Ok(())
}

/// Resolve the requested projection. `None` selects every column in schema
/// order; an unlisted column is an error.
pub fn projection(
  table: &'static TableDescriptor,
  requested: Option<&[String]>,
) -> Result<Vec<String>, CoreError> {
  match requested {
    None => Ok(table.column_names().map(str::to_owned).collect()),
    Some(cols) => cols
      .iter()
      .map(|c| {
        if table.has_column(c) {
          Ok(c.clone())
        } else {
          Err(CoreError::UnknownColumn { table: table.name, column: c.clone() })
        }
      })
      .collect(),
  }
}

pub fn check_sort(table: &'static TableDescriptor, sort: &SortOrder) -> Result<(), CoreError> {
  match sort.keys().iter().find(|k| !table.has_column(&k.column)) {
    Some(k) => Err(CoreError::UnknownColumn { table: table.name, column: k.column.clone() }),
    None => Ok(()),
  }
}

// ─── Statements ──────────────────────────────────────────────────────────────

pub fn insert(table: &TableDescriptor, values: Values) -> Statement {
  if values.is_empty() {
    return Statement {
      sql:    format!("INSERT INTO {} DEFAULT VALUES", table.name),
      params: Vec::new(),
    };
  }

  let columns: Vec<&str> = values.columns().collect();
  let placeholders = vec!["?"; columns.len()].join(", ");
  let sql = format!(
    "INSERT INTO {} ({}) VALUES ({placeholders})",
    table.name,
    columns.join(", ")
  );
  let params = values.iter().map(|(_, v)| encode_value(v.clone())).collect();
  Statement { sql, params }
}

pub fn update(route: &Route, values: Values, predicate: Option<Predicate>) -> Statement {
  let assignments = values
    .columns()
    .map(|c| format!("{c} = ?"))
    .collect::<Vec<_>>()
    .join(", ");
  let mut params: Vec<SqlValue> = values.iter().map(|(_, v)| encode_value(v.clone())).collect();
  let where_clause = where_clause(route, predicate, &mut params);
  Statement {
    sql: format!("UPDATE {} SET {assignments}{where_clause}", route.table.name),
    params,
  }
}

pub fn delete(route: &Route, predicate: Option<Predicate>) -> Statement {
  let mut params = Vec::new();
  let where_clause = where_clause(route, predicate, &mut params);
  Statement {
    sql: format!("DELETE FROM {}{where_clause}", route.table.name),
    params,
  }
}

pub fn select(
  route: &Route,
  columns: &[String],
  predicate: Option<Predicate>,
  sort: &SortOrder,
) -> Statement {
  let mut params = Vec::new();
  let where_clause = where_clause(route, predicate, &mut params);
  let order_by = if sort.is_empty() {
    String::new()
  } else {
    format!(" ORDER BY {sort}")
  };
  Statement {
    sql: format!(
      "SELECT {} FROM {}{where_clause}{order_by}",
      columns.join(", "),
      route.table.name
    ),
    params,
  }
}

/// The caller's selection comes first and the item restriction last, so
/// numbered placeholders inside the selection keep their positions.
fn where_clause(route: &Route, predicate: Option<Predicate>, params: &mut Vec<SqlValue>) -> String {
  let mut conds = Vec::new();
  if let Some(p) = predicate {
    if !p.selection.trim().is_empty() {
      conds.push(format!("({})", p.selection));
    }
    params.extend(p.args.into_iter().map(encode_value));
  }
  if let Some(id) = route.item_id() {
    conds.push(format!("{ID} = ?"));
    params.push(SqlValue::Integer(id));
  }

  if conds.is_empty() {
    String::new()
  } else {
    format!(" WHERE {}", conds.join(" AND "))
  }
}
