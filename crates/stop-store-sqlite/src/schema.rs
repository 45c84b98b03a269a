//! SQL schema for the STOP SQLite store.
//!
//! Table DDL is rendered from the core registry so the stored layout and the
//! exported field strings cannot drift apart. Executed once when the
//! connection is first opened.

use stop_core::schema::{self, SCHEMA_VERSION};

/// Connection pragmas applied before the tables are created.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// `CREATE TABLE IF NOT EXISTS` for every registered table; idempotent.
pub fn create_tables() -> String {
  schema::all()
    .map(|t| format!("{};\n", t.create_sql()))
    .collect()
}

pub fn set_version() -> String { format!("PRAGMA user_version = {SCHEMA_VERSION};") }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ddl_uses_exported_fields() {
    let ddl = create_tables();
    assert!(ddl.contains(
      "CREATE TABLE IF NOT EXISTS medication (_id integer primary key autoincrement,\
       timestamp real default 0,device_id text default '');"
    ));
    assert_eq!(ddl.matches("CREATE TABLE").count(), 2);
  }
}
