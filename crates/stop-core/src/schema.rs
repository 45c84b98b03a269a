//! The fixed table registry.
//!
//! Both tables share the sync columns (`_id`, `timestamp`, `device_id`) that
//! the remote aggregator relies on. Column names and the rendered field
//! strings are published to replication consumers and parsed literally, so
//! they must not change.

use serde::Serialize;

use crate::{authority::Authority, uri::ResourceUri};

/// Version recorded in the database on creation. No migration path exists.
pub const SCHEMA_VERSION: i64 = 1;

/// File name used when the store path names a directory.
pub const DATABASE_NAME: &str = "stop_game.db";

pub const ID: &str = "_id";
pub const TIMESTAMP: &str = "timestamp";
pub const DEVICE_ID: &str = "device_id";
pub const DATA: &str = "data";

pub const GAME_TABLE: &str = "table_game";
pub const MEDICATION_TABLE: &str = "medication";

pub const DIR_BASE_TYPE: &str = "vnd.android.cursor.dir";
pub const ITEM_BASE_TYPE: &str = "vnd.android.cursor.item";

// ─── Descriptors ─────────────────────────────────────────────────────────────

/// One column: name, SQL type, and the trailing constraint/default clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
  pub name:     &'static str,
  pub sql_type: &'static str,
  pub modifier: &'static str,
}

impl ColumnDef {
  /// `name type modifier`, as it appears inside `CREATE TABLE (...)`.
  pub fn definition(&self) -> String {
    if self.modifier.is_empty() {
      format!("{} {}", self.name, self.sql_type)
    } else {
      format!("{} {} {}", self.name, self.sql_type, self.modifier)
    }
  }
}

#[derive(Debug, PartialEq, Eq)]
pub struct TableDescriptor {
  pub name:              &'static str,
  pub columns:           &'static [ColumnDef],
  pub collection_mime:   &'static str,
  pub item_mime:         &'static str,
}

impl TableDescriptor {
  /// Comma-joined column definitions, exported for schema replication.
  pub fn fields(&self) -> String {
    self
      .columns
      .iter()
      .map(ColumnDef::definition)
      .collect::<Vec<_>>()
      .join(",")
  }

  pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
    self.columns.iter().find(|c| c.name == name)
  }

  pub fn has_column(&self, name: &str) -> bool { self.column(name).is_some() }

  pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.columns.iter().map(|c| c.name)
  }

  pub fn collection_uri(&self, authority: &Authority) -> ResourceUri {
    ResourceUri::collection(authority, self.name)
  }

  pub fn create_sql(&self) -> String {
    format!("CREATE TABLE IF NOT EXISTS {} ({})", self.name, self.fields())
  }
}

const SYNC_ID: ColumnDef = ColumnDef {
  name:     ID,
  sql_type: "integer",
  modifier: "primary key autoincrement",
};
const SYNC_TIMESTAMP: ColumnDef = ColumnDef {
  name:     TIMESTAMP,
  sql_type: "real",
  modifier: "default 0",
};
const SYNC_DEVICE_ID: ColumnDef = ColumnDef {
  name:     DEVICE_ID,
  sql_type: "text",
  modifier: "default ''",
};

pub static GAME: TableDescriptor = TableDescriptor {
  name:            GAME_TABLE,
  columns:         &[
    SYNC_ID,
    SYNC_TIMESTAMP,
    SYNC_DEVICE_ID,
    ColumnDef { name: DATA, sql_type: "text", modifier: "default ''" },
  ],
  collection_mime: "vnd.android.cursor.dir/vnd.com.aware.app.stop.database.provider.table_game",
  item_mime:       "vnd.android.cursor.item/vnd.com.aware.app.stop.database.provider.table_game",
};

pub static MEDICATION: TableDescriptor = TableDescriptor {
  name:            MEDICATION_TABLE,
  columns:         &[SYNC_ID, SYNC_TIMESTAMP, SYNC_DEVICE_ID],
  collection_mime: "vnd.android.cursor.dir/vnd.com.aware.app.stop.database.provider.medication",
  item_mime:       "vnd.android.cursor.item/vnd.com.aware.app.stop.database.provider.medication",
};

static TABLES: [&TableDescriptor; 2] = [&GAME, &MEDICATION];

// ─── Registry ────────────────────────────────────────────────────────────────

/// Every registered table, in registration order.
pub fn all() -> impl ExactSizeIterator<Item = &'static TableDescriptor> {
  TABLES.iter().copied()
}

/// Look up a table by name. A miss is a configuration bug in the caller.
pub fn describe(name: &str) -> Option<&'static TableDescriptor> {
  all().find(|t| t.name == name)
}

// ─── Export ──────────────────────────────────────────────────────────────────

/// The per-table layout handed to replication consumers.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaExport {
  pub table:           &'static str,
  pub fields:          String,
  pub columns:         &'static [ColumnDef],
  pub collection_uri:  String,
  pub collection_mime: &'static str,
  pub item_mime:       &'static str,
}

pub fn export(authority: &Authority) -> Vec<SchemaExport> {
  all()
    .map(|t| SchemaExport {
      table:           t.name,
      fields:          t.fields(),
      columns:         t.columns,
      collection_uri:  t.collection_uri(authority).to_string(),
      collection_mime: t.collection_mime,
      item_mime:       t.item_mime,
    })
    .collect()
}

/// MIME type for `table` at the given scope.
pub fn mime_type(table: &TableDescriptor, item: bool) -> &'static str {
  if item { table.item_mime } else { table.collection_mime }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fields_are_stable() {
    assert_eq!(
      GAME.fields(),
      "_id integer primary key autoincrement,timestamp real default 0,\
       device_id text default '',data text default ''"
    );
    assert_eq!(
      MEDICATION.fields(),
      "_id integer primary key autoincrement,timestamp real default 0,\
       device_id text default ''"
    );
  }

  #[test]
  fn registry_holds_exactly_two_tables() {
    let names: Vec<_> = all().map(|t| t.name).collect();
    assert_eq!(names, ["table_game", "medication"]);
    assert!(describe("table_game").is_some());
    assert!(describe("nonexistentTable").is_none());
  }

  #[test]
  fn mime_types_share_base_prefixes() {
    for t in all() {
      assert!(t.collection_mime.starts_with(DIR_BASE_TYPE));
      assert!(t.item_mime.starts_with(ITEM_BASE_TYPE));
      assert!(t.item_mime.ends_with(t.name));
    }
  }

  #[test]
  fn export_carries_collection_uri() {
    let authority = Authority::resolve(&"com.aware.app.stop".into());
    let exported = export(&authority);
    assert_eq!(exported.len(), 2);
    assert_eq!(
      exported[1].collection_uri,
      "content://com.aware.app.stop.database.provider.game/medication"
    );
    assert_eq!(exported[1].fields, MEDICATION.fields());
  }
}
