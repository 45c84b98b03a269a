//! SQLite implementation of [`ResourceStore`].

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use rusqlite::TransactionBehavior;
use stop_core::{
  authority::{Authority, ProcessIdentity},
  notify::{ChangeEvent, ChangeKind, ChangeNotifier, Observer},
  schema::{DATABASE_NAME, SCHEMA_VERSION},
  store::{Cursor, Predicate, Query, ResourceStore},
  uri::{ResourceUri, UriRouter},
  value::Values,
  Error as CoreError,
};
use tokio::sync::OnceCell;

use crate::{
  encode::RawRow,
  schema::{create_tables, set_version, PRAGMAS},
  sql::{self, Statement},
  Error, Result,
};

#[derive(Debug, Clone)]
enum Location {
  File(PathBuf),
  Memory,
}

/// Result of the insert transaction, decided on the connection thread.
enum InsertOutcome {
  Inserted(i64),
  Rejected(String),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// The STOP record store backed by a single SQLite database.
///
/// The engine handle is opened lazily on first use. Concurrent first callers
/// all await the same initialisation, so exactly one handle ever exists per
/// store. Cloning is cheap; clones share the handle and the notifier.
///
/// There is no operation timeout, cancellation, or backpressure: every call
/// waits for the single connection thread, which caps throughput at one
/// statement at a time.
#[derive(Clone)]
pub struct SqliteStore {
  location: Location,
  conn:     Arc<OnceCell<tokio_rusqlite::Connection>>,
  router:   UriRouter,
  notifier: ChangeNotifier,
}

impl SqliteStore {
  /// A store over the database file at `path`, opened on first use. If
  /// `path` is an existing directory the database is `stop_game.db` inside it.
  pub fn new(path: impl AsRef<Path>, identity: &ProcessIdentity) -> Self {
    let path = path.as_ref();
    let path = if path.is_dir() {
      path.join(DATABASE_NAME)
    } else {
      path.to_path_buf()
    };
    Self::with_location(Location::File(path), identity)
  }

  /// An in-memory store, opened on first use.
  pub fn in_memory(identity: &ProcessIdentity) -> Self {
    Self::with_location(Location::Memory, identity)
  }

  /// Open (or create) a store at `path` and run schema initialisation now.
  pub async fn open(path: impl AsRef<Path>, identity: &ProcessIdentity) -> Result<Self> {
    let store = Self::new(path, identity);
    store.connection().await?;
    Ok(store)
  }

  /// Open an in-memory store and run schema initialisation now.
  pub async fn open_in_memory(identity: &ProcessIdentity) -> Result<Self> {
    let store = Self::in_memory(identity);
    store.connection().await?;
    Ok(store)
  }

  fn with_location(location: Location, identity: &ProcessIdentity) -> Self {
    Self {
      location,
      conn: Arc::new(OnceCell::new()),
      router: UriRouter::new(Authority::resolve(identity)),
      notifier: ChangeNotifier::new(),
    }
  }

  pub fn router(&self) -> &UriRouter { &self.router }

  pub fn notifier(&self) -> &ChangeNotifier { &self.notifier }

  /// Whether the engine handle has been created yet.
  pub fn is_initialized(&self) -> bool { self.conn.initialized() }

  /// Close the engine handle. Later queries yield no result; later mutations
  /// fail with the engine's closed error. A store that was never opened has
  /// nothing to close.
  pub async fn close(&self) -> Result<()> {
    if let Some(conn) = self.conn.get() {
      conn.clone().close().await?;
      tracing::info!(authority = %self.router.authority(), "store closed");
    }
    Ok(())
  }

  pub(crate) async fn connection(&self) -> Result<&tokio_rusqlite::Connection> {
    self
      .conn
      .get_or_try_init(|| async move {
        let conn = match &self.location {
          Location::File(path) => tokio_rusqlite::Connection::open(path).await?,
          Location::Memory => tokio_rusqlite::Connection::open_in_memory().await?,
        };
        init_schema(&conn).await?;
        tracing::info!(
          location = ?self.location,
          authority = %self.router.authority(),
          "store opened"
        );
        Ok::<_, Error>(conn)
      })
      .await
  }

  /// Run `stmt` inside an immediate transaction and return the rows changed.
  async fn execute_write(&self, stmt: Statement) -> Result<usize> {
    let conn = self.connection().await?;
    let changed = conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(&stmt.sql, rusqlite::params_from_iter(stmt.params.iter()))?;
        tx.commit()?;
        Ok(changed)
      })
      .await?;
    Ok(changed)
  }

  fn publish(&self, uri: ResourceUri, kind: ChangeKind) {
    let delivered = self.notifier.publish(ChangeEvent { uri: uri.clone(), kind });
    tracing::debug!(%uri, ?kind, delivered, "change published");
  }
}

async fn init_schema(conn: &tokio_rusqlite::Connection) -> Result<()> {
  let stored_version = conn
    .call(|conn| {
      conn.execute_batch(PRAGMAS)?;
      let version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
      let tx = conn.transaction()?;
      tx.execute_batch(&create_tables())?;
      if version == 0 {
        tx.execute_batch(&set_version())?;
      }
      tx.commit()?;
      Ok(version)
    })
    .await?;

  if stored_version != 0 && stored_version != SCHEMA_VERSION {
    tracing::warn!(
      stored_version,
      expected = SCHEMA_VERSION,
      "database schema version differs; no migration is applied"
    );
  }
  Ok(())
}

// ─── ResourceStore impl ──────────────────────────────────────────────────────

impl ResourceStore for SqliteStore {
  type Error = Error;

  fn authority(&self) -> &Authority { self.router.authority() }

  async fn query(&self, uri: &ResourceUri, query: &Query) -> Result<Option<Cursor>> {
    let route = self.router.route(uri)?;
    let columns = sql::projection(route.table, query.projection.as_deref())?;
    sql::check_sort(route.table, &query.sort)?;
    let stmt = sql::select(&route, &columns, query.predicate.clone(), &query.sort);

    // Subscribe before reading so a change racing the read is not lost.
    let observer = self.notifier.subscribe(uri.clone());

    let conn = match self.connection().await {
      Ok(conn) => conn,
      Err(e) if e.is_closed() => {
        tracing::warn!(%uri, error = %e, "query against closed store");
        return Ok(None);
      }
      Err(e) => return Err(e),
    };

    let width = columns.len();
    let rows = conn
      .call(move |conn| {
        let mut prepared = conn.prepare(&stmt.sql)?;
        let rows = prepared
          .query_map(rusqlite::params_from_iter(stmt.params.iter()), |row| {
            RawRow::from_row(row, width)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await;

    let rows = match rows.map_err(Error::from) {
      Ok(rows) => rows,
      Err(e) if e.is_closed() => {
        tracing::warn!(%uri, error = %e, "query against closed store");
        return Ok(None);
      }
      Err(e) => return Err(e),
    };

    tracing::debug!(%uri, rows = rows.len(), "query");
    let records = rows.into_iter().map(|r| r.into_record(&columns)).collect();
    Ok(Some(Cursor::new(columns, records, observer)))
  }

  async fn insert(&self, uri: &ResourceUri, values: Values) -> Result<ResourceUri> {
    let route = self.router.route(uri)?;
    if route.item_id().is_some() {
      return Err(CoreError::ItemScopeNotAllowed(uri.to_string()).into());
    }
    sql::check_writable(route.table, &values)?;
    let stmt = sql::insert(route.table, values);

    let conn = self.connection().await?;
    let outcome = conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // Dropping `tx` on the early returns rolls the transaction back.
        if let Err(e) = tx.execute(&stmt.sql, rusqlite::params_from_iter(stmt.params.iter())) {
          return Ok(InsertOutcome::Rejected(e.to_string()));
        }
        let id = tx.last_insert_rowid();
        if id <= 0 {
          return Ok(InsertOutcome::Rejected(format!("engine assigned id {id}")));
        }
        tx.commit()?;
        Ok(InsertOutcome::Inserted(id))
      })
      .await?;

    match outcome {
      InsertOutcome::Inserted(id) => {
        let item = self.router.collection_uri(route.table).with_id(id);
        tracing::debug!(uri = %item, "insert");
        self.publish(item.clone(), ChangeKind::Insert);
        Ok(item)
      }
      InsertOutcome::Rejected(reason) => {
        tracing::debug!(%uri, %reason, "insert rejected");
        Err(Error::Insert { uri: uri.to_string(), reason })
      }
    }
  }

  async fn update(
    &self,
    uri:       &ResourceUri,
    values:    Values,
    predicate: Option<Predicate>,
  ) -> Result<usize> {
    let route = self.router.route(uri)?;
    if values.is_empty() {
      return Err(CoreError::EmptyValues(uri.to_string()).into());
    }
    sql::check_writable(route.table, &values)?;

    let changed = self.execute_write(sql::update(&route, values, predicate)).await?;
    tracing::debug!(%uri, changed, "update");
    self.publish(uri.clone(), ChangeKind::Update);
    Ok(changed)
  }

  async fn delete(&self, uri: &ResourceUri, predicate: Option<Predicate>) -> Result<usize> {
    let route = self.router.route(uri)?;

    let changed = self.execute_write(sql::delete(&route, predicate)).await?;
    tracing::debug!(%uri, changed, "delete");
    self.publish(uri.clone(), ChangeKind::Delete);
    Ok(changed)
  }

  fn describe_type(&self, uri: &ResourceUri) -> Result<&'static str> {
    Ok(self.router.route(uri)?.mime_type())
  }

  fn subscribe(&self, uri: ResourceUri) -> Observer { self.notifier.subscribe(uri) }
}
