//! JSON-over-HTTP surface for the STOP record store.
//!
//! Exposes an axum [`Router`] backed by any [`ResourceStore`], so peer
//! processes (sync agents, broadcast-triggered writers) can reach the same
//! five operations the in-process API offers. Table paths map one-to-one onto
//! `content://<authority>/<table>[/<id>]` URIs.

pub mod error;
pub mod records;
pub mod schema;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::get,
};
use serde::Deserialize;
use stop_core::store::ResourceStore;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `STOP_*` environment variables.
#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
  pub host:         String,
  pub port:         u16,
  /// Database file, or a directory to hold `stop_game.db`.
  pub store_path:   PathBuf,
  /// Package identity of the hosting application; determines the authority.
  pub package_name: String,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: ResourceStore + 'static,
{
  Router::new()
    .route("/schema", get(schema::export::<S>))
    .route("/type", get(schema::describe_type::<S>))
    .route(
      "/{table}",
      get(records::list::<S>)
        .post(records::create::<S>)
        .patch(records::update::<S>)
        .delete(records::remove::<S>),
    )
    .route(
      "/{table}/{id}",
      get(records::list_one::<S>)
        .patch(records::update_one::<S>)
        .delete(records::remove_one::<S>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(store)
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::{Value as Json, json};
  use stop_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  const BASE: &str = "content://com.aware.app.stop.database.provider.game";

  async fn make_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory(&"com.aware.app.stop".into()).await.unwrap())
  }

  async fn oneshot(
    store:  Arc<SqliteStore>,
    method: &str,
    uri:    &str,
    body:   Option<Json>,
  ) -> (StatusCode, Json) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(b) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(b.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let resp = api_router(store).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
      Json::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
  }

  #[tokio::test]
  async fn insert_then_query_collection() {
    let store = make_store().await;

    let (status, body) = oneshot(
      store.clone(),
      "POST",
      "/table_game",
      Some(json!({"timestamp": 100.5, "device_id": "d1", "data": "{score:10}"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["uri"], format!("{BASE}/table_game/1"));

    let (status, body) = oneshot(store, "GET", "/table_game", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      body,
      json!([{"_id": 1, "timestamp": 100.5, "device_id": "d1", "data": "{score:10}"}])
    );
  }

  #[tokio::test]
  async fn query_with_projection_selection_and_sort() {
    let store = make_store().await;
    for (ts, dev) in [(1.0, "a"), (2.0, "b"), (3.0, "a")] {
      oneshot(
        store.clone(),
        "POST",
        "/medication",
        Some(json!({"timestamp": ts, "device_id": dev})),
      )
      .await;
    }

    let (status, body) = oneshot(
      store,
      "GET",
      "/medication?projection=_id,timestamp&selection=device_id%20%3D%20%3F&args=%5B%22a%22%5D&sort=timestamp%20DESC",
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"_id": 3, "timestamp": 3.0}, {"_id": 1, "timestamp": 1.0}]));
  }

  #[tokio::test]
  async fn patch_item_and_delete_by_selection() {
    let store = make_store().await;
    oneshot(
      store.clone(),
      "POST",
      "/medication",
      Some(json!({"timestamp": 200.0, "device_id": "d1"})),
    )
    .await;

    let (status, body) = oneshot(
      store.clone(),
      "PATCH",
      "/medication/1",
      Some(json!({"values": {"timestamp": 201.0}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"], 1);

    let (_, body) = oneshot(store.clone(), "GET", "/medication/1", None).await;
    assert_eq!(body[0]["timestamp"], 201.0);

    let path = "/medication?selection=device_id%20%3D%20%3F&args=%5B%22d1%22%5D";
    let (_, body) = oneshot(store.clone(), "DELETE", path, None).await;
    assert_eq!(body["rows"], 1);
    let (_, body) = oneshot(store, "DELETE", path, None).await;
    assert_eq!(body["rows"], 0);
  }

  #[tokio::test]
  async fn unknown_table_is_404_for_every_method() {
    let store = make_store().await;
    for (method, body) in [
      ("GET", None),
      ("POST", Some(json!({}))),
      ("PATCH", Some(json!({"values": {"timestamp": 1.0}}))),
      ("DELETE", None),
    ] {
      let (status, resp) = oneshot(store.clone(), method, "/nonexistentTable", body).await;
      assert_eq!(status, StatusCode::NOT_FOUND, "{method}");
      assert!(resp["error"].as_str().unwrap().contains("unknown URI"));
    }

    let (status, _) = oneshot(store, "GET", "/table_game/abc", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn encoded_separators_never_reach_another_table() {
    let store = make_store().await;
    oneshot(
      store.clone(),
      "POST",
      "/medication",
      Some(json!({"timestamp": 1.0, "device_id": "d1"})),
    )
    .await;

    for path in [
      "/table_game%2F..%2Fmedication",
      "/table_game%3Fjunk",
      "/table_game%23frag",
      "/medication%2F1",
      "/medication/1%2F..",
      "/medication/..",
    ] {
      for method in ["GET", "DELETE"] {
        let (status, _) = oneshot(store.clone(), method, path, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {path}");
      }
    }

    let (_, body) = oneshot(store.clone(), "GET", "/medication", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = oneshot(
      store,
      "GET",
      &format!("/type?uri={BASE}/table_game/%2E%2E/medication"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn selection_without_matching_args_is_400() {
    let store = make_store().await;
    let (status, body) = oneshot(
      store,
      "GET",
      "/medication?selection=device_id%20%3D%20%3F",
      None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn unlisted_column_is_400() {
    let store = make_store().await;
    let (status, _) = oneshot(store.clone(), "GET", "/medication?projection=data", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
      oneshot(store, "POST", "/medication", Some(json!({"data": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn schema_export_lists_exact_fields() {
    let store = make_store().await;
    let (status, body) = oneshot(store, "GET", "/schema", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["table"], "table_game");
    assert_eq!(
      body[0]["fields"],
      "_id integer primary key autoincrement,timestamp real default 0,\
       device_id text default '',data text default ''"
    );
    assert_eq!(body[1]["collection_uri"], format!("{BASE}/medication"));
  }

  #[tokio::test]
  async fn describe_type_by_uri() {
    let store = make_store().await;
    let (status, body) = oneshot(
      store.clone(),
      "GET",
      &format!("/type?uri={BASE}/table_game/5"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      body["type"],
      "vnd.android.cursor.item/vnd.com.aware.app.stop.database.provider.table_game"
    );

    let (status, _) =
      oneshot(store, "GET", &format!("/type?uri={BASE}/nonexistentTable"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn closed_store_reads_as_empty() {
    let store = make_store().await;
    oneshot(
      store.clone(),
      "POST",
      "/table_game",
      Some(json!({"timestamp": 1.0})),
    )
    .await;
    store.close().await.unwrap();

    let (status, body) = oneshot(store.clone(), "GET", "/table_game", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) =
      oneshot(store, "POST", "/table_game", Some(json!({"timestamp": 2.0}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  }
}
