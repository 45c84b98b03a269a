//! Handlers for `/{table}` and `/{table}/{id}` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/{table}[/{id}]` | `?projection=a,b&selection=...&args=[...]&sort=...` |
//! | `POST`   | `/{table}` | Body: JSON object of column values; `201 {"uri": ...}` |
//! | `PATCH`  | `/{table}[/{id}]` | Body: `{"values": {...}, "selection"?: ..., "args"?: [...]}` |
//! | `DELETE` | `/{table}[/{id}]` | `?selection=...&args=[...]`; `{"rows": n}` |
//!
//! `args` in query strings is a JSON array of positional values.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query as QueryParams, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use stop_core::{
  store::{Predicate, Query, ResourceStore, SortOrder},
  uri::ResourceUri,
  value::{Record, Value, Values},
};

use crate::error::ApiError;

// ─── Addressing ──────────────────────────────────────────────────────────────

/// The resource addressed by decoded path parameters. Each parameter becomes
/// exactly one URI segment; the router decides whether it names anything.
fn resource<S: ResourceStore>(store: &S, table: &str, id: Option<&str>) -> ResourceUri {
  let collection = ResourceUri::collection(store.authority(), table);
  match id {
    Some(id) => collection.child(id),
    None => collection,
  }
}

fn predicate(selection: Option<String>, args: Vec<Value>) -> Result<Option<Predicate>, ApiError> {
  match selection {
    Some(selection) => Ok(Some(Predicate { selection, args })),
    None if args.is_empty() => Ok(None),
    None => Err(ApiError::BadRequest("args given without a selection".to_owned())),
  }
}

fn parse_args(raw: Option<&str>) -> Result<Vec<Value>, ApiError> {
  raw
    .map(|s| {
      serde_json::from_str(s).map_err(|e| ApiError::BadRequest(format!("args: {e}")))
    })
    .transpose()
    .map(Option::unwrap_or_default)
}

// ─── Query ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ReadParams {
  /// Comma-separated column names.
  pub projection: Option<String>,
  pub selection:  Option<String>,
  /// JSON array of positional arguments.
  pub args:       Option<String>,
  /// e.g. `timestamp DESC, _id`
  pub sort:       Option<String>,
}

async fn run_query<S: ResourceStore>(
  store: &S,
  uri: ResourceUri,
  params: ReadParams,
) -> Result<Json<Vec<Record>>, ApiError> {
  let args = parse_args(params.args.as_deref())?;
  let query = Query {
    projection: params
      .projection
      .map(|s| s.split(',').map(|c| c.trim().to_owned()).collect()),
    predicate:  predicate(params.selection, args)?,
    sort:       params
      .sort
      .as_deref()
      .map(str::parse::<SortOrder>)
      .transpose()?
      .unwrap_or_default(),
  };

  let records = store
    .query(&uri, &query)
    .await
    .map_err(ApiError::from_store)?
    .map(|cursor| cursor.collect::<Vec<_>>())
    .unwrap_or_default();
  Ok(Json(records))
}

/// `GET /{table}`
pub async fn list<S: ResourceStore>(
  State(store): State<Arc<S>>,
  Path(table): Path<String>,
  QueryParams(params): QueryParams<ReadParams>,
) -> Result<Json<Vec<Record>>, ApiError> {
  let uri = resource(store.as_ref(), &table, None);
  run_query(store.as_ref(), uri, params).await
}

/// `GET /{table}/{id}`
pub async fn list_one<S: ResourceStore>(
  State(store): State<Arc<S>>,
  Path((table, id)): Path<(String, String)>,
  QueryParams(params): QueryParams<ReadParams>,
) -> Result<Json<Vec<Record>>, ApiError> {
  let uri = resource(store.as_ref(), &table, Some(id.as_str()));
  run_query(store.as_ref(), uri, params).await
}

// ─── Insert ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Created {
  pub uri: ResourceUri,
}

/// `POST /{table}`, body: `{"timestamp": 100.5, "device_id": "d1"}`
pub async fn create<S: ResourceStore>(
  State(store): State<Arc<S>>,
  Path(table): Path<String>,
  Json(values): Json<Values>,
) -> Result<impl IntoResponse, ApiError> {
  let uri = resource(store.as_ref(), &table, None);
  let item = store.insert(&uri, values).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(Created { uri: item })))
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub values:    Values,
  pub selection: Option<String>,
  #[serde(default)]
  pub args:      Vec<Value>,
}

async fn run_update<S: ResourceStore>(
  store: &S,
  uri: ResourceUri,
  body: UpdateBody,
) -> Result<Json<serde_json::Value>, ApiError> {
  let rows = store
    .update(&uri, body.values, predicate(body.selection, body.args)?)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(json!({ "rows": rows })))
}

/// `PATCH /{table}`
pub async fn update<S: ResourceStore>(
  State(store): State<Arc<S>>,
  Path(table): Path<String>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
  let uri = resource(store.as_ref(), &table, None);
  run_update(store.as_ref(), uri, body).await
}

/// `PATCH /{table}/{id}`
pub async fn update_one<S: ResourceStore>(
  State(store): State<Arc<S>>,
  Path((table, id)): Path<(String, String)>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
  let uri = resource(store.as_ref(), &table, Some(id.as_str()));
  run_update(store.as_ref(), uri, body).await
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct DeleteParams {
  pub selection: Option<String>,
  pub args:      Option<String>,
}

async fn run_delete<S: ResourceStore>(
  store: &S,
  uri: ResourceUri,
  params: DeleteParams,
) -> Result<Json<serde_json::Value>, ApiError> {
  let args = parse_args(params.args.as_deref())?;
  let rows = store
    .delete(&uri, predicate(params.selection, args)?)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(json!({ "rows": rows })))
}

/// `DELETE /{table}`
pub async fn remove<S: ResourceStore>(
  State(store): State<Arc<S>>,
  Path(table): Path<String>,
  QueryParams(params): QueryParams<DeleteParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
  let uri = resource(store.as_ref(), &table, None);
  run_delete(store.as_ref(), uri, params).await
}

/// `DELETE /{table}/{id}`
pub async fn remove_one<S: ResourceStore>(
  State(store): State<Arc<S>>,
  Path((table, id)): Path<(String, String)>,
  QueryParams(params): QueryParams<DeleteParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
  let uri = resource(store.as_ref(), &table, Some(id.as_str()));
  run_delete(store.as_ref(), uri, params).await
}
