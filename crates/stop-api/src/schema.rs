//! Handlers for `/schema` and `/type`.
//!
//! `/schema` is what a replication agent reads to mirror the table layout; the
//! `fields` strings are stable and meant to be parsed literally.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use serde_json::json;
use stop_core::{
  schema::{self, SchemaExport},
  store::ResourceStore,
  uri::ResourceUri,
};

use crate::error::ApiError;

/// `GET /schema`
pub async fn export<S: ResourceStore>(State(store): State<Arc<S>>) -> Json<Vec<SchemaExport>> {
  Json(schema::export(store.authority()))
}

#[derive(Debug, Deserialize)]
pub struct TypeParams {
  pub uri: String,
}

/// `GET /type?uri=content://...`
pub async fn describe_type<S: ResourceStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<TypeParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
  let uri = ResourceUri::parse(&params.uri)?;
  let mime = store.describe_type(&uri).map_err(ApiError::from_store)?;
  Ok(Json(json!({ "uri": uri, "type": mime })))
}
