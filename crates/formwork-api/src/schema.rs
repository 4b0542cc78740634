//! Physical schema introspection and manual synchronisation.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use formwork_core::{
  schema::{SchemaMigration, SyncReport, TableSchema},
  store::RecordStore,
};
use serde::Serialize;

use crate::error::ApiError;

/// Where a record type's rows currently live.
#[derive(Debug, Serialize)]
#[serde(tag = "storage", rename_all = "snake_case")]
pub enum Storage {
  /// A dedicated table.
  Table(TableSchema),
  /// JSON documents in the shared fallback table.
  Fallback,
}

/// `GET /record-types/{id}/schema`
pub async fn table<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<Storage>, ApiError> {
  let record_type = store.resolve_type(&id).await.map_err(ApiError::store)?;
  let storage = store
    .table_schema(&record_type)
    .await
    .map_err(ApiError::store)?
    .map_or(Storage::Fallback, Storage::Table);
  Ok(Json(storage))
}

/// `GET /record-types/{id}/migrations`, oldest first.
pub async fn migrations<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<SchemaMigration>>, ApiError> {
  let record_type = store.resolve_type(&id).await.map_err(ApiError::store)?;
  let log = store
    .list_migrations(Some(&record_type.id))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(log))
}

/// `POST /sync`: reconcile every record type that has fields.
pub async fn sync_all<S: RecordStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<SyncReport>>, ApiError> {
  let reports = store.sync_all().await.map_err(ApiError::store)?;
  Ok(Json(reports))
}
