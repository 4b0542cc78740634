//! Handlers for `/record-types/{id}/fields` endpoints. Every change is
//! followed by a schema sync of the owning type.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use formwork_core::{
  field::{FieldDefinition, FieldPatch, NewField},
  record_type::RecordType,
  store::RecordStore,
};

use crate::{error::ApiError, sync_after_change};

/// `GET /record-types/{id}/fields`
pub async fn list<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<FieldDefinition>>, ApiError> {
  let record_type = store.resolve_type(&id).await.map_err(ApiError::store)?;
  let fields = store
    .list_fields(&record_type.id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(fields))
}

/// `POST /record-types/{id}/fields`
pub async fn create<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
  Json(body): Json<NewField>,
) -> Result<impl IntoResponse, ApiError> {
  let record_type = store.resolve_type(&id).await.map_err(ApiError::store)?;
  let field = store
    .create_field(&record_type.id, body)
    .await
    .map_err(ApiError::store)?;
  resync(&*store, &record_type).await?;
  Ok((StatusCode::CREATED, Json(field)))
}

/// `PATCH /record-types/{id}/fields/{field_id}`
pub async fn update<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path((id, field_id)): Path<(String, String)>,
  Json(patch): Json<FieldPatch>,
) -> Result<Json<FieldDefinition>, ApiError> {
  let record_type = store.resolve_type(&id).await.map_err(ApiError::store)?;
  owned_field(&*store, &record_type, &field_id).await?;
  let field = store
    .update_field(&field_id, patch)
    .await
    .map_err(ApiError::store)?;
  resync(&*store, &record_type).await?;
  Ok(Json(field))
}

/// `DELETE /record-types/{id}/fields/{field_id}`
///
/// The column stays in the dedicated table; only the definition goes.
pub async fn remove<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path((id, field_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
  let record_type = store.resolve_type(&id).await.map_err(ApiError::store)?;
  owned_field(&*store, &record_type, &field_id).await?;
  store
    .delete_field(&field_id)
    .await
    .map_err(ApiError::store)?;
  resync(&*store, &record_type).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// 404 unless `field_id` exists and belongs to `record_type`.
async fn owned_field<S: RecordStore>(
  store: &S,
  record_type: &RecordType,
  field_id: &str,
) -> Result<FieldDefinition, ApiError> {
  store
    .get_field(field_id)
    .await
    .map_err(ApiError::store)?
    .filter(|f| f.record_type_id == record_type.id)
    .ok_or_else(|| ApiError::NotFound(format!("field {field_id} of {}", record_type.name)))
}

async fn resync<S: RecordStore>(store: &S, record_type: &RecordType) -> Result<(), ApiError> {
  let fields = store
    .list_fields(&record_type.id)
    .await
    .map_err(ApiError::store)?;
  sync_after_change(store, record_type, &fields).await;
  Ok(())
}
