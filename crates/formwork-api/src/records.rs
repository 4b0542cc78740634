//! Handlers for `/records/{record_type}` endpoints.
//!
//! `{record_type}` accepts either the type's id or its name. Payloads use
//! logical field names only.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/records/{record_type}` | Newest first |
//! | `POST`   | `/records/{record_type}` | Optional `x-user-id` header → `created_by` |
//! | `GET`    | `/records/{record_type}/{id}` | 404 if not found |
//! | `PUT`    | `/records/{record_type}/{id}` | Partial; `PATCH` is an alias |
//! | `DELETE` | `/records/{record_type}/{id}` | Hard delete |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use formwork_core::{
  record_type::RecordType,
  store::RecordStore,
  value::{Record, RecordData},
};

use crate::error::ApiError;

/// Header carrying the acting user's id.
pub const USER_HEADER: &str = "x-user-id";

fn forbid_unless(allowed: bool, record_type: &RecordType, action: &str) -> Result<(), ApiError> {
  if allowed {
    Ok(())
  } else {
    Err(ApiError::Forbidden(format!(
      "record type {} does not allow {action}",
      record_type.name
    )))
  }
}

fn missing(record_type: &RecordType, id: &str) -> ApiError {
  ApiError::NotFound(format!("record {}/{id}", record_type.name))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /records/{record_type}`
pub async fn list<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path(type_ref): Path<String>,
) -> Result<Json<Vec<Record>>, ApiError> {
  let record_type = store
    .resolve_type(&type_ref)
    .await
    .map_err(ApiError::store)?;
  let records = store
    .list_records(&record_type)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /records/{record_type}`
pub async fn create<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path(type_ref): Path<String>,
  headers: HeaderMap,
  Json(data): Json<RecordData>,
) -> Result<impl IntoResponse, ApiError> {
  let record_type = store
    .resolve_type(&type_ref)
    .await
    .map_err(ApiError::store)?;
  forbid_unless(record_type.allow_create, &record_type, "create")?;

  let created_by = headers
    .get(USER_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::to_owned);

  let id = store
    .create_record(&record_type, data, created_by)
    .await
    .map_err(ApiError::store)?;
  let record = store
    .get_record(&record_type, &id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| missing(&record_type, &id))?;

  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /records/{record_type}/{id}`
pub async fn get_one<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path((type_ref, id)): Path<(String, String)>,
) -> Result<Json<Record>, ApiError> {
  let record_type = store
    .resolve_type(&type_ref)
    .await
    .map_err(ApiError::store)?;
  store
    .get_record(&record_type, &id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| missing(&record_type, &id))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /records/{record_type}/{id}`
///
/// Only the supplied fields are written; the rest keep their values.
pub async fn update<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path((type_ref, id)): Path<(String, String)>,
  Json(data): Json<RecordData>,
) -> Result<Json<Record>, ApiError> {
  let record_type = store
    .resolve_type(&type_ref)
    .await
    .map_err(ApiError::store)?;
  forbid_unless(record_type.allow_edit, &record_type, "edit")?;

  store
    .update_record(&record_type, &id, data)
    .await
    .map_err(ApiError::store)?;
  store
    .get_record(&record_type, &id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| missing(&record_type, &id))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /records/{record_type}/{id}`
pub async fn remove<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path((type_ref, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
  let record_type = store
    .resolve_type(&type_ref)
    .await
    .map_err(ApiError::store)?;
  forbid_unless(record_type.allow_delete, &record_type, "delete")?;

  store
    .delete_record(&record_type, &id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
