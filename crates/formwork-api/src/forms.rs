//! Handlers for `/forms` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/forms` | Optional `?record_type_id=`; default form first |
//! | `POST`   | `/forms` | `is_default: true` demotes the previous default |
//! | `GET`    | `/forms/{id}` | 404 if not found |
//! | `PATCH`  | `/forms/{id}` | |
//! | `DELETE` | `/forms/{id}` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use formwork_core::{
  form::{FormDefinition, FormPatch, NewForm},
  store::RecordStore,
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub record_type_id: Option<String>,
}

/// `GET /forms[?record_type_id=<id>]`
pub async fn list<S: RecordStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<FormDefinition>>, ApiError> {
  let forms = store
    .list_forms(params.record_type_id.as_deref())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(forms))
}

/// `POST /forms`
pub async fn create<S: RecordStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewForm>,
) -> Result<impl IntoResponse, ApiError> {
  let form = store.create_form(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(form)))
}

/// `GET /forms/{id}`
pub async fn get_one<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<FormDefinition>, ApiError> {
  store
    .get_form(&id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("form {id}")))
}

/// `PATCH /forms/{id}`
pub async fn update<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
  Json(patch): Json<FormPatch>,
) -> Result<Json<FormDefinition>, ApiError> {
  let form = store
    .update_form(&id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(form))
}

/// `DELETE /forms/{id}`
pub async fn remove<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  store.delete_form(&id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
