//! Handlers for `/categories` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use formwork_core::{
  record_type::{CategoryWithTypes, NewCategory},
  store::RecordStore,
};

use crate::error::ApiError;

/// `GET /categories`: each category with its sidebar record types.
pub async fn list<S: RecordStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<CategoryWithTypes>>, ApiError> {
  let categories = store.list_categories().await.map_err(ApiError::store)?;
  Ok(Json(categories))
}

/// `POST /categories`
pub async fn create<S: RecordStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewCategory>,
) -> Result<impl IntoResponse, ApiError> {
  let category = store
    .create_category(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(category)))
}
