//! Handlers for `/record-types` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/record-types` | Ordered by display name |
//! | `POST`   | `/record-types` | Body: `{recordType, fields[], formLayout?, calendarSettings?}` |
//! | `GET`    | `/record-types/{id}` | Id or name; includes fields |
//! | `PATCH`  | `/record-types/{id}` | System types: presentation only |
//! | `DELETE` | `/record-types/{id}` | 403 for system types |
//! | `GET`    | `/record-types/{id}/calendar-settings` | 404 if none |
//! | `PATCH`  | `/record-types/{id}/calendar-settings` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use formwork_core::{
  calendar::{CalendarSettings, CalendarSettingsPatch, NewCalendarSettings},
  field::{FieldDefinition, NewField},
  form::{FormLayout, NewForm, default_layout},
  record_type::{NewRecordType, RecordType, RecordTypePatch},
  schema::SyncReport,
  store::RecordStore,
};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, sync_after_change};

/// A record type with its fields, as returned by create and get-one.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDetail {
  pub record_type:       RecordType,
  pub fields:            Vec<FieldDefinition>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub calendar_settings: Option<CalendarSettings>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sync:              Option<SyncReport>,
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /record-types`
pub async fn list<S: RecordStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<RecordType>>, ApiError> {
  let types = store.list_types().await.map_err(ApiError::store)?;
  Ok(Json(types))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  pub record_type:       NewRecordType,
  #[serde(default)]
  pub fields:            Vec<NewField>,
  pub form_layout:       Option<FormLayout>,
  pub calendar_settings: Option<NewCalendarSettings>,
}

/// `POST /record-types`
///
/// Creates the type, its fields, a default form and (optionally) calendar
/// settings, then synchronises the physical table.
pub async fn create<S: RecordStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let record_type = store
    .create_type(body.record_type)
    .await
    .map_err(ApiError::store)?;

  for field in body.fields {
    store
      .create_field(&record_type.id, field)
      .await
      .map_err(ApiError::store)?;
  }
  let fields = store
    .list_fields(&record_type.id)
    .await
    .map_err(ApiError::store)?;

  let layout = body
    .form_layout
    .unwrap_or_else(|| default_layout(&fields));
  store
    .create_form(NewForm {
      id: None,
      record_type_id: record_type.id.clone(),
      name: format!("Default {} Form", record_type.display_name),
      is_default: true,
      layout,
    })
    .await
    .map_err(ApiError::store)?;

  let calendar_settings = match body.calendar_settings {
    Some(settings) => Some(
      store
        .create_calendar_settings(&record_type.id, settings)
        .await
        .map_err(ApiError::store)?,
    ),
    None => None,
  };

  let sync = sync_after_change(&*store, &record_type, &fields).await;
  tracing::info!(record_type = %record_type.name, fields = fields.len(), "record type created");

  Ok((
    StatusCode::CREATED,
    Json(TypeDetail {
      record_type,
      fields,
      calendar_settings,
      sync,
    }),
  ))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /record-types/{id}`
pub async fn get_one<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<TypeDetail>, ApiError> {
  let record_type = store.resolve_type(&id).await.map_err(ApiError::store)?;
  let fields = store
    .list_fields(&record_type.id)
    .await
    .map_err(ApiError::store)?;
  let calendar_settings = store
    .calendar_settings(&record_type.id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(TypeDetail {
    record_type,
    fields,
    calendar_settings,
    sync: None,
  }))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /record-types/{id}`
pub async fn update<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
  Json(patch): Json<RecordTypePatch>,
) -> Result<Json<RecordType>, ApiError> {
  let record_type = store.resolve_type(&id).await.map_err(ApiError::store)?;
  let updated = store
    .update_type(&record_type.id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(updated))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /record-types/{id}`
pub async fn remove<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  let record_type = store.resolve_type(&id).await.map_err(ApiError::store)?;
  store
    .delete_type(&record_type.id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Calendar settings ────────────────────────────────────────────────────────

/// `GET /record-types/{id}/calendar-settings`
pub async fn calendar_settings<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<CalendarSettings>, ApiError> {
  let record_type = store.resolve_type(&id).await.map_err(ApiError::store)?;
  store
    .calendar_settings(&record_type.id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("calendar settings for {}", record_type.name)))
}

/// `PATCH /record-types/{id}/calendar-settings`
pub async fn update_calendar_settings<S: RecordStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
  Json(patch): Json<CalendarSettingsPatch>,
) -> Result<Json<CalendarSettings>, ApiError> {
  let record_type = store.resolve_type(&id).await.map_err(ApiError::store)?;
  let settings = store
    .update_calendar_settings(&record_type.id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(settings))
}
