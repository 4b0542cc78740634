//! JSON REST API for Formwork.
//!
//! Exposes an axum [`Router`] backed by any [`formwork_core::store::RecordStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", formwork_api::api_router(store.clone()))
//! ```

pub mod calendar;
pub mod categories;
pub mod error;
pub mod fields;
pub mod forms;
pub mod record_types;
pub mod records;
pub mod schema;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use formwork_core::{
  field::FieldDefinition, record_type::RecordType, schema::SyncReport, store::RecordStore,
};

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RecordStore + 'static,
{
  Router::new()
    // Record types
    .route(
      "/record-types",
      get(record_types::list::<S>).post(record_types::create::<S>),
    )
    .route(
      "/record-types/{id}",
      get(record_types::get_one::<S>)
        .patch(record_types::update::<S>)
        .delete(record_types::remove::<S>),
    )
    .route(
      "/record-types/{id}/calendar-settings",
      get(record_types::calendar_settings::<S>).patch(record_types::update_calendar_settings::<S>),
    )
    // Fields
    .route(
      "/record-types/{id}/fields",
      get(fields::list::<S>).post(fields::create::<S>),
    )
    .route(
      "/record-types/{id}/fields/{field_id}",
      patch(fields::update::<S>).delete(fields::remove::<S>),
    )
    // Schema
    .route("/record-types/{id}/schema", get(schema::table::<S>))
    .route("/record-types/{id}/migrations", get(schema::migrations::<S>))
    .route("/sync", post(schema::sync_all::<S>))
    // Records
    .route(
      "/records/{record_type}",
      get(records::list::<S>).post(records::create::<S>),
    )
    .route(
      "/records/{record_type}/{id}",
      get(records::get_one::<S>)
        .put(records::update::<S>)
        .patch(records::update::<S>)
        .delete(records::remove::<S>),
    )
    // Calendar
    .route("/calendar/events", get(calendar::events::<S>))
    // Categories
    .route(
      "/categories",
      get(categories::list::<S>).post(categories::create::<S>),
    )
    // Forms
    .route("/forms", get(forms::list::<S>).post(forms::create::<S>))
    .route(
      "/forms/{id}",
      get(forms::get_one::<S>)
        .patch(forms::update::<S>)
        .delete(forms::remove::<S>),
    )
    .with_state(store)
}

/// Reconcile the physical table after a catalog change. Failures are logged
/// and swallowed so a broken sync never blocks the catalog edit itself.
pub(crate) async fn sync_after_change<S: RecordStore>(
  store: &S,
  record_type: &RecordType,
  fields: &[FieldDefinition],
) -> Option<SyncReport> {
  if fields.is_empty() {
    return None;
  }
  match store.ensure_synced(record_type, fields).await {
    Ok(report) => Some(report),
    Err(e) => {
      tracing::warn!(record_type = %record_type.name, error = %e, "schema sync failed");
      None
    }
  }
}
