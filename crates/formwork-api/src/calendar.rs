//! Handler for `GET /calendar/events`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::NaiveDate;
use formwork_core::{
  calendar::{CalendarEvent, EventQuery, project_events},
  store::RecordStore,
};
use serde::Deserialize;

use crate::error::ApiError;

/// `?start=YYYY-MM-DD&end=YYYY-MM-DD&employeeId=<id>`, all optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventParams {
  pub start:       Option<NaiveDate>,
  pub end:         Option<NaiveDate>,
  pub employee_id: Option<String>,
}

impl From<EventParams> for EventQuery {
  fn from(params: EventParams) -> Self {
    EventQuery {
      start:   params.start,
      end:     params.end,
      subject: params.employee_id.filter(|id| !id.is_empty()),
    }
  }
}

/// `GET /calendar/events`
pub async fn events<S: RecordStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<EventParams>,
) -> Result<Json<Vec<CalendarEvent>>, ApiError> {
  let query = EventQuery::from(params);
  let events = project_events(&*store, &query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(events))
}
