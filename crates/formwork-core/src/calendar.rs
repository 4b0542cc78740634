//! Calendar projection: turn dated records of calendar-enabled types into a
//! flat event list, optionally narrowed to one subject (an employee).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  field::FieldDefinition,
  record_type::RecordType,
  store::RecordStore,
  value::{Record, parse_timestamp},
};

/// Fields that identify the people a record involves, whatever the type.
pub const DIRECT_REFERENCE_FIELDS: [&str; 5] = [
  "provider_id",
  "organizer_id",
  "employee_id",
  "primary_provider_id",
  "attendees",
];

// ─── Settings ────────────────────────────────────────────────────────────────

/// Per-type calendar configuration: which field dates a record and which one
/// titles it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSettings {
  pub id:               String,
  pub record_type_id:   String,
  pub date_field:       String,
  pub title_field:      Option<String>,
  pub show_on_calendar: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCalendarSettings {
  #[serde(default)]
  pub id:               Option<String>,
  pub date_field:       String,
  #[serde(default)]
  pub title_field:      Option<String>,
  #[serde(default = "default_show")]
  pub show_on_calendar: bool,
}

fn default_show() -> bool { true }

impl NewCalendarSettings {
  pub fn new(date_field: impl Into<String>) -> Self {
    Self {
      id:               None,
      date_field:       date_field.into(),
      title_field:      None,
      show_on_calendar: true,
    }
  }

  pub fn titled(mut self, title_field: impl Into<String>) -> Self {
    self.title_field = Some(title_field.into());
    self
  }

  pub fn resolve_id(&self, record_type_id: &str) -> String {
    self
      .id
      .clone()
      .unwrap_or_else(|| format!("cal-{record_type_id}"))
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarSettingsPatch {
  pub date_field:       Option<String>,
  pub title_field:      Option<String>,
  pub show_on_calendar: Option<bool>,
}

impl CalendarSettingsPatch {
  pub fn apply(self, target: &mut CalendarSettings) {
    if let Some(v) = self.date_field {
      target.date_field = v;
    }
    if let Some(v) = self.title_field {
      target.title_field = Some(v);
    }
    if let Some(v) = self.show_on_calendar {
      target.show_on_calendar = v;
    }
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// One record rendered as a calendar entry. Recomputed on every query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
  pub id:                  String,
  pub title:               String,
  pub date:                DateTime<Utc>,
  pub color:               String,
  pub record_type:         String,
  pub record_type_display: String,
  pub data:                Record,
}

/// Filters for [`project_events`]. Both date bounds are inclusive and
/// optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventQuery {
  pub start:   Option<NaiveDate>,
  pub end:     Option<NaiveDate>,
  /// Only keep records that reference this id.
  pub subject: Option<String>,
}

impl EventQuery {
  pub fn for_subject(subject: impl Into<String>) -> Self {
    Self {
      subject: Some(subject.into()),
      ..Default::default()
    }
  }

  fn in_range(&self, date: NaiveDate) -> bool {
    self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
  }
}

/// Whether `record` involves `subject` through a well-known reference field
/// or any field flagged `show_in_employee_calendar`.
pub fn is_relevant(record: &Record, fields: &[FieldDefinition], subject: &str) -> bool {
  let flagged = fields
    .iter()
    .filter(|f| f.show_in_employee_calendar)
    .map(|f| f.field_name.as_str());

  DIRECT_REFERENCE_FIELDS
    .into_iter()
    .chain(flagged)
    .filter_map(|name| record.value(name))
    .any(|value| value.references(subject))
}

/// Project a single record. `None` when it has no parseable date, falls
/// outside the range, or is irrelevant to the subject.
pub fn project_record(
  record_type: &RecordType,
  settings: &CalendarSettings,
  fields: &[FieldDefinition],
  record: Record,
  query: &EventQuery,
) -> Option<CalendarEvent> {
  let date = record
    .value(&settings.date_field)?
    .as_text()
    .and_then(parse_timestamp)?;
  if !query.in_range(date.date_naive()) {
    return None;
  }
  if let Some(subject) = &query.subject {
    if !is_relevant(&record, fields, subject) {
      return None;
    }
  }

  let title = settings
    .title_field
    .as_deref()
    .and_then(|name| record.value(name))
    .and_then(|value| value.display())
    .unwrap_or_else(|| record_type.display_name.clone());

  Some(CalendarEvent {
    id: record.id.clone(),
    title,
    date,
    color: record_type.color.clone(),
    record_type: record_type.name.clone(),
    record_type_display: record_type.display_name.clone(),
    data: record,
  })
}

/// Scan every calendar-enabled record type and collect its events in date
/// order.
pub async fn project_events<S: RecordStore>(
  store: &S,
  query: &EventQuery,
) -> Result<Vec<CalendarEvent>, S::Error> {
  let mut events = Vec::new();

  for record_type in store.list_types().await? {
    let Some(settings) = store.calendar_settings(&record_type.id).await? else {
      continue;
    };
    if !settings.show_on_calendar {
      continue;
    }
    let fields = store.list_fields(&record_type.id).await?;
    for record in store.list_records(&record_type).await? {
      if let Some(event) = project_record(&record_type, &settings, &fields, record, query) {
        events.push(event);
      }
    }
  }

  events.sort_by_key(|e| e.date);
  Ok(events)
}
