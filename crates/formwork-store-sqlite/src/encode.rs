//! Encoding and decoding helpers between Formwork domain types and the
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 text. Structured catalog attributes
//! (field options, form layouts) are stored as compact JSON. Rows are first
//! read into `Raw*` structs inside the connection thread and decoded on the
//! async side.

use std::{collections::HashMap, str::FromStr as _};

use chrono::{DateTime, Utc};
use formwork_core::{
  calendar::CalendarSettings,
  field::{FieldDefinition, FieldKind},
  form::FormDefinition,
  record_type::{RecordCategory, RecordType},
  schema::{ChangeKind, SchemaMigration},
  value::{FieldValue, Record, RecordData, encode_timestamp, parse_timestamp},
};
use rusqlite::{
  Row,
  types::{Value, ValueRef},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { encode_timestamp(dt) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  parse_timestamp(s).ok_or_else(|| Error::DateParse(format!("unrecognised timestamp {s:?}")))
}

// ─── FieldKind ───────────────────────────────────────────────────────────────

pub fn decode_kind(s: &str) -> Result<FieldKind> {
  FieldKind::from_str(s).map_err(|_| Error::UnknownFieldKind(s.to_owned()))
}

// ─── FieldValue ──────────────────────────────────────────────────────────────

/// Bind a value to a column. Lists are stored as JSON text and booleans as
/// integers.
pub fn encode_value(value: &FieldValue) -> Result<Value> {
  Ok(match value {
    FieldValue::Null => Value::Null,
    FieldValue::Bool(b) => Value::Integer(i64::from(*b)),
    FieldValue::Integer(i) => Value::Integer(*i),
    FieldValue::Real(f) => Value::Real(*f),
    FieldValue::Text(s) => Value::Text(s.clone()),
    FieldValue::List(items) => Value::Text(serde_json::to_string(items)?),
  })
}

pub fn decode_value(value: ValueRef<'_>) -> FieldValue {
  match value {
    ValueRef::Null => FieldValue::Null,
    ValueRef::Integer(i) => FieldValue::Integer(i),
    ValueRef::Real(f) => FieldValue::Real(f),
    ValueRef::Text(t) | ValueRef::Blob(t) => {
      FieldValue::Text(String::from_utf8_lossy(t).into_owned())
    }
  }
}

/// Record ids: `{type name}-{unix millis}-{9 random hex chars}`.
pub fn new_record_id(type_name: &str, now: DateTime<Utc>) -> String {
  let random = Uuid::new_v4().simple().to_string();
  format!("{type_name}-{}-{}", now.timestamp_millis(), &random[..9])
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// The stored body of a record: named column values from a dedicated table,
/// or the JSON document from the fallback table.
pub enum RawBody {
  Columns(RecordData),
  Json(String),
}

/// A record as read from either physical representation, before timestamp
/// parsing and kind normalisation.
pub struct RawRecord {
  pub id:         String,
  pub created_at: Option<String>,
  pub updated_at: Option<String>,
  pub created_by: Option<String>,
  pub body:       RawBody,
}

impl RawRecord {
  /// `kinds` maps logical field names to their kinds; values of unknown
  /// fields are passed through untouched.
  pub fn into_record(self, kinds: &HashMap<String, FieldKind>) -> Result<Record> {
    let fields = match self.body {
      RawBody::Columns(data) => data,
      RawBody::Json(text) => serde_json::from_str(&text)?,
    };
    let fields = fields
      .into_iter()
      .map(|(name, value)| {
        let value = match kinds.get(&name) {
          Some(kind) => value.normalize(*kind),
          None => value,
        };
        (name, value)
      })
      .collect();

    let created_at = decode_dt(self.created_at.as_deref().unwrap_or_default())?;
    let updated_at = match self.updated_at.as_deref() {
      Some(s) => decode_dt(s)?,
      None => created_at,
    };

    Ok(Record {
      id: self.id,
      created_at,
      updated_at,
      created_by: self.created_by,
      fields,
    })
  }
}

// ─── RecordType ──────────────────────────────────────────────────────────────

pub const TYPE_COLUMNS: &str = "id, name, display_name, category_id, description, color, icon, \
  is_system, allow_create, allow_edit, allow_delete, show_in_calendar, show_in_sidebar, \
  requires_patient, requires_visit, order_index, created_at, updated_at";

pub struct RawRecordType {
  pub id:               String,
  pub name:             String,
  pub display_name:     String,
  pub category_id:      Option<String>,
  pub description:      Option<String>,
  pub color:            String,
  pub icon:             Option<String>,
  pub is_system:        bool,
  pub allow_create:     bool,
  pub allow_edit:       bool,
  pub allow_delete:     bool,
  pub show_in_calendar: bool,
  pub show_in_sidebar:  bool,
  pub requires_patient: bool,
  pub requires_visit:   bool,
  pub order_index:      i64,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawRecordType {
  /// Read a row selected with [`TYPE_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      name:             row.get(1)?,
      display_name:     row.get(2)?,
      category_id:      row.get(3)?,
      description:      row.get(4)?,
      color:            row.get(5)?,
      icon:             row.get(6)?,
      is_system:        row.get(7)?,
      allow_create:     row.get(8)?,
      allow_edit:       row.get(9)?,
      allow_delete:     row.get(10)?,
      show_in_calendar: row.get(11)?,
      show_in_sidebar:  row.get(12)?,
      requires_patient: row.get(13)?,
      requires_visit:   row.get(14)?,
      order_index:      row.get(15)?,
      created_at:       row.get(16)?,
      updated_at:       row.get(17)?,
    })
  }

  pub fn into_record_type(self) -> Result<RecordType> {
    Ok(RecordType {
      id:               self.id,
      name:             self.name,
      display_name:     self.display_name,
      category_id:      self.category_id,
      description:      self.description,
      color:            self.color,
      icon:             self.icon,
      is_system:        self.is_system,
      allow_create:     self.allow_create,
      allow_edit:       self.allow_edit,
      allow_delete:     self.allow_delete,
      show_in_calendar: self.show_in_calendar,
      show_in_sidebar:  self.show_in_sidebar,
      requires_patient: self.requires_patient,
      requires_visit:   self.requires_visit,
      order_index:      self.order_index,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}

// ─── FieldDefinition ─────────────────────────────────────────────────────────

pub const FIELD_COLUMNS: &str = "id, record_type_id, field_name, display_name, field_type, \
  is_required, default_value, options, validation_rules, order_index, \
  show_in_employee_calendar, show_on_calendar, read_only, is_system, created_at";

pub struct RawField {
  pub id:                        String,
  pub record_type_id:            String,
  pub field_name:                String,
  pub display_name:              String,
  pub field_type:                String,
  pub is_required:               bool,
  pub default_value:             Option<String>,
  pub options:                   Option<String>,
  pub validation_rules:          Option<String>,
  pub order_index:               i64,
  pub show_in_employee_calendar: bool,
  pub show_on_calendar:          bool,
  pub read_only:                 bool,
  pub is_system:                 bool,
  pub created_at:                String,
}

impl RawField {
  /// Read a row selected with [`FIELD_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                        row.get(0)?,
      record_type_id:            row.get(1)?,
      field_name:                row.get(2)?,
      display_name:              row.get(3)?,
      field_type:                row.get(4)?,
      is_required:               row.get(5)?,
      default_value:             row.get(6)?,
      options:                   row.get(7)?,
      validation_rules:          row.get(8)?,
      order_index:               row.get(9)?,
      show_in_employee_calendar: row.get(10)?,
      show_on_calendar:          row.get(11)?,
      read_only:                 row.get(12)?,
      is_system:                 row.get(13)?,
      created_at:                row.get(14)?,
    })
  }

  pub fn into_field(self) -> Result<FieldDefinition> {
    Ok(FieldDefinition {
      id:                        self.id,
      record_type_id:            self.record_type_id,
      field_name:                self.field_name,
      display_name:              self.display_name,
      field_type:                decode_kind(&self.field_type)?,
      is_required:               self.is_required,
      default_value:             self.default_value,
      options:                   self.options.map(decode_options),
      validation_rules:          self.validation_rules,
      order_index:               self.order_index,
      show_in_employee_calendar: self.show_in_employee_calendar,
      show_on_calendar:          self.show_on_calendar,
      read_only:                 self.read_only,
      is_system:                 self.is_system,
      created_at:                decode_dt(&self.created_at)?,
    })
  }
}

/// Malformed option payloads are kept as a plain string, which no relation
/// lookup will match.
fn decode_options(text: String) -> serde_json::Value {
  serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
}

pub fn encode_options(options: Option<&serde_json::Value>) -> Result<Option<String>> {
  Ok(options.map(serde_json::to_string).transpose()?)
}

// ─── RecordCategory ──────────────────────────────────────────────────────────

pub const CATEGORY_COLUMNS: &str =
  "id, name, display_name, description, icon, color, order_index, is_system, created_at, updated_at";

pub struct RawCategory {
  pub id:           String,
  pub name:         String,
  pub display_name: String,
  pub description:  Option<String>,
  pub icon:         Option<String>,
  pub color:        String,
  pub order_index:  i64,
  pub is_system:    bool,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawCategory {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      name:         row.get(1)?,
      display_name: row.get(2)?,
      description:  row.get(3)?,
      icon:         row.get(4)?,
      color:        row.get(5)?,
      order_index:  row.get(6)?,
      is_system:    row.get(7)?,
      created_at:   row.get(8)?,
      updated_at:   row.get(9)?,
    })
  }

  pub fn into_category(self) -> Result<RecordCategory> {
    Ok(RecordCategory {
      id:           self.id,
      name:         self.name,
      display_name: self.display_name,
      description:  self.description,
      icon:         self.icon,
      color:        self.color,
      order_index:  self.order_index,
      is_system:    self.is_system,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

// ─── FormDefinition ──────────────────────────────────────────────────────────

pub const FORM_COLUMNS: &str =
  "id, record_type_id, name, is_default, layout, created_at, updated_at";

pub struct RawForm {
  pub id:             String,
  pub record_type_id: String,
  pub name:           String,
  pub is_default:     bool,
  pub layout:         String,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawForm {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      record_type_id: row.get(1)?,
      name:           row.get(2)?,
      is_default:     row.get(3)?,
      layout:         row.get(4)?,
      created_at:     row.get(5)?,
      updated_at:     row.get(6)?,
    })
  }

  pub fn into_form(self) -> Result<FormDefinition> {
    Ok(FormDefinition {
      id:             self.id,
      record_type_id: self.record_type_id,
      name:           self.name,
      is_default:     self.is_default,
      layout:         serde_json::from_str(&self.layout)?,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

// ─── CalendarSettings ────────────────────────────────────────────────────────

pub const CALENDAR_COLUMNS: &str =
  "id, record_type_id, date_field, title_field, show_on_calendar";

pub fn calendar_from_row(row: &Row<'_>) -> rusqlite::Result<CalendarSettings> {
  Ok(CalendarSettings {
    id:               row.get(0)?,
    record_type_id:   row.get(1)?,
    date_field:       row.get(2)?,
    title_field:      row.get(3)?,
    show_on_calendar: row.get(4)?,
  })
}

// ─── SchemaMigration ─────────────────────────────────────────────────────────

pub struct RawMigration {
  pub id:             i64,
  pub record_type_id: String,
  pub change_type:    String,
  pub details:        String,
  pub executed_at:    String,
}

impl RawMigration {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      record_type_id: row.get(1)?,
      change_type:    row.get(2)?,
      details:        row.get(3)?,
      executed_at:    row.get(4)?,
    })
  }

  pub fn into_migration(self) -> Result<SchemaMigration> {
    let change_type = ChangeKind::from_str(&self.change_type)
      .map_err(|_| Error::Decode(format!("change type {:?}", self.change_type)))?;
    Ok(SchemaMigration {
      id: self.id,
      record_type_id: self.record_type_id,
      change_type,
      details: self.details,
      executed_at: decode_dt(&self.executed_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn record_ids_embed_type_and_time() {
    let now = Utc::now();
    let id = new_record_id("inventory_item", now);
    let rest = id.strip_prefix("inventory_item-").unwrap();
    let (millis, random) = rest.split_once('-').unwrap();
    assert_eq!(millis, now.timestamp_millis().to_string());
    assert_eq!(random.len(), 9);
  }

  #[test]
  fn lists_are_stored_as_json_text() {
    let value = FieldValue::List(vec!["emp-1".into(), "emp-2".into()]);
    assert_eq!(
      encode_value(&value).unwrap(),
      Value::Text(r#"["emp-1","emp-2"]"#.into())
    );
    assert_eq!(encode_value(&FieldValue::Bool(true)).unwrap(), Value::Integer(1));
  }

  #[test]
  fn raw_columns_decode_with_kind_normalisation() {
    let mut data = RecordData::new();
    data.insert("quantity".into(), FieldValue::Real(50.0));
    data.insert("legacy".into(), FieldValue::Real(1.0));
    let raw = RawRecord {
      id:         "inventory_item-1-abc".into(),
      created_at: Some("2024-05-01T10:00:00Z".into()),
      updated_at: Some("2024-05-01 10:00:00".into()),
      created_by: None,
      body:       RawBody::Columns(data),
    };
    let kinds = HashMap::from([("quantity".to_owned(), FieldKind::Number)]);
    let record = raw.into_record(&kinds).unwrap();
    assert_eq!(record.fields["quantity"], FieldValue::Integer(50));
    assert_eq!(record.fields["legacy"], FieldValue::Real(1.0));
  }

  #[test]
  fn unparseable_envelope_timestamp_is_an_error() {
    let raw = RawRecord {
      id:         "x".into(),
      created_at: Some("yesterday".into()),
      updated_at: None,
      created_by: None,
      body:       RawBody::Json("{}".into()),
    };
    assert!(matches!(raw.into_record(&HashMap::new()), Err(Error::DateParse(_))));
  }

  #[test]
  fn malformed_options_survive_as_text() {
    let value = decode_options("{not json".into());
    assert_eq!(value, serde_json::Value::String("{not json".into()));
  }
}
