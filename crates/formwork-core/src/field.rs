//! Field definitions: the typed attributes of a record type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  naming::{CUSTOM_FIELD_PREFIX, is_reserved},
};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The closed set of field kinds. The snake_case name is what the catalog
/// stores in `field_definitions.field_type`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldKind {
  Text,
  Textarea,
  Number,
  Date,
  Datetime,
  Boolean,
  Select,
  /// A list of values, stored JSON-serialised.
  Multiselect,
  /// A reference to another record, usually by id.
  Relation,
}

impl FieldKind {
  /// Kinds whose values are JSON arrays at rest.
  pub fn is_list(self) -> bool { matches!(self, Self::Multiselect) }

  /// Kinds that can carry a date for calendar projection.
  pub fn is_temporal(self) -> bool { matches!(self, Self::Date | Self::Datetime) }
}

// ─── Definition ──────────────────────────────────────────────────────────────

/// One field of a record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
  pub id:                        String,
  pub record_type_id:            String,
  /// Logical name; the column name is derived by [`crate::naming`].
  pub field_name:                String,
  pub display_name:              String,
  pub field_type:                FieldKind,
  pub is_required:               bool,
  pub default_value:             Option<String>,
  /// Kind-specific payload: choice lists for `select`, `{"record_type": ..}`
  /// targets for `relation` and `multiselect`.
  pub options:                   Option<serde_json::Value>,
  pub validation_rules:          Option<String>,
  pub order_index:               i64,
  /// Whether a match on this field makes a record relevant to a calendar
  /// subject.
  pub show_in_employee_calendar: bool,
  pub show_on_calendar:          bool,
  pub read_only:                 bool,
  pub is_system:                 bool,
  pub created_at:                DateTime<Utc>,
}

impl FieldDefinition {
  /// The record type named by a `relation`/`multiselect` options payload.
  /// Malformed or missing options yield `None`.
  pub fn relation_target(&self) -> Option<&str> {
    relation_target(self.options.as_ref())
  }
}

pub(crate) fn relation_target(options: Option<&serde_json::Value>) -> Option<&str> {
  options?.get("record_type")?.as_str()
}

/// Input to [`crate::store::CatalogStore::create_field`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewField {
  #[serde(default)]
  pub id:                        Option<String>,
  pub field_name:                String,
  pub display_name:              String,
  pub field_type:                FieldKind,
  #[serde(default)]
  pub is_required:               bool,
  #[serde(default)]
  pub default_value:             Option<String>,
  #[serde(default)]
  pub options:                   Option<serde_json::Value>,
  #[serde(default)]
  pub validation_rules:          Option<String>,
  /// Appended after the current last field when absent.
  #[serde(default)]
  pub order_index:               Option<i64>,
  #[serde(default)]
  pub show_in_employee_calendar: bool,
  #[serde(default)]
  pub show_on_calendar:          bool,
  #[serde(default)]
  pub read_only:                 bool,
  #[serde(default)]
  pub is_system:                 bool,
}

impl NewField {
  /// Convenience constructor with all optional attributes unset.
  pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
    let field_name = name.into();
    Self {
      id: None,
      display_name: field_name.clone(),
      field_name,
      field_type: kind,
      is_required: false,
      default_value: None,
      options: None,
      validation_rules: None,
      order_index: None,
      show_in_employee_calendar: false,
      show_on_calendar: false,
      read_only: false,
      is_system: false,
    }
  }

  pub fn required(mut self) -> Self {
    self.is_required = true;
    self
  }

  pub fn with_default(mut self, value: impl Into<String>) -> Self {
    self.default_value = Some(value.into());
    self
  }

  pub fn with_options(mut self, options: serde_json::Value) -> Self {
    self.options = Some(options);
    self
  }

  pub fn calendar_relevant(mut self) -> Self {
    self.show_in_employee_calendar = true;
    self
  }

  pub fn resolve_id(&self) -> String {
    self
      .id
      .clone()
      .unwrap_or_else(|| format!("field-{}", Uuid::new_v4().simple()))
  }
}

/// Partial update accepted by [`crate::store::CatalogStore::update_field`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldPatch {
  pub field_name:                Option<String>,
  pub display_name:              Option<String>,
  pub field_type:                Option<FieldKind>,
  pub is_required:               Option<bool>,
  pub default_value:             Option<String>,
  pub options:                   Option<serde_json::Value>,
  pub validation_rules:          Option<String>,
  pub order_index:               Option<i64>,
  pub show_in_employee_calendar: Option<bool>,
  pub show_on_calendar:          Option<bool>,
  pub read_only:                 Option<bool>,
}

impl FieldPatch {
  pub fn apply(self, target: &mut FieldDefinition) {
    if let Some(v) = self.field_name {
      target.field_name = v;
    }
    if let Some(v) = self.display_name {
      target.display_name = v;
    }
    if let Some(v) = self.field_type {
      target.field_type = v;
    }
    if let Some(v) = self.is_required {
      target.is_required = v;
    }
    if let Some(v) = self.default_value {
      target.default_value = Some(v);
    }
    if let Some(v) = self.options {
      target.options = Some(v);
    }
    if let Some(v) = self.validation_rules {
      target.validation_rules = Some(v);
    }
    if let Some(v) = self.order_index {
      target.order_index = v;
    }
    if let Some(v) = self.show_in_employee_calendar {
      target.show_in_employee_calendar = v;
    }
    if let Some(v) = self.show_on_calendar {
      target.show_on_calendar = v;
    }
    if let Some(v) = self.read_only {
      target.read_only = v;
    }
  }
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Check a logical field name before it enters the catalog.
///
/// Names must be SQL-identifier shaped, must not be one of the reserved
/// envelope columns, and must not carry the custom-field namespace prefix
/// (otherwise stripping the prefix on read would not give the name back).
pub fn validate_field_name(name: &str) -> Result<()> {
  let mut chars = name.chars();
  let starts_ok = chars
    .next()
    .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
  if !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
    return Err(Error::InvalidFieldName(
      name.to_owned(),
      "must match [A-Za-z_][A-Za-z0-9_]*",
    ));
  }
  if is_reserved(name) {
    return Err(Error::InvalidFieldName(
      name.to_owned(),
      "collides with a reserved column",
    ));
  }
  if name.starts_with(CUSTOM_FIELD_PREFIX) {
    return Err(Error::InvalidFieldName(
      name.to_owned(),
      "uses the reserved cf_ namespace",
    ));
  }
  Ok(())
}
