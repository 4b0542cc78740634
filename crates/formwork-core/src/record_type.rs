//! Record types and the categories that group them.
//!
//! A record type is the logical description of an entity kind (Patient,
//! Prescription, Incident Report). Its `name` is baked into the physical table
//! name the first time the type is synchronised, so it never changes after
//! creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Category assigned to record types created without one.
pub const DEFAULT_CATEGORY_ID: &str = "cat-custom";

// ─── Record type ─────────────────────────────────────────────────────────────

/// A logical entity type with a name, presentation metadata and permission
/// flags. Its fields live in [`crate::field::FieldDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordType {
  pub id:               String,
  /// Internal name; immutable, used for physical naming and lookups.
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
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

/// Input to [`crate::store::CatalogStore::create_type`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecordType {
  /// Caller-supplied id; generated when absent.
  #[serde(default)]
  pub id:               Option<String>,
  pub name:             String,
  pub display_name:     String,
  #[serde(default)]
  pub category_id:      Option<String>,
  #[serde(default)]
  pub description:      Option<String>,
  #[serde(default = "default_color")]
  pub color:            String,
  #[serde(default)]
  pub icon:             Option<String>,
  #[serde(default)]
  pub is_system:        bool,
  #[serde(default = "default_true")]
  pub allow_create:     bool,
  #[serde(default = "default_true")]
  pub allow_edit:       bool,
  #[serde(default = "default_true")]
  pub allow_delete:     bool,
  #[serde(default = "default_true")]
  pub show_in_calendar: bool,
  #[serde(default = "default_true")]
  pub show_in_sidebar:  bool,
  #[serde(default)]
  pub requires_patient: bool,
  #[serde(default)]
  pub requires_visit:   bool,
  #[serde(default)]
  pub order_index:      i64,
}

fn default_color() -> String { "#6B7280".to_owned() }

fn default_true() -> bool { true }

impl NewRecordType {
  /// Convenience constructor for a custom type with default flags.
  pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
    Self {
      id:               None,
      name:             name.into(),
      display_name:     display_name.into(),
      category_id:      None,
      description:      None,
      color:            default_color(),
      icon:             None,
      is_system:        false,
      allow_create:     true,
      allow_edit:       true,
      allow_delete:     true,
      show_in_calendar: true,
      show_in_sidebar:  true,
      requires_patient: false,
      requires_visit:   false,
      order_index:      0,
    }
  }

  /// Mark the new type as a protected system type.
  pub fn system(mut self) -> Self {
    self.is_system = true;
    self
  }

  /// Resolve the id and category defaults and validate the name.
  pub fn resolve_id(&self) -> Result<String> {
    validate_type_name(&self.name)?;
    Ok(
      self
        .id
        .clone()
        .unwrap_or_else(|| format!("rt-{}", Uuid::new_v4().simple())),
    )
  }

  pub fn category_or_default(&self) -> String {
    self
      .category_id
      .clone()
      .unwrap_or_else(|| DEFAULT_CATEGORY_ID.to_owned())
  }
}

/// A type name must be non-empty and free of control characters. Anything
/// outside `[A-Za-z0-9_]` is replaced when the table name is derived.
fn validate_type_name(name: &str) -> Result<()> {
  if name.trim().is_empty() || name.chars().any(char::is_control) {
    return Err(Error::InvalidRecordTypeName(name.to_owned()));
  }
  Ok(())
}

/// Partial update accepted by [`crate::store::CatalogStore::update_type`].
/// `name` and `is_system` are absent on purpose: both are fixed at creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordTypePatch {
  pub display_name:     Option<String>,
  pub category_id:      Option<String>,
  pub description:      Option<String>,
  pub color:            Option<String>,
  pub icon:             Option<String>,
  pub allow_create:     Option<bool>,
  pub allow_edit:       Option<bool>,
  pub allow_delete:     Option<bool>,
  pub show_in_calendar: Option<bool>,
  pub show_in_sidebar:  Option<bool>,
  pub requires_patient: Option<bool>,
  pub requires_visit:   Option<bool>,
  pub order_index:      Option<i64>,
}

impl RecordTypePatch {
  /// `true` if the patch touches attributes that system types protect.
  pub fn touches_structure(&self) -> bool {
    self.allow_create.is_some()
      || self.allow_edit.is_some()
      || self.allow_delete.is_some()
      || self.requires_patient.is_some()
      || self.requires_visit.is_some()
  }

  /// Reject the patch if it would structurally edit a system type.
  pub fn check_allowed(&self, target: &RecordType) -> Result<()> {
    if target.is_system && self.touches_structure() {
      return Err(Error::SystemRecordType(target.name.clone(), "restructured"));
    }
    Ok(())
  }

  /// Apply the patch to an in-memory copy.
  pub fn apply(self, target: &mut RecordType) {
    if let Some(v) = self.display_name {
      target.display_name = v;
    }
    if let Some(v) = self.category_id {
      target.category_id = Some(v);
    }
    if let Some(v) = self.description {
      target.description = Some(v);
    }
    if let Some(v) = self.color {
      target.color = v;
    }
    if let Some(v) = self.icon {
      target.icon = Some(v);
    }
    if let Some(v) = self.allow_create {
      target.allow_create = v;
    }
    if let Some(v) = self.allow_edit {
      target.allow_edit = v;
    }
    if let Some(v) = self.allow_delete {
      target.allow_delete = v;
    }
    if let Some(v) = self.show_in_calendar {
      target.show_in_calendar = v;
    }
    if let Some(v) = self.show_in_sidebar {
      target.show_in_sidebar = v;
    }
    if let Some(v) = self.requires_patient {
      target.requires_patient = v;
    }
    if let Some(v) = self.requires_visit {
      target.requires_visit = v;
    }
    if let Some(v) = self.order_index {
      target.order_index = v;
    }
  }
}

// ─── Category ────────────────────────────────────────────────────────────────

/// A sidebar grouping of record types (Clinical, Pharmacy, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordCategory {
  pub id:           String,
  pub name:         String,
  pub display_name: String,
  pub description:  Option<String>,
  pub icon:         Option<String>,
  pub color:        String,
  pub order_index:  i64,
  pub is_system:    bool,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

/// Input to [`crate::store::CatalogStore::create_category`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
  pub id:           String,
  pub name:         String,
  pub display_name: String,
  #[serde(default)]
  pub description:  Option<String>,
  #[serde(default)]
  pub icon:         Option<String>,
  #[serde(default = "default_color")]
  pub color:        String,
  #[serde(default = "default_category_order")]
  pub order_index:  i64,
  #[serde(default)]
  pub is_system:    bool,
}

fn default_category_order() -> i64 { 999 }

/// A category bundled with the sidebar-visible record types it contains.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithTypes {
  #[serde(flatten)]
  pub category:     RecordCategory,
  pub record_types: Vec<RecordType>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn system_type() -> RecordType {
    RecordType {
      id:               "meeting".into(),
      name:             "meeting".into(),
      display_name:     "Meeting".into(),
      category_id:      None,
      description:      None,
      color:            "#F59E0B".into(),
      icon:             None,
      is_system:        true,
      allow_create:     true,
      allow_edit:       true,
      allow_delete:     true,
      show_in_calendar: true,
      show_in_sidebar:  true,
      requires_patient: false,
      requires_visit:   false,
      order_index:      0,
      created_at:       Utc::now(),
      updated_at:       Utc::now(),
    }
  }

  #[test]
  fn presentation_patch_allowed_on_system_type() {
    let mut target = system_type();
    let patch = RecordTypePatch {
      display_name: Some("Team Meeting".into()),
      color: Some("#000000".into()),
      ..Default::default()
    };
    patch.check_allowed(&target).unwrap();
    patch.apply(&mut target);
    assert_eq!(target.display_name, "Team Meeting");
    assert_eq!(target.color, "#000000");
  }

  #[test]
  fn permission_patch_rejected_on_system_type() {
    let target = system_type();
    let patch = RecordTypePatch {
      allow_delete: Some(false),
      ..Default::default()
    };
    let err = patch.check_allowed(&target).unwrap_err();
    assert!(err.is_protected());
  }

  #[test]
  fn generated_ids_are_prefixed() {
    let id = NewRecordType::new("inventory_item", "Inventory Item")
      .resolve_id()
      .unwrap();
    assert!(id.starts_with("rt-"));
  }

  #[test]
  fn blank_type_name_rejected() {
    let err = NewRecordType::new("  ", "Blank").resolve_id().unwrap_err();
    assert!(matches!(err, Error::InvalidRecordTypeName(_)));
  }
}
