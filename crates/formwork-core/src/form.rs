//! Form definitions: how a record type's fields are laid out for editing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::field::{FieldDefinition, FieldKind};

/// Width of a field cell within a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldWidth {
  Half,
  Full,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFieldRef {
  pub field_id: String,
  pub width:    FieldWidth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSection {
  pub id:      String,
  pub name:    String,
  pub columns: u8,
  pub fields:  Vec<FormFieldRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormLayout {
  pub sections: Vec<FormSection>,
}

/// A named layout for a record type; at most one per type is the default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
  pub id:             String,
  pub record_type_id: String,
  pub name:           String,
  pub is_default:     bool,
  pub layout:         FormLayout,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

/// Input to [`crate::store::CatalogStore::create_form`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewForm {
  #[serde(default)]
  pub id:             Option<String>,
  pub record_type_id: String,
  pub name:           String,
  #[serde(default)]
  pub is_default:     bool,
  pub layout:         FormLayout,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormPatch {
  pub name:       Option<String>,
  pub is_default: Option<bool>,
  pub layout:     Option<FormLayout>,
}

/// Generate the layout used when a record type is created without one.
///
/// Compact fields go into a two-column "General Information" section in
/// order; textareas get a one-column "Additional Information" section.
pub fn default_layout(fields: &[FieldDefinition]) -> FormLayout {
  let mut sorted: Vec<&FieldDefinition> = fields.iter().collect();
  sorted.sort_by_key(|f| f.order_index);

  let (large, compact): (Vec<&FieldDefinition>, Vec<&FieldDefinition>) = sorted
    .into_iter()
    .partition(|f| f.field_type == FieldKind::Textarea);

  let mut sections = Vec::new();
  if !compact.is_empty() {
    sections.push(FormSection {
      id:      "main".into(),
      name:    "General Information".into(),
      columns: 2,
      fields:  compact
        .iter()
        .map(|f| FormFieldRef { field_id: f.id.clone(), width: FieldWidth::Half })
        .collect(),
    });
  }
  if !large.is_empty() {
    sections.push(FormSection {
      id:      "additional".into(),
      name:    "Additional Information".into(),
      columns: 1,
      fields:  large
        .iter()
        .map(|f| FormFieldRef { field_id: f.id.clone(), width: FieldWidth::Full })
        .collect(),
    });
  }
  if sections.is_empty() {
    sections.push(FormSection {
      id:      "main".into(),
      name:    "Information".into(),
      columns: 2,
      fields:  Vec::new(),
    });
  }

  FormLayout { sections }
}
