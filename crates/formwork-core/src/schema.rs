//! Desired and actual physical schema, and the additive diff between them.
//!
//! Synchronisation runs in two phases: the catalog is turned into a
//! [`DesiredTable`], the backend introspects what exists, and [`diff`] yields
//! the [`SchemaDelta`] to apply. Only additions are ever planned; renames,
//! retypes and drops are out of reach by construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  field::{FieldDefinition, FieldKind},
  naming::{RESERVED_COLUMNS, column_name_for, is_reserved, table_name_for},
  record_type::RecordType,
};

// ─── Desired schema ──────────────────────────────────────────────────────────

/// One physical column implied by a field definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
  pub name:       String,
  pub kind:       FieldKind,
  pub required:   bool,
  pub default:    Option<String>,
  /// Table whose `id` this column references (best-effort declaration).
  pub references: Option<String>,
}

impl ColumnSpec {
  /// Only required fields without a default are declared `NOT NULL`.
  pub fn not_null(&self) -> bool { self.required && self.default.is_none() }
}

/// The table a record type should have, derived from its field definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredTable {
  pub record_type_id: String,
  pub table:          String,
  pub columns:        Vec<ColumnSpec>,
}

impl DesiredTable {
  /// Build the desired table for `record_type`.
  ///
  /// `resolve_reference` maps a relation target type name to its physical
  /// table when that table already exists; unresolved targets simply get no
  /// foreign-key declaration. Fields named after envelope columns are skipped
  /// (the envelope already provides them) and duplicate column names keep the
  /// first definition.
  pub fn from_definition(
    record_type: &RecordType,
    fields: &[FieldDefinition],
    mut resolve_reference: impl FnMut(&str) -> Option<String>,
  ) -> Self {
    let mut columns: Vec<ColumnSpec> = Vec::with_capacity(fields.len());
    for field in fields {
      if is_reserved(&field.field_name) {
        continue;
      }
      let name = column_name_for(record_type, &field.field_name);
      if columns.iter().any(|c| c.name == name) {
        continue;
      }
      let references = match field.field_type {
        FieldKind::Relation => field.relation_target().and_then(&mut resolve_reference),
        _ => None,
      };
      columns.push(ColumnSpec {
        name,
        kind: field.field_type,
        required: field.is_required,
        default: field.default_value.clone(),
        references,
      });
    }

    Self {
      record_type_id: record_type.id.clone(),
      table: table_name_for(record_type),
      columns,
    }
  }

  /// Every column the table should carry, envelope first.
  pub fn column_names(&self) -> impl Iterator<Item = &str> {
    RESERVED_COLUMNS
      .iter()
      .copied()
      .chain(self.columns.iter().map(|c| c.name.as_str()))
  }
}

// ─── Diff ────────────────────────────────────────────────────────────────────

/// What it takes to bring the physical table in line with the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaDelta {
  /// No table exists yet.
  CreateTable(DesiredTable),
  /// The table exists; `missing` columns must be added. `stale` lists
  /// physical columns no field maps to any more; they are kept as-is.
  Alter {
    table:   String,
    missing: Vec<ColumnSpec>,
    stale:   Vec<String>,
  },
}

impl SchemaDelta {
  /// `true` when applying the delta would issue no DDL.
  pub fn is_noop(&self) -> bool {
    matches!(self, Self::Alter { missing, .. } if missing.is_empty())
  }
}

/// Compare the desired table with the introspected column set (`None` when
/// the table does not exist).
pub fn diff(desired: &DesiredTable, actual: Option<&[String]>) -> SchemaDelta {
  let Some(actual) = actual else {
    return SchemaDelta::CreateTable(desired.clone());
  };

  let missing = desired
    .columns
    .iter()
    .filter(|c| !actual.iter().any(|a| a == &c.name))
    .cloned()
    .collect();

  let stale = actual
    .iter()
    .filter(|a| !desired.column_names().any(|d| d == a.as_str()))
    .cloned()
    .collect();

  SchemaDelta::Alter {
    table: desired.table.clone(),
    missing,
    stale,
  }
}

// ─── Migration log ───────────────────────────────────────────────────────────

/// The kind of structural change recorded in the migration log.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeKind {
  CreateTable,
  AddColumn,
  /// The record type was deleted and its table left in place.
  RetainTable,
}

/// An append-only audit entry; written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaMigration {
  pub id:             i64,
  pub record_type_id: String,
  pub change_type:    ChangeKind,
  pub details:        String,
  pub executed_at:    DateTime<Utc>,
}

// ─── Sync outcome ────────────────────────────────────────────────────────────

/// A DDL statement that failed during synchronisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
  /// The table, or `table.column`, the statement targeted.
  pub target:  String,
  pub message: String,
}

/// What a synchronisation pass did. Failures are reported, not raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  pub table:         String,
  pub created_table: bool,
  pub added_columns: Vec<String>,
  pub stale_columns: Vec<String>,
  pub failures:      Vec<SyncFailure>,
}

impl SyncReport {
  /// `true` if the pass issued no successful DDL.
  pub fn is_noop(&self) -> bool { !self.created_table && self.added_columns.is_empty() }
}

/// The physical shape of a dedicated table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
  pub table:   String,
  pub columns: Vec<String>,
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn record_type(name: &str, is_system: bool) -> RecordType {
    RecordType {
      id: format!("rt-{name}"),
      name: name.into(),
      display_name: name.into(),
      category_id: None,
      description: None,
      color: "#6B7280".into(),
      icon: None,
      is_system,
      allow_create: true,
      allow_edit: true,
      allow_delete: true,
      show_in_calendar: true,
      show_in_sidebar: true,
      requires_patient: false,
      requires_visit: false,
      order_index: 0,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  fn field(name: &str, kind: FieldKind) -> FieldDefinition {
    FieldDefinition {
      id: format!("f-{name}"),
      record_type_id: "rt".into(),
      field_name: name.into(),
      display_name: name.into(),
      field_type: kind,
      is_required: false,
      default_value: None,
      options: None,
      validation_rules: None,
      order_index: 0,
      show_in_employee_calendar: false,
      show_on_calendar: false,
      read_only: false,
      is_system: false,
      created_at: Utc::now(),
    }
  }

  fn inventory() -> (RecordType, Vec<FieldDefinition>) {
    let mut item_name = field("item_name", FieldKind::Text);
    item_name.is_required = true;
    let mut quantity = field("quantity", FieldKind::Number);
    quantity.default_value = Some("0".into());
    (record_type("inventory_item", false), vec![item_name, quantity])
  }

  #[test]
  fn desired_table_namespaces_custom_columns() {
    let (rt, fields) = inventory();
    let desired = DesiredTable::from_definition(&rt, &fields, |_| None);
    assert_eq!(desired.table, "cdt_inventory_item");
    let names: Vec<_> = desired.column_names().collect();
    assert_eq!(
      names,
      ["id", "created_at", "updated_at", "created_by", "cf_item_name", "cf_quantity"]
    );
    assert!(desired.columns[0].not_null());
    assert!(!desired.columns[1].not_null());
  }

  #[test]
  fn relation_references_resolve_only_when_known() {
    let rt = record_type("incident", false);
    let mut reporter = field("reporter_id", FieldKind::Relation);
    reporter.options = Some(serde_json::json!({ "record_type": "employee" }));
    let mut witness = field("witness_id", FieldKind::Relation);
    witness.options = Some(serde_json::json!({ "record_type": "visitor" }));

    let desired = DesiredTable::from_definition(&rt, &[reporter, witness], |target| {
      (target == "employee").then(|| "employees".to_owned())
    });
    assert_eq!(desired.columns[0].references.as_deref(), Some("employees"));
    assert_eq!(desired.columns[1].references, None);
  }

  #[test]
  fn reserved_and_duplicate_fields_are_skipped() {
    let rt = record_type("log", true);
    let fields = [
      field("created_by", FieldKind::Text),
      field("entry", FieldKind::Text),
      field("entry", FieldKind::Textarea),
    ];
    let desired = DesiredTable::from_definition(&rt, &fields, |_| None);
    assert_eq!(desired.columns.len(), 1);
    assert_eq!(desired.columns[0].kind, FieldKind::Text);
  }

  #[test]
  fn missing_table_plans_creation() {
    let (rt, fields) = inventory();
    let desired = DesiredTable::from_definition(&rt, &fields, |_| None);
    assert!(matches!(diff(&desired, None), SchemaDelta::CreateTable(_)));
  }

  #[test]
  fn existing_table_plans_only_additions() {
    let (rt, fields) = inventory();
    let desired = DesiredTable::from_definition(&rt, &fields, |_| None);
    let actual: Vec<String> = ["id", "created_at", "updated_at", "created_by", "cf_item_name", "cf_legacy"]
      .into_iter()
      .map(str::to_owned)
      .collect();

    let SchemaDelta::Alter { missing, stale, .. } = diff(&desired, Some(actual.as_slice())) else {
      panic!("expected alter");
    };
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].name, "cf_quantity");
    assert_eq!(stale, ["cf_legacy"]);
  }

  #[test]
  fn up_to_date_table_is_noop() {
    let (rt, fields) = inventory();
    let desired = DesiredTable::from_definition(&rt, &fields, |_| None);
    let actual: Vec<String> = desired.column_names().map(str::to_owned).collect();
    assert!(diff(&desired, Some(actual.as_slice())).is_noop());
  }
}
