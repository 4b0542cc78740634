//! Physical naming rules.
//!
//! Every component that touches physical storage derives table and column
//! names through these functions; nothing else builds them. The functions are
//! pure so the synchroniser and the record access layer agree on names without
//! sharing state.

use crate::record_type::RecordType;

/// Envelope columns present on every dedicated table.
pub const RESERVED_COLUMNS: [&str; 4] = ["id", "created_at", "updated_at", "created_by"];

/// Namespace prefix for custom-type field columns.
pub const CUSTOM_FIELD_PREFIX: &str = "cf_";

/// Built-in types that predate generated naming keep their hand-picked tables.
const LEGACY_TABLES: [(&str, &str); 4] = [
  ("employee", "employees"),
  ("patient", "patients"),
  ("visit", "visits"),
  ("meeting", "meetings"),
];

/// Shared table holding JSON documents for types without a dedicated table.
pub const FALLBACK_TABLE: &str = "dynamic_records";

pub fn is_reserved(name: &str) -> bool { RESERVED_COLUMNS.contains(&name) }

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize(name: &str) -> String {
  name
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
    .collect()
}

/// The physical table for `record_type`.
pub fn table_name_for(record_type: &RecordType) -> String {
  table_name(&record_type.name, record_type.is_system)
}

/// [`table_name_for`] on the two attributes it reads.
pub fn table_name(name: &str, is_system: bool) -> String {
  if let Some((_, table)) = LEGACY_TABLES.iter().find(|(legacy, _)| *legacy == name) {
    return (*table).to_owned();
  }
  if is_system {
    format!("dt_{}", sanitize(name))
  } else {
    format!("cdt_{}", sanitize(name))
  }
}

/// The physical column for logical field `field_name` of `record_type`.
///
/// Idempotent: a name already carrying the prefix is returned unchanged.
pub fn column_name_for(record_type: &RecordType, field_name: &str) -> String {
  column_name(record_type.is_system, field_name)
}

/// [`column_name_for`] on the one attribute of the record type it reads.
pub fn column_name(is_system: bool, field_name: &str) -> String {
  if is_system || is_reserved(field_name) || field_name.starts_with(CUSTOM_FIELD_PREFIX) {
    field_name.to_owned()
  } else {
    format!("{CUSTOM_FIELD_PREFIX}{field_name}")
  }
}

/// The logical name exposed to callers for physical `column`; inverse of
/// [`column_name_for`].
pub fn logical_name_for<'a>(record_type: &RecordType, column: &'a str) -> &'a str {
  logical_name(record_type.is_system, column)
}

pub fn logical_name(is_system: bool, column: &str) -> &str {
  if is_system {
    return column;
  }
  column.strip_prefix(CUSTOM_FIELD_PREFIX).unwrap_or(column)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn legacy_types_keep_their_tables() {
    assert_eq!(table_name("employee", true), "employees");
    assert_eq!(table_name("meeting", false), "meetings");
  }

  #[test]
  fn generated_tables_are_prefixed_and_sanitised() {
    assert_eq!(table_name("prescription", true), "dt_prescription");
    assert_eq!(table_name("inventory_item", false), "cdt_inventory_item");
    assert_eq!(table_name("incident report-v2", false), "cdt_incident_report_v2");
  }

  #[test]
  fn custom_columns_are_namespaced_once() {
    assert_eq!(column_name(false, "quantity"), "cf_quantity");
    assert_eq!(column_name(false, "cf_quantity"), "cf_quantity");
    assert_eq!(column_name(false, "created_by"), "created_by");
    assert_eq!(column_name(true, "quantity"), "quantity");
  }

  #[test]
  fn logical_names_round_trip() {
    for name in ["item_name", "quantity", "a", "notes_2"] {
      assert_eq!(logical_name(false, &column_name(false, name)), name);
      assert_eq!(logical_name(true, &column_name(true, name)), name);
    }
    assert_eq!(logical_name(false, "created_at"), "created_at");
  }
}
