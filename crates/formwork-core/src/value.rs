//! Record payloads: a closed set of value variants keyed by logical field name.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{field::FieldKind, naming::is_reserved};

// ─── FieldValue ──────────────────────────────────────────────────────────────

/// A single field value. JSON objects are not representable; everything a
/// field kind can hold fits one of these variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
  Null,
  Bool(bool),
  Integer(i64),
  Real(f64),
  Text(String),
  List(Vec<FieldValue>),
}

/// Largest magnitude at which every integer is exactly representable as `f64`.
const MAX_EXACT_F64_INT: f64 = 9_007_199_254_740_992.0;

impl FieldValue {
  pub fn text(s: impl Into<String>) -> Self { Self::Text(s.into()) }

  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      Self::Text(s) => Some(s),
      _ => None,
    }
  }

  /// Render scalars for display (event titles and the like).
  pub fn display(&self) -> Option<String> {
    match self {
      Self::Text(s) if !s.is_empty() => Some(s.clone()),
      Self::Integer(i) => Some(i.to_string()),
      Self::Real(f) => Some(f.to_string()),
      Self::Bool(b) => Some(b.to_string()),
      _ => None,
    }
  }

  /// Whether this value refers to `id`, either directly or as an element of a
  /// list (native or JSON-encoded text). Malformed JSON counts as no match.
  pub fn references(&self, id: &str) -> bool {
    match self {
      Self::Text(s) if s == id => true,
      Self::Text(s) if s.trim_start().starts_with('[') => {
        serde_json::from_str::<Vec<serde_json::Value>>(s)
          .map(|items| items.iter().any(|v| v.as_str() == Some(id)))
          .unwrap_or(false)
      }
      Self::List(items) => items.iter().any(|v| v.references(id)),
      _ => false,
    }
  }

  /// Bring a value read back from storage into the shape its field kind
  /// implies: booleans stored as integers, whole reals, JSON-encoded lists.
  /// Relation fields may hold either a single id or a list of ids; only
  /// the latter is decoded.
  pub fn normalize(self, kind: FieldKind) -> Self {
    match (kind, self) {
      (FieldKind::Boolean, Self::Integer(i)) => Self::Bool(i != 0),
      (FieldKind::Boolean, Self::Text(s)) if s == "true" || s == "false" => {
        Self::Bool(s == "true")
      }
      (FieldKind::Number, Self::Real(f))
        if f.fract() == 0.0 && f.abs() < MAX_EXACT_F64_INT =>
      {
        Self::Integer(f as i64)
      }
      (FieldKind::Multiselect, Self::Text(s)) => decode_list(s),
      (FieldKind::Relation, Self::Text(s)) if s.trim_start().starts_with('[') => decode_list(s),
      (_, other) => other,
    }
  }
}

fn decode_list(s: String) -> FieldValue {
  match serde_json::from_str::<Vec<FieldValue>>(&s) {
    Ok(items) => FieldValue::List(items),
    Err(_) => FieldValue::Text(s),
  }
}

impl From<&str> for FieldValue {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for FieldValue {
  fn from(s: String) -> Self { Self::Text(s) }
}

impl From<i64> for FieldValue {
  fn from(i: i64) -> Self { Self::Integer(i) }
}

impl From<f64> for FieldValue {
  fn from(f: f64) -> Self { Self::Real(f) }
}

impl From<bool> for FieldValue {
  fn from(b: bool) -> Self { Self::Bool(b) }
}

// ─── RecordData ──────────────────────────────────────────────────────────────

/// Logical field name → value.
pub type RecordData = BTreeMap<String, FieldValue>;

/// Drop the envelope keys from a caller payload; the store owns them.
pub fn without_envelope(data: RecordData) -> RecordData {
  data.into_iter().filter(|(k, _)| !is_reserved(k)).collect()
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A stored record as callers see it: the envelope plus logical fields.
/// Physical column names never appear here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  pub id:         String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub created_by: Option<String>,
  #[serde(flatten)]
  pub fields:     RecordData,
}

impl Record {
  /// Look up a value by logical name, envelope columns included.
  pub fn value(&self, name: &str) -> Option<FieldValue> {
    match name {
      "id" => Some(FieldValue::Text(self.id.clone())),
      "created_at" => Some(FieldValue::Text(encode_timestamp(self.created_at))),
      "updated_at" => Some(FieldValue::Text(encode_timestamp(self.updated_at))),
      "created_by" => self.created_by.clone().map(FieldValue::Text),
      other => self.fields.get(other).cloned(),
    }
  }
}

// ─── Timestamps ──────────────────────────────────────────────────────────────

/// Canonical timestamp text written by the engine.
pub fn encode_timestamp(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse the timestamp and date shapes found in stored records: RFC 3339,
/// SQLite's `CURRENT_TIMESTAMP` format, HTML `datetime-local` values and bare
/// dates (taken as midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
  let s = s.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
      return Some(naive.and_utc());
    }
  }
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn untagged_json_maps_onto_variants() {
    let data: RecordData = serde_json::from_str(
      r#"{"a":1,"b":"x","c":2.5,"d":true,"e":null,"f":["emp-1","emp-2"]}"#,
    )
    .unwrap();
    assert_eq!(data["a"], FieldValue::Integer(1));
    assert_eq!(data["b"], FieldValue::text("x"));
    assert_eq!(data["c"], FieldValue::Real(2.5));
    assert_eq!(data["d"], FieldValue::Bool(true));
    assert_eq!(data["e"], FieldValue::Null);
    assert!(matches!(data["f"], FieldValue::List(ref items) if items.len() == 2));
  }

  #[test]
  fn objects_are_rejected() {
    let parsed = serde_json::from_str::<RecordData>(r#"{"a":{"nested":1}}"#);
    assert!(parsed.is_err());
  }

  #[test]
  fn normalize_by_kind() {
    assert_eq!(
      FieldValue::Real(50.0).normalize(FieldKind::Number),
      FieldValue::Integer(50)
    );
    assert_eq!(
      FieldValue::Real(2.5).normalize(FieldKind::Number),
      FieldValue::Real(2.5)
    );
    assert_eq!(
      FieldValue::Integer(1).normalize(FieldKind::Boolean),
      FieldValue::Bool(true)
    );
    assert_eq!(
      FieldValue::text(r#"["a","b"]"#).normalize(FieldKind::Multiselect),
      FieldValue::List(vec![FieldValue::text("a"), FieldValue::text("b")])
    );
    assert_eq!(
      FieldValue::text("not json").normalize(FieldKind::Multiselect),
      FieldValue::text("not json")
    );
    assert_eq!(
      FieldValue::Integer(1).normalize(FieldKind::Text),
      FieldValue::Integer(1)
    );
  }

  #[test]
  fn relation_lists_decode_but_single_ids_stay_text() {
    assert_eq!(
      FieldValue::text(r#"["emp-1","emp-2"]"#).normalize(FieldKind::Relation),
      FieldValue::List(vec![FieldValue::text("emp-1"), FieldValue::text("emp-2")])
    );
    assert_eq!(
      FieldValue::text("emp-1").normalize(FieldKind::Relation),
      FieldValue::text("emp-1")
    );
    assert_eq!(
      FieldValue::text("[broken").normalize(FieldKind::Relation),
      FieldValue::text("[broken")
    );
  }

  #[test]
  fn references_scalars_lists_and_json_text() {
    assert!(FieldValue::text("emp-1").references("emp-1"));
    assert!(FieldValue::text(r#"["emp-1","emp-2"]"#).references("emp-2"));
    assert!(!FieldValue::text(r#"["emp-1""#).references("emp-1"));
    assert!(
      FieldValue::List(vec![FieldValue::text("emp-3")]).references("emp-3")
    );
    assert!(!FieldValue::Integer(1).references("1"));
  }

  #[test]
  fn envelope_keys_are_dropped_from_payloads() {
    let mut data = RecordData::new();
    data.insert("id".into(), "spoofed".into());
    data.insert("created_at".into(), "yesterday".into());
    data.insert("item_name".into(), "Gauze".into());
    let cleaned = without_envelope(data);
    assert_eq!(cleaned.len(), 1);
    assert!(cleaned.contains_key("item_name"));
  }

  #[test]
  fn timestamps_in_stored_shapes_parse() {
    assert!(parse_timestamp("2024-05-01T10:00:00Z").is_some());
    assert!(parse_timestamp("2024-05-01T10:00:00.123+02:00").is_some());
    assert!(parse_timestamp("2024-05-01 10:00:00").is_some());
    assert!(parse_timestamp("2024-05-01T10:00").is_some());
    assert_eq!(
      parse_timestamp("2024-05-01").map(|d| d.date_naive()),
      NaiveDate::from_ymd_opt(2024, 5, 1)
    );
    assert!(parse_timestamp("next tuesday").is_none());
  }
}
