//! SQL text for runtime DDL and generic record statements.
//!
//! Identifiers come from the naming rules and are already restricted to
//! `[A-Za-z0-9_]`, but everything is quoted anyway so a column that happens to
//! be an SQL keyword still works.

use formwork_core::{
  field::FieldKind,
  schema::{ColumnSpec, DesiredTable},
};

pub fn quote_ident(name: &str) -> String { format!("\"{}\"", name.replace('"', "\"\"")) }

pub fn quote_literal(value: &str) -> String { format!("'{}'", value.replace('\'', "''")) }

/// Declared SQL type per field kind. SQLite derives column affinity from the
/// declared name: `REAL` for numbers, `NUMERIC` for the date and boolean
/// names, `TEXT` for everything stored as text or JSON.
pub fn sql_type(kind: FieldKind) -> &'static str {
  match kind {
    FieldKind::Text | FieldKind::Textarea | FieldKind::Select => "TEXT",
    FieldKind::Number => "REAL",
    FieldKind::Date => "DATE",
    FieldKind::Datetime => "DATETIME",
    FieldKind::Boolean => "BOOLEAN",
    FieldKind::Multiselect | FieldKind::Relation => "TEXT",
  }
}

fn column_tail(column: &ColumnSpec, not_null: bool) -> String {
  let mut sql = format!("{} {}", quote_ident(&column.name), sql_type(column.kind));
  if not_null {
    sql.push_str(" NOT NULL");
  }
  if let Some(default) = &column.default {
    sql.push_str(" DEFAULT ");
    sql.push_str(&quote_literal(default));
  }
  if let Some(target) = &column.references {
    sql.push_str(&format!(" REFERENCES {}(\"id\")", quote_ident(target)));
  }
  sql
}

/// `CREATE TABLE` with the envelope columns followed by one column per field.
/// Required fields without a default are `NOT NULL`.
pub fn create_table(table: &DesiredTable) -> String {
  let mut columns = vec![
    "\"id\" TEXT PRIMARY KEY".to_owned(),
    "\"created_at\" DATETIME NOT NULL".to_owned(),
    "\"updated_at\" DATETIME NOT NULL".to_owned(),
    "\"created_by\" TEXT".to_owned(),
  ];
  columns.extend(table.columns.iter().map(|c| column_tail(c, c.not_null())));
  format!(
    "CREATE TABLE {} (\n  {}\n)",
    quote_ident(&table.table),
    columns.join(",\n  ")
  )
}

/// Secondary indexes created alongside a new table.
pub fn create_indexes(table: &str) -> [String; 2] {
  ["created_at", "updated_at"].map(|column| {
    format!(
      "CREATE INDEX IF NOT EXISTS {} ON {}({})",
      quote_ident(&format!("idx_{table}_{column}")),
      quote_ident(table),
      quote_ident(column)
    )
  })
}

/// `ALTER TABLE .. ADD COLUMN`. Added columns are nullable unless a default is
/// supplied, since existing rows must receive a value.
pub fn add_column(table: &str, column: &ColumnSpec) -> String {
  let not_null = column.required && column.default.is_some();
  format!(
    "ALTER TABLE {} ADD COLUMN {}",
    quote_ident(table),
    column_tail(column, not_null)
  )
}

/// `INSERT` with one positional parameter per column.
pub fn insert(table: &str, columns: &[String]) -> String {
  let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
  let params: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
  format!(
    "INSERT INTO {} ({}) VALUES ({})",
    quote_ident(table),
    names.join(", "),
    params.join(", ")
  )
}

/// `UPDATE` setting `columns` in order; the id is the last parameter.
pub fn update(table: &str, columns: &[String]) -> String {
  let assignments: Vec<String> = columns
    .iter()
    .enumerate()
    .map(|(i, c)| format!("{} = ?{}", quote_ident(c), i + 1))
    .collect();
  format!(
    "UPDATE {} SET {} WHERE \"id\" = ?{}",
    quote_ident(table),
    assignments.join(", "),
    columns.len() + 1
  )
}

/// `true` for DDL failures meaning the change is already in place, which a
/// concurrent or repeated synchronisation can legitimately hit.
pub fn is_already_applied(err: &rusqlite::Error) -> bool {
  let msg = err.to_string();
  msg.contains("already exists") || msg.contains("duplicate column name")
}
