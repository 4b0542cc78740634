//! Schema synchronisation: bring a record type's dedicated table in line
//! with its field definitions.
//!
//! Everything here runs inside a single `Connection::call` closure, so one
//! reconciliation never interleaves with another. Introspection and the
//! migration log are the only fallible parts; individual DDL failures are
//! collected into the [`SyncReport`] and the pass carries on.

use chrono::Utc;
use formwork_core::{
  field::FieldDefinition,
  naming::table_name,
  record_type::RecordType,
  schema::{ChangeKind, ColumnSpec, DesiredTable, SchemaDelta, SyncFailure, SyncReport, diff},
};
use rusqlite::{Connection, OptionalExtension as _};

use crate::{ddl, encode::encode_dt};

// ─── Introspection ───────────────────────────────────────────────────────────

pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        rusqlite::params![table],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

/// Column names of `table` in declaration order, or `None` when the table
/// does not exist.
pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Option<Vec<String>>> {
  if !table_exists(conn, table)? {
    return Ok(None);
  }
  let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
  let columns = stmt
    .query_map(rusqlite::params![table], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(Some(columns))
}

/// The physical table of the record type named `name`, if that type exists
/// and its table has been created.
fn existing_table_for(conn: &Connection, name: &str) -> rusqlite::Result<Option<String>> {
  let is_system: Option<bool> = conn
    .query_row(
      "SELECT is_system FROM record_types WHERE name = ?1",
      rusqlite::params![name],
      |row| row.get(0),
    )
    .optional()?;
  let Some(is_system) = is_system else {
    return Ok(None);
  };
  let table = table_name(name, is_system);
  Ok(table_exists(conn, &table)?.then_some(table))
}

// ─── Migration log ───────────────────────────────────────────────────────────

pub fn log_migration(
  conn: &Connection,
  record_type_id: &str,
  change: ChangeKind,
  details: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO schema_migrations (record_type_id, change_type, details, executed_at)
     VALUES (?1, ?2, ?3, ?4)",
    rusqlite::params![record_type_id, change.as_ref(), details, encode_dt(Utc::now())],
  )?;
  Ok(())
}

// ─── Reconcile ───────────────────────────────────────────────────────────────

/// Run one synchronisation pass for `record_type`.
pub fn reconcile(
  conn: &Connection,
  record_type: &RecordType,
  fields: &[FieldDefinition],
) -> rusqlite::Result<SyncReport> {
  let desired = DesiredTable::from_definition(record_type, fields, |target| {
    existing_table_for(conn, target).ok().flatten()
  });
  let actual = table_columns(conn, &desired.table)?;

  let mut report = SyncReport {
    table: desired.table.clone(),
    ..Default::default()
  };

  match diff(&desired, actual.as_deref()) {
    SchemaDelta::CreateTable(table) => create_or_adopt(conn, &table, &mut report)?,
    SchemaDelta::Alter { table, missing, stale } => {
      alter(conn, &record_type.id, &table, &missing, stale, &mut report)?;
    }
  }

  if report.is_noop() && report.failures.is_empty() {
    tracing::debug!(table = %report.table, "schema up to date");
  } else {
    tracing::info!(
      table = %report.table,
      created = report.created_table,
      added = report.added_columns.len(),
      failed = report.failures.len(),
      "schema synchronised"
    );
  }
  Ok(report)
}

/// Create the table, or reconcile against it when it appeared between
/// introspection and `CREATE TABLE`.
pub(crate) fn create_or_adopt(
  conn: &Connection,
  table: &DesiredTable,
  report: &mut SyncReport,
) -> rusqlite::Result<()> {
  if create(conn, table, report)? {
    return Ok(());
  }

  tracing::debug!(table = %table.table, "table already present, re-reading columns");
  let actual = table_columns(conn, &table.table)?;
  if let SchemaDelta::Alter { table: name, missing, stale } = diff(table, actual.as_deref()) {
    alter(conn, &table.record_type_id, &name, &missing, stale, report)?;
  }
  Ok(())
}

/// Returns `false` when the table already existed.
fn create(
  conn: &Connection,
  table: &DesiredTable,
  report: &mut SyncReport,
) -> rusqlite::Result<bool> {
  match conn.execute(&ddl::create_table(table), []) {
    Ok(_) => {
      let columns: Vec<&str> = table.column_names().collect();
      log_migration(
        conn,
        &table.record_type_id,
        ChangeKind::CreateTable,
        &format!("created table {} ({})", table.table, columns.join(", ")),
      )?;
      report.created_table = true;
    }
    Err(e) if ddl::is_already_applied(&e) => return Ok(false),
    Err(e) => {
      tracing::warn!(table = %table.table, error = %e, "failed to create table");
      report.failures.push(SyncFailure {
        target:  table.table.clone(),
        message: e.to_string(),
      });
      return Ok(true);
    }
  }

  for sql in ddl::create_indexes(&table.table) {
    if let Err(e) = conn.execute(&sql, []) {
      tracing::warn!(table = %table.table, error = %e, "failed to create index");
      report.failures.push(SyncFailure {
        target:  table.table.clone(),
        message: e.to_string(),
      });
    }
  }
  Ok(true)
}

/// Add each missing column; a failed column is recorded and the rest are
/// still attempted.
fn alter(
  conn: &Connection,
  record_type_id: &str,
  table: &str,
  missing: &[ColumnSpec],
  stale: Vec<String>,
  report: &mut SyncReport,
) -> rusqlite::Result<()> {
  for column in missing {
    match conn.execute(&ddl::add_column(table, column), []) {
      Ok(_) => {
        log_migration(
          conn,
          record_type_id,
          ChangeKind::AddColumn,
          &format!("added column {} to {table}", column.name),
        )?;
        report.added_columns.push(column.name.clone());
      }
      Err(e) if ddl::is_already_applied(&e) => {
        tracing::debug!(table = %table, column = %column.name, "column already present");
      }
      Err(e) => {
        tracing::warn!(table = %table, column = %column.name, error = %e, "failed to add column");
        report.failures.push(SyncFailure {
          target:  format!("{table}.{}", column.name),
          message: e.to_string(),
        });
      }
    }
  }
  if !stale.is_empty() {
    tracing::warn!(
      table = %table,
      columns = ?stale,
      "columns without a field definition are kept"
    );
  }
  report.stale_columns = stale;
  Ok(())
}
