//! Physical record access. A record type is stored either in its dedicated
//! table (once synchronised) or as JSON documents in the shared fallback
//! table; [`backend_for`] picks one by checking which exists.
//!
//! Callers hand in logical field names. Column namespacing happens here and
//! nowhere else on the write path; the read path strips it again.

use std::{collections::HashMap, str::FromStr as _};

use formwork_core::{
  field::FieldKind,
  naming::{FALLBACK_TABLE, column_name, is_reserved, logical_name, table_name_for},
  record_type::RecordType,
  value::RecordData,
};
use rusqlite::{Connection, OptionalExtension as _, Row, types::Value};

use crate::{
  ddl::{self, quote_ident},
  encode::{RawBody, RawRecord, decode_value, encode_value},
  error::boxed,
  sync::table_columns,
};

type CallResult<T> = tokio_rusqlite::Result<T>;

/// CRUD over one physical representation. All methods run on the connection
/// thread.
pub trait RecordBackend: Send {
  fn list(&self, conn: &Connection) -> CallResult<Vec<RawRecord>>;

  fn get(&self, conn: &Connection, id: &str) -> CallResult<Option<RawRecord>>;

  fn insert(
    &self,
    conn: &Connection,
    id: &str,
    data: &RecordData,
    created_by: Option<&str>,
    now: &str,
  ) -> CallResult<()>;

  /// Returns `false` when no record has `id`.
  fn update(&self, conn: &Connection, id: &str, data: &RecordData, now: &str) -> CallResult<bool>;

  /// Returns `false` when no record has `id`.
  fn delete(&self, conn: &Connection, id: &str) -> CallResult<bool>;
}

/// The dedicated table when it exists, the fallback table otherwise.
pub fn backend_for(
  conn: &Connection,
  record_type: &RecordType,
) -> rusqlite::Result<Box<dyn RecordBackend>> {
  let table = table_name_for(record_type);
  Ok(match table_columns(conn, &table)? {
    Some(columns) => Box::new(TableBacked {
      table,
      is_system: record_type.is_system,
      columns,
    }),
    None => Box::new(JsonBacked {
      record_type_id: record_type.id.clone(),
    }),
  })
}

/// Logical field name → kind for a record type. Kinds the catalog does not
/// recognise are left out, so their values pass through unnormalised.
pub fn load_kinds(
  conn: &Connection,
  record_type_id: &str,
) -> rusqlite::Result<HashMap<String, FieldKind>> {
  let mut stmt = conn.prepare(
    "SELECT field_name, field_type FROM field_definitions WHERE record_type_id = ?1",
  )?;
  let rows = stmt
    .query_map(rusqlite::params![record_type_id], |row| {
      Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(
    rows
      .into_iter()
      .filter_map(|(name, kind)| FieldKind::from_str(&kind).ok().map(|k| (name, k)))
      .collect(),
  )
}

// ─── Dedicated table ─────────────────────────────────────────────────────────

pub struct TableBacked {
  table:     String,
  is_system: bool,
  /// Physical columns as introspected when the backend was chosen.
  columns:   Vec<String>,
}

impl TableBacked {
  fn raw_from_row(&self, row: &Row<'_>, names: &[String]) -> rusqlite::Result<RawRecord> {
    let mut data = RecordData::new();
    for (i, name) in names.iter().enumerate() {
      if is_reserved(name) {
        continue;
      }
      let logical = logical_name(self.is_system, name).to_owned();
      data.insert(logical, decode_value(row.get_ref(i)?));
    }
    Ok(RawRecord {
      id:         row.get("id")?,
      created_at: row.get("created_at")?,
      updated_at: row.get("updated_at")?,
      created_by: row.get("created_by")?,
      body:       RawBody::Columns(data),
    })
  }

  fn select(&self, conn: &Connection, filter: &str, id: Option<&str>) -> CallResult<Vec<RawRecord>> {
    let sql = format!("SELECT * FROM {} {filter}", quote_ident(&self.table));
    let mut stmt = conn.prepare(&sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
    let rows = match id {
      Some(id) => stmt
        .query_map(rusqlite::params![id], |row| self.raw_from_row(row, &names))?
        .collect::<rusqlite::Result<Vec<_>>>()?,
      None => stmt
        .query_map([], |row| self.raw_from_row(row, &names))?
        .collect::<rusqlite::Result<Vec<_>>>()?,
    };
    Ok(rows)
  }

  /// Map logical names to existing columns. Fields without a column yet are
  /// dropped; the next synchronisation adds them.
  fn bind(&self, data: &RecordData) -> CallResult<(Vec<String>, Vec<Value>)> {
    let mut columns = Vec::with_capacity(data.len());
    let mut values = Vec::with_capacity(data.len());
    for (name, value) in data {
      let column = column_name(self.is_system, name);
      if !self.columns.contains(&column) {
        tracing::debug!(table = %self.table, field = %name, "no column for field, value dropped");
        continue;
      }
      columns.push(column);
      values.push(encode_value(value).map_err(boxed)?);
    }
    Ok((columns, values))
  }
}

impl RecordBackend for TableBacked {
  fn list(&self, conn: &Connection) -> CallResult<Vec<RawRecord>> {
    self.select(conn, "ORDER BY \"created_at\" DESC", None)
  }

  fn get(&self, conn: &Connection, id: &str) -> CallResult<Option<RawRecord>> {
    Ok(self.select(conn, "WHERE \"id\" = ?1", Some(id))?.into_iter().next())
  }

  fn insert(
    &self,
    conn: &Connection,
    id: &str,
    data: &RecordData,
    created_by: Option<&str>,
    now: &str,
  ) -> CallResult<()> {
    let (fields, field_values) = self.bind(data)?;

    let mut columns: Vec<String> = ["id", "created_at", "updated_at", "created_by"]
      .map(str::to_owned)
      .to_vec();
    columns.extend(fields);
    let mut values = vec![
      Value::Text(id.to_owned()),
      Value::Text(now.to_owned()),
      Value::Text(now.to_owned()),
      created_by.map_or(Value::Null, |c| Value::Text(c.to_owned())),
    ];
    values.extend(field_values);

    conn.execute(
      &ddl::insert(&self.table, &columns),
      rusqlite::params_from_iter(values),
    )?;
    Ok(())
  }

  fn update(&self, conn: &Connection, id: &str, data: &RecordData, now: &str) -> CallResult<bool> {
    let (fields, field_values) = self.bind(data)?;

    let mut columns = vec!["updated_at".to_owned()];
    columns.extend(fields);
    let mut values = vec![Value::Text(now.to_owned())];
    values.extend(field_values);
    values.push(Value::Text(id.to_owned()));

    let changed = conn.execute(
      &ddl::update(&self.table, &columns),
      rusqlite::params_from_iter(values),
    )?;
    Ok(changed > 0)
  }

  fn delete(&self, conn: &Connection, id: &str) -> CallResult<bool> {
    let sql = format!("DELETE FROM {} WHERE \"id\" = ?1", quote_ident(&self.table));
    Ok(conn.execute(&sql, rusqlite::params![id])? > 0)
  }
}

// ─── Fallback table ──────────────────────────────────────────────────────────

pub struct JsonBacked {
  record_type_id: String,
}

fn raw_from_json_row(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
  Ok(RawRecord {
    id:         row.get(0)?,
    created_at: row.get(1)?,
    updated_at: row.get(2)?,
    created_by: row.get(3)?,
    body:       RawBody::Json(row.get(4)?),
  })
}

impl RecordBackend for JsonBacked {
  fn list(&self, conn: &Connection) -> CallResult<Vec<RawRecord>> {
    let sql = format!(
      "SELECT id, created_at, updated_at, created_by, data FROM {FALLBACK_TABLE}
       WHERE record_type_id = ?1 ORDER BY created_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
      .query_map(rusqlite::params![self.record_type_id], raw_from_json_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
  }

  fn get(&self, conn: &Connection, id: &str) -> CallResult<Option<RawRecord>> {
    let sql = format!(
      "SELECT id, created_at, updated_at, created_by, data FROM {FALLBACK_TABLE}
       WHERE id = ?1 AND record_type_id = ?2"
    );
    Ok(
      conn
        .query_row(&sql, rusqlite::params![id, self.record_type_id], raw_from_json_row)
        .optional()?,
    )
  }

  fn insert(
    &self,
    conn: &Connection,
    id: &str,
    data: &RecordData,
    created_by: Option<&str>,
    now: &str,
  ) -> CallResult<()> {
    let json = serde_json::to_string(data).map_err(boxed)?;
    conn.execute(
      &format!(
        "INSERT INTO {FALLBACK_TABLE}
           (id, record_type_id, data, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)"
      ),
      rusqlite::params![id, self.record_type_id, json, created_by, now],
    )?;
    Ok(())
  }

  fn update(&self, conn: &Connection, id: &str, data: &RecordData, now: &str) -> CallResult<bool> {
    let tx = conn.unchecked_transaction()?;

    let existing: Option<String> = tx
      .query_row(
        &format!("SELECT data FROM {FALLBACK_TABLE} WHERE id = ?1 AND record_type_id = ?2"),
        rusqlite::params![id, self.record_type_id],
        |row| row.get(0),
      )
      .optional()?;
    let Some(existing) = existing else {
      return Ok(false);
    };

    let mut merged: RecordData = serde_json::from_str(&existing).map_err(boxed)?;
    merged.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
    let json = serde_json::to_string(&merged).map_err(boxed)?;

    tx.execute(
      &format!("UPDATE {FALLBACK_TABLE} SET data = ?1, updated_at = ?2 WHERE id = ?3"),
      rusqlite::params![json, now, id],
    )?;
    tx.commit()?;
    Ok(true)
  }

  fn delete(&self, conn: &Connection, id: &str) -> CallResult<bool> {
    let changed = conn.execute(
      &format!("DELETE FROM {FALLBACK_TABLE} WHERE id = ?1 AND record_type_id = ?2"),
      rusqlite::params![id, self.record_type_id],
    )?;
    Ok(changed > 0)
  }
}
