//! [`SqliteStore`]: the SQLite implementation of [`RecordStore`]. The
//! catalog half lives in `catalog.rs`.

use std::path::Path;

use chrono::Utc;
use formwork_core::{
  field::FieldDefinition,
  naming::table_name_for,
  record_type::RecordType,
  schema::{SchemaMigration, SyncReport, TableSchema},
  store::{CatalogStore, RecordStore},
  value::{Record, RecordData, without_envelope},
};

use crate::{
  Error, Result,
  backend::{backend_for, load_kinds},
  encode::{RawMigration, encode_dt, new_record_id},
  schema::SCHEMA,
  sync::{reconcile, table_columns},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Formwork store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted and every
/// statement runs on its one background thread.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn not_found(record_type: &RecordType, id: &str) -> Error {
  formwork_core::Error::RecordNotFound(format!("{}/{id}", record_type.name)).into()
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  // ── Schema ────────────────────────────────────────────────────────────────

  async fn ensure_synced(
    &self,
    record_type: &RecordType,
    fields: &[FieldDefinition],
  ) -> Result<SyncReport> {
    let record_type = record_type.clone();
    let fields = fields.to_vec();
    let report = self
      .conn
      .call(move |conn| Ok(reconcile(conn, &record_type, &fields)?))
      .await?;
    Ok(report)
  }

  async fn sync_all(&self) -> Result<Vec<SyncReport>> {
    let mut reports = Vec::new();
    for record_type in self.list_types().await? {
      let fields = self.list_fields(&record_type.id).await?;
      if fields.is_empty() {
        tracing::debug!(record_type = %record_type.name, "no fields, skipping sync");
        continue;
      }
      reports.push(self.ensure_synced(&record_type, &fields).await?);
    }
    Ok(reports)
  }

  async fn table_schema(&self, record_type: &RecordType) -> Result<Option<TableSchema>> {
    let table = table_name_for(record_type);
    let schema = self
      .conn
      .call(move |conn| {
        Ok(table_columns(conn, &table)?.map(|columns| TableSchema { table, columns }))
      })
      .await?;
    Ok(schema)
  }

  async fn list_migrations(&self, record_type_id: Option<&str>) -> Result<Vec<SchemaMigration>> {
    let record_type_id = record_type_id.map(str::to_owned);

    let raws: Vec<RawMigration> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, record_type_id, change_type, details, executed_at
           FROM schema_migrations
           WHERE ?1 IS NULL OR record_type_id = ?1
           ORDER BY id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![record_type_id], RawMigration::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMigration::into_migration).collect()
  }

  // ── Records ───────────────────────────────────────────────────────────────

  async fn list_records(&self, record_type: &RecordType) -> Result<Vec<Record>> {
    let rt = record_type.clone();
    let (kinds, raws) = self
      .conn
      .call(move |conn| {
        let kinds = load_kinds(conn, &rt.id)?;
        let raws = backend_for(conn, &rt)?.list(conn)?;
        Ok((kinds, raws))
      })
      .await?;

    raws.into_iter().map(|raw| raw.into_record(&kinds)).collect()
  }

  async fn get_record(&self, record_type: &RecordType, id: &str) -> Result<Option<Record>> {
    let rt = record_type.clone();
    let id = id.to_owned();
    let (kinds, raw) = self
      .conn
      .call(move |conn| {
        let kinds = load_kinds(conn, &rt.id)?;
        let raw = backend_for(conn, &rt)?.get(conn, &id)?;
        Ok((kinds, raw))
      })
      .await?;

    raw.map(|raw| raw.into_record(&kinds)).transpose()
  }

  async fn create_record(
    &self,
    record_type: &RecordType,
    data: RecordData,
    created_by: Option<String>,
  ) -> Result<String> {
    let now = Utc::now();
    let id = new_record_id(&record_type.name, now);
    let now = encode_dt(now);
    let data = without_envelope(data);
    let rt = record_type.clone();
    let record_id = id.clone();

    self
      .conn
      .call(move |conn| {
        backend_for(conn, &rt)?.insert(conn, &record_id, &data, created_by.as_deref(), &now)
      })
      .await?;

    tracing::debug!(record_type = %record_type.name, id = %id, "record created");
    Ok(id)
  }

  async fn update_record(&self, record_type: &RecordType, id: &str, data: RecordData) -> Result<()> {
    let now = encode_dt(Utc::now());
    let data = without_envelope(data);
    let rt = record_type.clone();
    let record_id = id.to_owned();

    let found = self
      .conn
      .call(move |conn| backend_for(conn, &rt)?.update(conn, &record_id, &data, &now))
      .await?;

    if !found {
      return Err(not_found(record_type, id));
    }
    Ok(())
  }

  async fn delete_record(&self, record_type: &RecordType, id: &str) -> Result<()> {
    let rt = record_type.clone();
    let record_id = id.to_owned();

    let found = self
      .conn
      .call(move |conn| backend_for(conn, &rt)?.delete(conn, &record_id))
      .await?;

    if !found {
      return Err(not_found(record_type, id));
    }
    Ok(())
  }
}
