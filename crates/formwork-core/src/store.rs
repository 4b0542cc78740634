//! The `CatalogStore` and `RecordStore` traits.
//!
//! The traits are implemented by storage backends (e.g.
//! `formwork-store-sqlite`). Higher layers (`formwork-api`, the calendar
//! projector) depend on these abstractions, not on any concrete backend.
//!
//! Catalog writes never touch physical tables: synchronisation is a separate
//! call so callers can batch several catalog edits before reconciling.

use std::future::Future;

use crate::{
  StoreError,
  calendar::{CalendarSettings, CalendarSettingsPatch, NewCalendarSettings},
  field::{FieldDefinition, FieldPatch, NewField},
  form::{FormDefinition, FormPatch, NewForm},
  record_type::{CategoryWithTypes, NewCategory, NewRecordType, RecordCategory, RecordType, RecordTypePatch},
  schema::{SchemaMigration, SyncReport, TableSchema},
  value::{Record, RecordData},
};

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Persistence for the logical model: record types, fields, categories, forms
/// and calendar settings. Pure CRUD; no physical side effects.
pub trait CatalogStore: Send + Sync {
  type Error: StoreError + From<crate::Error>;

  // ── Record types ──────────────────────────────────────────────────────

  /// Persist a new record type. Fails with a duplicate error if the id or
  /// name is taken.
  fn create_type(
    &self,
    input: NewRecordType,
  ) -> impl Future<Output = Result<RecordType, Self::Error>> + Send + '_;

  fn get_type<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<RecordType>, Self::Error>> + Send + 'a;

  fn get_type_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<RecordType>, Self::Error>> + Send + 'a;

  /// All record types ordered by display name.
  fn list_types(
    &self,
  ) -> impl Future<Output = Result<Vec<RecordType>, Self::Error>> + Send + '_;

  /// Apply a partial update. System types reject permission-flag changes.
  fn update_type<'a>(
    &'a self,
    id: &'a str,
    patch: RecordTypePatch,
  ) -> impl Future<Output = Result<RecordType, Self::Error>> + Send + 'a;

  /// Delete a custom record type together with its fields, forms and
  /// calendar settings. The physical table and any stored rows are retained.
  fn delete_type<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Look a type up by id first, then by name.
  fn resolve_type<'a>(
    &'a self,
    id_or_name: &'a str,
  ) -> impl Future<Output = Result<RecordType, Self::Error>> + Send + 'a {
    async move {
      if let Some(found) = self.get_type(id_or_name).await? {
        return Ok(found);
      }
      self
        .get_type_by_name(id_or_name)
        .await?
        .ok_or_else(|| crate::Error::RecordTypeNotFound(id_or_name.to_owned()).into())
    }
  }

  // ── Fields ────────────────────────────────────────────────────────────

  /// Add a field to a record type after validating its name.
  fn create_field<'a>(
    &'a self,
    record_type_id: &'a str,
    input: NewField,
  ) -> impl Future<Output = Result<FieldDefinition, Self::Error>> + Send + 'a;

  fn get_field<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<FieldDefinition>, Self::Error>> + Send + 'a;

  /// Fields of a record type ordered by `order_index`.
  fn list_fields<'a>(
    &'a self,
    record_type_id: &'a str,
  ) -> impl Future<Output = Result<Vec<FieldDefinition>, Self::Error>> + Send + 'a;

  /// Apply a partial update. System fields are immutable.
  fn update_field<'a>(
    &'a self,
    id: &'a str,
    patch: FieldPatch,
  ) -> impl Future<Output = Result<FieldDefinition, Self::Error>> + Send + 'a;

  /// Delete a field definition. System fields cannot be deleted. The
  /// physical column, if any, stays.
  fn delete_field<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Categories ────────────────────────────────────────────────────────

  fn create_category(
    &self,
    input: NewCategory,
  ) -> impl Future<Output = Result<RecordCategory, Self::Error>> + Send + '_;

  /// Categories in sidebar order, each with its sidebar-visible types.
  fn list_categories(
    &self,
  ) -> impl Future<Output = Result<Vec<CategoryWithTypes>, Self::Error>> + Send + '_;

  // ── Forms ─────────────────────────────────────────────────────────────

  /// Persist a form; marking it default clears the type's previous default.
  fn create_form(
    &self,
    input: NewForm,
  ) -> impl Future<Output = Result<FormDefinition, Self::Error>> + Send + '_;

  /// Forms, optionally for one record type; defaults first.
  fn list_forms<'a>(
    &'a self,
    record_type_id: Option<&'a str>,
  ) -> impl Future<Output = Result<Vec<FormDefinition>, Self::Error>> + Send + 'a;

  fn get_form<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<FormDefinition>, Self::Error>> + Send + 'a;

  fn default_form<'a>(
    &'a self,
    record_type_id: &'a str,
  ) -> impl Future<Output = Result<Option<FormDefinition>, Self::Error>> + Send + 'a;

  fn update_form<'a>(
    &'a self,
    id: &'a str,
    patch: FormPatch,
  ) -> impl Future<Output = Result<FormDefinition, Self::Error>> + Send + 'a;

  fn delete_form<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Calendar settings ─────────────────────────────────────────────────

  fn calendar_settings<'a>(
    &'a self,
    record_type_id: &'a str,
  ) -> impl Future<Output = Result<Option<CalendarSettings>, Self::Error>> + Send + 'a;

  fn create_calendar_settings<'a>(
    &'a self,
    record_type_id: &'a str,
    input: NewCalendarSettings,
  ) -> impl Future<Output = Result<CalendarSettings, Self::Error>> + Send + 'a;

  fn update_calendar_settings<'a>(
    &'a self,
    record_type_id: &'a str,
    patch: CalendarSettingsPatch,
  ) -> impl Future<Output = Result<CalendarSettings, Self::Error>> + Send + 'a;
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Schema synchronisation and generic record CRUD over whichever physical
/// representation a record type currently has.
///
/// Callers only ever see logical field names; column namespacing is handled
/// inside the implementation.
pub trait RecordStore: CatalogStore {
  // ── Schema ────────────────────────────────────────────────────────────

  /// Make sure a dedicated table exists with a column for every field.
  ///
  /// Idempotent and cheap when nothing changed. Individual DDL failures are
  /// reported in the [`SyncReport`]; only storage faults are returned as
  /// errors.
  fn ensure_synced<'a>(
    &'a self,
    record_type: &'a RecordType,
    fields: &'a [FieldDefinition],
  ) -> impl Future<Output = Result<SyncReport, Self::Error>> + Send + 'a;

  /// Reconcile every record type that has at least one field.
  fn sync_all(
    &self,
  ) -> impl Future<Output = Result<Vec<SyncReport>, Self::Error>> + Send + '_;

  /// The dedicated table of `record_type`, or `None` when it is JSON-backed.
  fn table_schema<'a>(
    &'a self,
    record_type: &'a RecordType,
  ) -> impl Future<Output = Result<Option<TableSchema>, Self::Error>> + Send + 'a;

  /// The append-only migration log, oldest first.
  fn list_migrations<'a>(
    &'a self,
    record_type_id: Option<&'a str>,
  ) -> impl Future<Output = Result<Vec<SchemaMigration>, Self::Error>> + Send + 'a;

  // ── Records ───────────────────────────────────────────────────────────

  /// All records of a type, newest first.
  fn list_records<'a>(
    &'a self,
    record_type: &'a RecordType,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a;

  fn get_record<'a>(
    &'a self,
    record_type: &'a RecordType,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + 'a;

  /// Store a new record and return its generated id. Keys that map to no
  /// column of a dedicated table are dropped silently.
  fn create_record<'a>(
    &'a self,
    record_type: &'a RecordType,
    data: RecordData,
    created_by: Option<String>,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;

  /// Update only the supplied fields and refresh `updated_at`.
  fn update_record<'a>(
    &'a self,
    record_type: &'a RecordType,
    id: &'a str,
    data: RecordData,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Hard-delete a record.
  fn delete_record<'a>(
    &'a self,
    record_type: &'a RecordType,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
