//! Integration tests for `SqliteStore` against an in-memory database.

use formwork_core::{
  StoreError as _,
  calendar::{CalendarSettingsPatch, EventQuery, NewCalendarSettings, project_events},
  field::{FieldDefinition, FieldKind, FieldPatch, NewField},
  fixtures::seed_builtin_catalog,
  form::{FormLayout, NewForm},
  record_type::{DEFAULT_CATEGORY_ID, NewCategory, NewRecordType, RecordType, RecordTypePatch},
  schema::{ChangeKind, DesiredTable, SyncReport},
  store::{CatalogStore, RecordStore},
  value::{FieldValue, RecordData},
};
use serde_json::json;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn data(pairs: &[(&str, FieldValue)]) -> RecordData {
  pairs
    .iter()
    .map(|(k, v)| ((*k).to_owned(), v.clone()))
    .collect()
}

/// `inventory_item` with `item_name: text required` and
/// `quantity: number default 0`.
async fn inventory(s: &SqliteStore) -> (RecordType, Vec<FieldDefinition>) {
  let rt = s
    .create_type(NewRecordType::new("inventory_item", "Inventory Item"))
    .await
    .unwrap();
  s.create_field(&rt.id, NewField::new("item_name", FieldKind::Text).required())
    .await
    .unwrap();
  s.create_field(&rt.id, NewField::new("quantity", FieldKind::Number).with_default("0"))
    .await
    .unwrap();
  let fields = s.list_fields(&rt.id).await.unwrap();
  (rt, fields)
}

fn domain(err: &Error) -> &formwork_core::Error {
  err.domain().expect("domain error")
}

// ─── Synchronisation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn sync_creates_namespaced_table() {
  let s = store().await;
  let (rt, fields) = inventory(&s).await;

  let report = s.ensure_synced(&rt, &fields).await.unwrap();
  assert!(report.created_table);
  assert!(report.failures.is_empty());

  let schema = s.table_schema(&rt).await.unwrap().expect("table exists");
  assert_eq!(schema.table, "cdt_inventory_item");
  assert_eq!(
    schema.columns,
    ["id", "created_at", "updated_at", "created_by", "cf_item_name", "cf_quantity"]
  );
}

#[tokio::test]
async fn sync_is_idempotent() {
  let s = store().await;
  let (rt, fields) = inventory(&s).await;

  s.ensure_synced(&rt, &fields).await.unwrap();
  let before = s.table_schema(&rt).await.unwrap();
  let second = s.ensure_synced(&rt, &fields).await.unwrap();

  assert!(second.is_noop());
  assert_eq!(s.table_schema(&rt).await.unwrap(), before);

  let log = s.list_migrations(Some(&rt.id)).await.unwrap();
  assert_eq!(log.len(), 1);
  assert_eq!(log[0].change_type, ChangeKind::CreateTable);
}

#[tokio::test]
async fn new_field_adds_column_and_keeps_rows() {
  let s = store().await;
  let (rt, fields) = inventory(&s).await;
  s.ensure_synced(&rt, &fields).await.unwrap();

  let id = s
    .create_record(&rt, data(&[("item_name", "Gauze".into()), ("quantity", 50i64.into())]), None)
    .await
    .unwrap();

  s.create_field(&rt.id, NewField::new("sku", FieldKind::Text).required())
    .await
    .unwrap();
  let fields = s.list_fields(&rt.id).await.unwrap();
  let report = s.ensure_synced(&rt, &fields).await.unwrap();
  assert_eq!(report.added_columns, ["cf_sku"]);

  let record = s.get_record(&rt, &id).await.unwrap().unwrap();
  assert_eq!(record.fields["item_name"], FieldValue::text("Gauze"));
  assert_eq!(record.fields["sku"], FieldValue::Null);

  let log = s.list_migrations(Some(&rt.id)).await.unwrap();
  assert_eq!(log.last().unwrap().change_type, ChangeKind::AddColumn);
}

#[tokio::test]
async fn removed_field_leaves_column_in_place() {
  let s = store().await;
  let (rt, fields) = inventory(&s).await;
  s.ensure_synced(&rt, &fields).await.unwrap();
  let id = s
    .create_record(&rt, data(&[("item_name", "Gauze".into()), ("quantity", 3i64.into())]), None)
    .await
    .unwrap();

  let quantity = fields.iter().find(|f| f.field_name == "quantity").unwrap();
  s.delete_field(&quantity.id).await.unwrap();
  let remaining = s.list_fields(&rt.id).await.unwrap();
  let report = s.ensure_synced(&rt, &remaining).await.unwrap();

  assert_eq!(report.stale_columns, ["cf_quantity"]);
  let schema = s.table_schema(&rt).await.unwrap().unwrap();
  assert!(schema.columns.iter().any(|c| c == "cf_quantity"));

  let record = s.get_record(&rt, &id).await.unwrap().unwrap();
  assert_eq!(record.fields["quantity"], FieldValue::Real(3.0));
}

#[tokio::test]
async fn system_types_get_unprefixed_columns() {
  let s = store().await;
  let rt = s
    .create_type(NewRecordType::new("prescription", "Prescription").system())
    .await
    .unwrap();
  s.create_field(&rt.id, NewField::new("drug", FieldKind::Text))
    .await
    .unwrap();
  let fields = s.list_fields(&rt.id).await.unwrap();
  s.ensure_synced(&rt, &fields).await.unwrap();

  let schema = s.table_schema(&rt).await.unwrap().unwrap();
  assert_eq!(schema.table, "dt_prescription");
  assert_eq!(schema.columns.last().map(String::as_str), Some("drug"));
}

#[tokio::test]
async fn relation_to_existing_table_declares_foreign_key() {
  let s = store().await;
  seed_builtin_catalog(&s).await.unwrap();

  let rt = s
    .create_type(NewRecordType::new("incident", "Incident"))
    .await
    .unwrap();
  s.create_field(
    &rt.id,
    NewField::new("reporter_id", FieldKind::Relation)
      .with_options(json!({ "record_type": "employee" })),
  )
  .await
  .unwrap();
  s.create_field(
    &rt.id,
    NewField::new("witness_id", FieldKind::Relation)
      .with_options(json!({ "record_type": "visitor" })),
  )
  .await
  .unwrap();
  let fields = s.list_fields(&rt.id).await.unwrap();
  s.ensure_synced(&rt, &fields).await.unwrap();

  let references: Vec<(String, String)> = s
    .conn
    .call(|conn| {
      let mut stmt =
        conn.prepare("SELECT \"from\", \"table\" FROM pragma_foreign_key_list('cdt_incident')")?;
      let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(rows)
    })
    .await
    .unwrap();
  assert_eq!(references, [("cf_reporter_id".to_owned(), "employees".to_owned())]);
}

#[tokio::test]
async fn failed_column_does_not_stop_its_siblings() {
  let s = store().await;
  let supplier = s
    .create_type(NewRecordType::new("supplier", "Supplier"))
    .await
    .unwrap();
  s.create_field(&supplier.id, NewField::new("company", FieldKind::Text))
    .await
    .unwrap();
  let supplier_fields = s.list_fields(&supplier.id).await.unwrap();
  s.ensure_synced(&supplier, &supplier_fields).await.unwrap();

  let (rt, fields) = inventory(&s).await;
  s.ensure_synced(&rt, &fields).await.unwrap();

  s.create_field(
    &rt.id,
    NewField::new("supplier_id", FieldKind::Relation)
      .with_options(json!({ "record_type": "supplier" }))
      .with_default("supplier-1"),
  )
  .await
  .unwrap();
  s.create_field(&rt.id, NewField::new("sku", FieldKind::Text))
    .await
    .unwrap();

  // With enforcement on, SQLite refuses a REFERENCES column with a default.
  s.conn
    .call(|conn| Ok(conn.execute_batch("PRAGMA foreign_keys = ON")?))
    .await
    .unwrap();

  let fields = s.list_fields(&rt.id).await.unwrap();
  let report = s.ensure_synced(&rt, &fields).await.unwrap();

  assert_eq!(report.failures.len(), 1);
  assert_eq!(report.failures[0].target, "cdt_inventory_item.cf_supplier_id");
  assert_eq!(report.added_columns, ["cf_sku"]);

  let schema = s.table_schema(&rt).await.unwrap().unwrap();
  assert!(schema.columns.iter().any(|c| c == "cf_sku"));
  assert!(!schema.columns.iter().any(|c| c == "cf_supplier_id"));

  let log = s.list_migrations(Some(&rt.id)).await.unwrap();
  let last = log.last().unwrap();
  assert_eq!(last.change_type, ChangeKind::AddColumn);
  assert!(last.details.contains("cf_sku"));
  assert!(!log.iter().any(|m| m.details.contains("cf_supplier_id")));
}

#[tokio::test]
async fn table_created_concurrently_is_completed() {
  let s = store().await;
  let (rt, fields) = inventory(&s).await;
  let desired = DesiredTable::from_definition(&rt, &fields, |_| None);

  let report = s
    .conn
    .call(move |conn| {
      conn.execute_batch(
        "CREATE TABLE cdt_inventory_item (
           id TEXT PRIMARY KEY,
           created_at DATETIME NOT NULL,
           updated_at DATETIME NOT NULL,
           created_by TEXT,
           cf_item_name TEXT
         )",
      )?;
      let mut report = SyncReport {
        table: desired.table.clone(),
        ..Default::default()
      };
      crate::sync::create_or_adopt(conn, &desired, &mut report)?;
      Ok(report)
    })
    .await
    .unwrap();

  assert!(!report.created_table);
  assert_eq!(report.added_columns, ["cf_quantity"]);
  assert!(report.failures.is_empty());

  let schema = s.table_schema(&rt).await.unwrap().unwrap();
  assert_eq!(
    schema.columns,
    ["id", "created_at", "updated_at", "created_by", "cf_item_name", "cf_quantity"]
  );
}

#[tokio::test]
async fn relation_columns_are_not_enforced() {
  let s = store().await;
  let supplier = s
    .create_type(NewRecordType::new("supplier", "Supplier"))
    .await
    .unwrap();
  s.create_field(&supplier.id, NewField::new("company", FieldKind::Text))
    .await
    .unwrap();
  let supplier_fields = s.list_fields(&supplier.id).await.unwrap();
  s.ensure_synced(&supplier, &supplier_fields).await.unwrap();

  let rt = s
    .create_type(NewRecordType::new("inventory_item", "Inventory Item"))
    .await
    .unwrap();
  s.create_field(
    &rt.id,
    NewField::new("supplier_id", FieldKind::Relation)
      .with_options(json!({ "record_type": "supplier" })),
  )
  .await
  .unwrap();
  let fields = s.list_fields(&rt.id).await.unwrap();
  s.ensure_synced(&rt, &fields).await.unwrap();

  let enforced: i64 = s
    .conn
    .call(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?))
    .await
    .unwrap();
  assert_eq!(enforced, 0);

  // Dangling reference.
  s.create_record(&rt, data(&[("supplier_id", "supplier-missing".into())]), None)
    .await
    .unwrap();

  // Deleting a referenced row leaves the reference behind.
  let acme = s
    .create_record(&supplier, data(&[("company", "Acme".into())]), None)
    .await
    .unwrap();
  let item = s
    .create_record(&rt, data(&[("supplier_id", acme.as_str().into())]), None)
    .await
    .unwrap();
  s.delete_record(&supplier, &acme).await.unwrap();

  let record = s.get_record(&rt, &item).await.unwrap().unwrap();
  assert_eq!(record.fields["supplier_id"], FieldValue::text(acme));
}

#[tokio::test]
async fn sync_all_skips_types_without_fields() {
  let s = store().await;
  inventory(&s).await;
  s.create_type(NewRecordType::new("empty", "Empty")).await.unwrap();

  let reports = s.sync_all().await.unwrap();
  assert_eq!(reports.len(), 1);
  assert_eq!(reports[0].table, "cdt_inventory_item");
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn records_round_trip_with_logical_names() {
  let s = store().await;
  let (rt, fields) = inventory(&s).await;
  s.ensure_synced(&rt, &fields).await.unwrap();

  let id = s
    .create_record(
      &rt,
      data(&[("item_name", "Gauze".into()), ("quantity", 50i64.into())]),
      Some("emp-eli".into()),
    )
    .await
    .unwrap();
  assert!(id.starts_with("inventory_item-"));

  let record = s.get_record(&rt, &id).await.unwrap().unwrap();
  assert_eq!(record.id, id);
  assert_eq!(record.created_by.as_deref(), Some("emp-eli"));
  assert_eq!(record.fields["item_name"], FieldValue::text("Gauze"));
  assert_eq!(record.fields["quantity"], FieldValue::Integer(50));
  assert!(record.fields.keys().all(|k| !k.starts_with("cf_")));
}

#[tokio::test]
async fn envelope_keys_in_payload_are_ignored() {
  let s = store().await;
  let (rt, fields) = inventory(&s).await;
  s.ensure_synced(&rt, &fields).await.unwrap();

  let id = s
    .create_record(
      &rt,
      data(&[
        ("id", "spoofed".into()),
        ("created_by", "mallory".into()),
        ("item_name", "Tape".into()),
      ]),
      None,
    )
    .await
    .unwrap();
  assert_ne!(id, "spoofed");

  let record = s.get_record(&rt, &id).await.unwrap().unwrap();
  assert_eq!(record.created_by, None);
  assert_eq!(record.fields["quantity"], FieldValue::Integer(0));
}

#[tokio::test]
async fn unknown_keys_are_dropped_on_table_writes() {
  let s = store().await;
  let (rt, fields) = inventory(&s).await;
  s.ensure_synced(&rt, &fields).await.unwrap();

  let id = s
    .create_record(&rt, data(&[("item_name", "Tape".into()), ("colour", "red".into())]), None)
    .await
    .unwrap();
  let record = s.get_record(&rt, &id).await.unwrap().unwrap();
  assert!(!record.fields.contains_key("colour"));
}

#[tokio::test]
async fn update_touches_only_supplied_fields() {
  let s = store().await;
  let (rt, fields) = inventory(&s).await;
  s.ensure_synced(&rt, &fields).await.unwrap();
  let id = s
    .create_record(&rt, data(&[("item_name", "Gauze".into()), ("quantity", 5i64.into())]), None)
    .await
    .unwrap();
  let before = s.get_record(&rt, &id).await.unwrap().unwrap();

  s.update_record(&rt, &id, data(&[("quantity", 7i64.into())]))
    .await
    .unwrap();

  let after = s.get_record(&rt, &id).await.unwrap().unwrap();
  assert_eq!(after.fields["item_name"], FieldValue::text("Gauze"));
  assert_eq!(after.fields["quantity"], FieldValue::Integer(7));
  assert!(after.updated_at >= before.updated_at);
  assert_eq!(after.created_at, before.created_at);
}

#[tokio::test]
async fn missing_required_value_is_a_constraint_violation() {
  let s = store().await;
  let (rt, fields) = inventory(&s).await;
  s.ensure_synced(&rt, &fields).await.unwrap();

  let err = s
    .create_record(&rt, data(&[("quantity", 1i64.into())]), None)
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), formwork_core::Error::ConstraintViolation(_)));
}

#[tokio::test]
async fn missing_records_are_not_found() {
  let s = store().await;
  let (rt, fields) = inventory(&s).await;
  s.ensure_synced(&rt, &fields).await.unwrap();

  assert!(s.get_record(&rt, "nope").await.unwrap().is_none());
  let err = s
    .update_record(&rt, "nope", data(&[("quantity", 1i64.into())]))
    .await
    .unwrap_err();
  assert!(domain(&err).is_not_found());
  let err = s.delete_record(&rt, "nope").await.unwrap_err();
  assert!(domain(&err).is_not_found());
}

#[tokio::test]
async fn delete_removes_record() {
  let s = store().await;
  let (rt, fields) = inventory(&s).await;
  s.ensure_synced(&rt, &fields).await.unwrap();
  let id = s
    .create_record(&rt, data(&[("item_name", "Gauze".into())]), None)
    .await
    .unwrap();

  s.delete_record(&rt, &id).await.unwrap();
  assert!(s.get_record(&rt, &id).await.unwrap().is_none());
  assert!(s.list_records(&rt).await.unwrap().is_empty());
}

// ─── Fallback storage ────────────────────────────────────────────────────────

#[tokio::test]
async fn unsynced_types_use_the_fallback_table() {
  let s = store().await;
  let (rt, _) = inventory(&s).await;
  assert!(s.table_schema(&rt).await.unwrap().is_none());

  let id = s
    .create_record(
      &rt,
      data(&[
        ("item_name", "Gauze".into()),
        ("tags", FieldValue::List(vec!["a".into(), "b".into()])),
      ]),
      None,
    )
    .await
    .unwrap();

  s.update_record(&rt, &id, data(&[("quantity", 4i64.into())]))
    .await
    .unwrap();

  let record = s.get_record(&rt, &id).await.unwrap().unwrap();
  assert_eq!(record.fields["item_name"], FieldValue::text("Gauze"));
  assert_eq!(record.fields["quantity"], FieldValue::Integer(4));
  assert!(matches!(record.fields["tags"], FieldValue::List(ref items) if items.len() == 2));

  let listed = s.list_records(&rt).await.unwrap();
  assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn fallback_rows_are_scoped_to_their_type() {
  let s = store().await;
  let (rt, _) = inventory(&s).await;
  let other = s
    .create_type(NewRecordType::new("supplier", "Supplier"))
    .await
    .unwrap();

  let id = s
    .create_record(&rt, data(&[("item_name", "Gauze".into())]), None)
    .await
    .unwrap();
  assert!(s.get_record(&other, &id).await.unwrap().is_none());
  assert!(s.delete_record(&other, &id).await.is_err());
  assert!(s.get_record(&rt, &id).await.unwrap().is_some());
}

#[tokio::test]
async fn relation_lists_read_back_the_same_from_either_storage() {
  let s = store().await;
  let rt = s
    .create_type(NewRecordType::new("shift", "Shift"))
    .await
    .unwrap();
  s.create_field(
    &rt.id,
    NewField::new("staff", FieldKind::Relation).with_options(json!({ "record_type": "employee" })),
  )
  .await
  .unwrap();
  let staff = FieldValue::List(vec!["emp-1".into(), "emp-2".into()]);

  let fallback = s
    .create_record(&rt, data(&[("staff", staff.clone())]), None)
    .await
    .unwrap();
  let record = s.get_record(&rt, &fallback).await.unwrap().unwrap();
  assert_eq!(record.fields["staff"], staff);

  let fields = s.list_fields(&rt.id).await.unwrap();
  s.ensure_synced(&rt, &fields).await.unwrap();

  let table = s
    .create_record(&rt, data(&[("staff", staff.clone())]), None)
    .await
    .unwrap();
  let record = s.get_record(&rt, &table).await.unwrap().unwrap();
  assert_eq!(record.fields["staff"], staff);
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn types_can_be_created_before_seeding() {
  let s = store().await;
  let rt = s
    .create_type(NewRecordType::new("inventory_item", "Inventory Item"))
    .await
    .unwrap();
  assert_eq!(rt.category_id.as_deref(), Some(DEFAULT_CATEGORY_ID));

  let categories = s.list_categories().await.unwrap();
  let custom = categories
    .iter()
    .find(|c| c.category.id == DEFAULT_CATEGORY_ID)
    .expect("default category present");
  assert_eq!(custom.record_types.len(), 1);
}

#[tokio::test]
async fn invalid_and_duplicate_field_names_are_rejected() {
  let s = store().await;
  let (rt, _) = inventory(&s).await;

  for name in ["created_at", "cf_quantity", "two words"] {
    let err = s
      .create_field(&rt.id, NewField::new(name, FieldKind::Text))
      .await
      .unwrap_err();
    assert!(matches!(domain(&err), formwork_core::Error::InvalidFieldName(..)));
  }

  let err = s
    .create_field(&rt.id, NewField::new("quantity", FieldKind::Text))
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), formwork_core::Error::Duplicate(_)));
}

#[tokio::test]
async fn duplicate_type_names_are_rejected() {
  let s = store().await;
  inventory(&s).await;
  let err = s
    .create_type(NewRecordType::new("inventory_item", "Again"))
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), formwork_core::Error::Duplicate(_)));
}

#[tokio::test]
async fn fields_append_in_order() {
  let s = store().await;
  let (_, fields) = inventory(&s).await;
  let order: Vec<i64> = fields.iter().map(|f| f.order_index).collect();
  assert_eq!(order, [1, 2]);
}

#[tokio::test]
async fn resolve_type_accepts_id_or_name() {
  let s = store().await;
  let (rt, _) = inventory(&s).await;
  assert_eq!(s.resolve_type(&rt.id).await.unwrap().id, rt.id);
  assert_eq!(s.resolve_type("inventory_item").await.unwrap().id, rt.id);
  let err = s.resolve_type("ghost").await.unwrap_err();
  assert!(domain(&err).is_not_found());
}

#[tokio::test]
async fn field_patch_updates_definition() {
  let s = store().await;
  let (_, fields) = inventory(&s).await;
  let updated = s
    .update_field(&fields[0].id, FieldPatch {
      display_name: Some("Item".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.display_name, "Item");
  assert_eq!(s.get_field(&fields[0].id).await.unwrap().unwrap().display_name, "Item");
}

#[tokio::test]
async fn system_entries_are_protected() {
  let s = store().await;
  seed_builtin_catalog(&s).await.unwrap();
  let meeting = s.get_type("meeting").await.unwrap().unwrap();

  let err = s.delete_type(&meeting.id).await.unwrap_err();
  assert!(domain(&err).is_protected());

  let err = s
    .update_type(&meeting.id, RecordTypePatch {
      allow_delete: Some(false),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(domain(&err).is_protected());

  let renamed = s
    .update_type(&meeting.id, RecordTypePatch {
      display_name: Some("Team Meeting".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(renamed.display_name, "Team Meeting");
  assert_eq!(renamed.name, "meeting");

  let title = s.get_field("meet-1").await.unwrap().unwrap();
  let err = s
    .update_field(&title.id, FieldPatch {
      display_name: Some("Subject".into()),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(domain(&err).is_protected());
  let err = s.delete_field(&title.id).await.unwrap_err();
  assert!(domain(&err).is_protected());
}

#[tokio::test]
async fn deleting_a_type_retains_its_table() {
  let s = store().await;
  let (rt, fields) = inventory(&s).await;
  s.ensure_synced(&rt, &fields).await.unwrap();
  s.create_record(&rt, data(&[("item_name", "Gauze".into())]), None)
    .await
    .unwrap();

  s.delete_type(&rt.id).await.unwrap();

  assert!(s.get_type(&rt.id).await.unwrap().is_none());
  assert!(s.list_fields(&rt.id).await.unwrap().is_empty());
  assert!(s.table_schema(&rt).await.unwrap().is_some());
  assert_eq!(s.list_records(&rt).await.unwrap().len(), 1);

  let log = s.list_migrations(Some(&rt.id)).await.unwrap();
  assert_eq!(log.last().unwrap().change_type, ChangeKind::RetainTable);
}

#[tokio::test]
async fn categories_list_sidebar_types() {
  let s = store().await;
  s.create_category(NewCategory {
    id:           "cat-stock".into(),
    name:         "stock".into(),
    display_name: "Stock".into(),
    description:  None,
    icon:         None,
    color:        "#000000".into(),
    order_index:  1,
    is_system:    false,
  })
  .await
  .unwrap();

  let mut visible = NewRecordType::new("inventory_item", "Inventory Item");
  visible.category_id = Some("cat-stock".into());
  s.create_type(visible).await.unwrap();
  let mut hidden = NewRecordType::new("audit", "Audit");
  hidden.category_id = Some("cat-stock".into());
  hidden.show_in_sidebar = false;
  s.create_type(hidden).await.unwrap();

  let categories = s.list_categories().await.unwrap();
  assert_eq!(categories.len(), 2);
  let stock = categories.iter().find(|c| c.category.id == "cat-stock").unwrap();
  let names: Vec<_> = stock.record_types.iter().map(|t| t.name.as_str()).collect();
  assert_eq!(names, ["inventory_item"]);
}

#[tokio::test]
async fn only_one_default_form_per_type() {
  let s = store().await;
  let (rt, _) = inventory(&s).await;

  let first = s
    .create_form(NewForm {
      id:             None,
      record_type_id: rt.id.clone(),
      name:           "Quick".into(),
      is_default:     true,
      layout:         FormLayout::default(),
    })
    .await
    .unwrap();
  let second = s
    .create_form(NewForm {
      id:             None,
      record_type_id: rt.id.clone(),
      name:           "Full".into(),
      is_default:     true,
      layout:         FormLayout::default(),
    })
    .await
    .unwrap();

  let default = s.default_form(&rt.id).await.unwrap().unwrap();
  assert_eq!(default.id, second.id);
  assert!(!s.get_form(&first.id).await.unwrap().unwrap().is_default);

  let forms = s.list_forms(Some(&rt.id)).await.unwrap();
  assert_eq!(forms.len(), 2);
  assert_eq!(forms[0].id, second.id);

  s.delete_form(&first.id).await.unwrap();
  let err = s.delete_form(&first.id).await.unwrap_err();
  assert!(domain(&err).is_not_found());
}

// ─── Fixtures and calendar ───────────────────────────────────────────────────

#[tokio::test]
async fn seeding_is_idempotent() {
  let s = store().await;
  let first = seed_builtin_catalog(&s).await.unwrap();
  assert_eq!(first.record_types, 4);

  let second = seed_builtin_catalog(&s).await.unwrap();
  assert_eq!(second.categories, 0);
  assert_eq!(second.record_types, 0);

  let meeting = s.get_type("meeting").await.unwrap().unwrap();
  let schema = s.table_schema(&meeting).await.unwrap().unwrap();
  assert_eq!(schema.table, "meetings");
  assert!(schema.columns.iter().any(|c| c == "attendees"));
  assert!(s.default_form("meeting").await.unwrap().is_some());
}

#[tokio::test]
async fn calendar_filters_meetings_by_attendee() {
  let s = store().await;
  seed_builtin_catalog(&s).await.unwrap();
  let meeting = s.get_type("meeting").await.unwrap().unwrap();

  s.create_record(
    &meeting,
    data(&[
      ("title", "Standup".into()),
      ("start_time", "2024-05-01T09:00".into()),
      ("end_time", "2024-05-01T09:15".into()),
      ("organizer_id", "emp-1".into()),
      ("attendees", FieldValue::List(vec!["emp-1".into(), "emp-2".into()])),
    ]),
    None,
  )
  .await
  .unwrap();

  let for_attendee = project_events(&s, &EventQuery::for_subject("emp-2")).await.unwrap();
  assert_eq!(for_attendee.len(), 1);
  assert_eq!(for_attendee[0].title, "Standup");
  assert_eq!(for_attendee[0].record_type, "meeting");

  let for_stranger = project_events(&s, &EventQuery::for_subject("emp-3")).await.unwrap();
  assert!(for_stranger.is_empty());

  let everyone = project_events(&s, &EventQuery::default()).await.unwrap();
  assert_eq!(everyone.len(), 1);
}

#[tokio::test]
async fn disabled_calendar_settings_hide_a_type() {
  let s = store().await;
  let (rt, _) = inventory(&s).await;
  s.create_field(&rt.id, NewField::new("received_on", FieldKind::Date))
    .await
    .unwrap();
  let fields = s.list_fields(&rt.id).await.unwrap();
  s.ensure_synced(&rt, &fields).await.unwrap();
  s.create_record(
    &rt,
    data(&[("item_name", "Gauze".into()), ("received_on", "2024-05-02".into())]),
    None,
  )
  .await
  .unwrap();

  let mut settings = NewCalendarSettings::new("received_on").titled("item_name");
  settings.show_on_calendar = false;
  s.create_calendar_settings(&rt.id, settings).await.unwrap();
  assert!(project_events(&s, &EventQuery::default()).await.unwrap().is_empty());

  s.update_calendar_settings(&rt.id, CalendarSettingsPatch {
    show_on_calendar: Some(true),
    ..Default::default()
  })
  .await
  .unwrap();
  let events = project_events(&s, &EventQuery::default()).await.unwrap();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].title, "Gauze");
}
