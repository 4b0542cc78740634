//! [`CatalogStore`] for [`SqliteStore`]: plain CRUD over the catalog tables.
//!
//! Nothing here touches per-type record tables; callers decide when to run
//! synchronisation after a catalog edit.

use std::collections::HashMap;

use chrono::Utc;
use formwork_core::{
  calendar::{CalendarSettings, CalendarSettingsPatch, NewCalendarSettings},
  field::{FieldDefinition, FieldPatch, NewField, validate_field_name},
  form::{FormDefinition, FormPatch, NewForm},
  naming::table_name,
  record_type::{
    CategoryWithTypes, DEFAULT_CATEGORY_ID, NewCategory, NewRecordType, RecordCategory, RecordType, RecordTypePatch,
  },
  schema::ChangeKind,
  store::CatalogStore,
};
use rusqlite::{Connection, OptionalExtension as _};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    CALENDAR_COLUMNS, CATEGORY_COLUMNS, FIELD_COLUMNS, FORM_COLUMNS, RawCategory, RawField,
    RawForm, RawRecordType, TYPE_COLUMNS, calendar_from_row, encode_dt, encode_options,
  },
  error::boxed,
  store::SqliteStore,
  sync::log_migration,
};

type CoreError = formwork_core::Error;

// ─── Row helpers (connection thread) ─────────────────────────────────────────

fn select_type(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawRecordType>> {
  conn
    .query_row(
      &format!("SELECT {TYPE_COLUMNS} FROM record_types WHERE id = ?1"),
      rusqlite::params![id],
      RawRecordType::from_row,
    )
    .optional()
}

fn select_field(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawField>> {
  conn
    .query_row(
      &format!("SELECT {FIELD_COLUMNS} FROM field_definitions WHERE id = ?1"),
      rusqlite::params![id],
      RawField::from_row,
    )
    .optional()
}

fn select_form(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawForm>> {
  conn
    .query_row(
      &format!("SELECT {FORM_COLUMNS} FROM form_definitions WHERE id = ?1"),
      rusqlite::params![id],
      RawForm::from_row,
    )
    .optional()
}

fn select_calendar(
  conn: &Connection,
  record_type_id: &str,
) -> rusqlite::Result<Option<CalendarSettings>> {
  conn
    .query_row(
      &format!("SELECT {CALENDAR_COLUMNS} FROM calendar_settings WHERE record_type_id = ?1"),
      rusqlite::params![record_type_id],
      calendar_from_row,
    )
    .optional()
}

fn type_exists(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM record_types WHERE id = ?1",
        rusqlite::params![id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

fn require_type(conn: &Connection, id: &str) -> tokio_rusqlite::Result<()> {
  if !type_exists(conn, id)? {
    return Err(boxed(CoreError::RecordTypeNotFound(id.to_owned())));
  }
  Ok(())
}

fn clear_default_forms(conn: &Connection, record_type_id: &str) -> rusqlite::Result<()> {
  conn.execute(
    "UPDATE form_definitions SET is_default = 0 WHERE record_type_id = ?1",
    rusqlite::params![record_type_id],
  )?;
  Ok(())
}

fn write_type(conn: &Connection, rt: &RecordType) -> rusqlite::Result<()> {
  conn.execute(
    "UPDATE record_types SET
       display_name = ?2, category_id = ?3, description = ?4, color = ?5, icon = ?6,
       allow_create = ?7, allow_edit = ?8, allow_delete = ?9,
       show_in_calendar = ?10, show_in_sidebar = ?11,
       requires_patient = ?12, requires_visit = ?13,
       order_index = ?14, updated_at = ?15
     WHERE id = ?1",
    rusqlite::params![
      rt.id,
      rt.display_name,
      rt.category_id,
      rt.description,
      rt.color,
      rt.icon,
      rt.allow_create,
      rt.allow_edit,
      rt.allow_delete,
      rt.show_in_calendar,
      rt.show_in_sidebar,
      rt.requires_patient,
      rt.requires_visit,
      rt.order_index,
      encode_dt(rt.updated_at),
    ],
  )?;
  Ok(())
}

fn write_field(conn: &Connection, field: &FieldDefinition) -> tokio_rusqlite::Result<()> {
  let options = encode_options(field.options.as_ref()).map_err(boxed)?;
  conn.execute(
    "UPDATE field_definitions SET
       field_name = ?2, display_name = ?3, field_type = ?4, is_required = ?5,
       default_value = ?6, options = ?7, validation_rules = ?8, order_index = ?9,
       show_in_employee_calendar = ?10, show_on_calendar = ?11, read_only = ?12
     WHERE id = ?1",
    rusqlite::params![
      field.id,
      field.field_name,
      field.display_name,
      field.field_type.as_ref(),
      field.is_required,
      field.default_value,
      options,
      field.validation_rules,
      field.order_index,
      field.show_in_employee_calendar,
      field.show_on_calendar,
      field.read_only,
    ],
  )?;
  Ok(())
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  // ── Record types ──────────────────────────────────────────────────────────

  async fn create_type(&self, input: NewRecordType) -> Result<RecordType> {
    let now = Utc::now();
    let record_type = RecordType {
      id:               input.resolve_id()?,
      category_id:      Some(input.category_or_default()),
      name:             input.name,
      display_name:     input.display_name,
      description:      input.description,
      color:            input.color,
      icon:             input.icon,
      is_system:        input.is_system,
      allow_create:     input.allow_create,
      allow_edit:       input.allow_edit,
      allow_delete:     input.allow_delete,
      show_in_calendar: input.show_in_calendar,
      show_in_sidebar:  input.show_in_sidebar,
      requires_patient: input.requires_patient,
      requires_visit:   input.requires_visit,
      order_index:      input.order_index,
      created_at:       now,
      updated_at:       now,
    };

    let rt = record_type.clone();
    self
      .conn
      .call(move |conn| {
        let taken = conn
          .query_row(
            "SELECT 1 FROM record_types WHERE id = ?1 OR name = ?2",
            rusqlite::params![rt.id, rt.name],
            |_| Ok(()),
          )
          .optional()?;
        if taken.is_some() {
          return Err(boxed(CoreError::Duplicate(format!("record type {}", rt.name))));
        }

        let at = encode_dt(rt.created_at);
        conn.execute(
          "INSERT INTO record_types (
             id, name, display_name, category_id, description, color, icon, is_system,
             allow_create, allow_edit, allow_delete, show_in_calendar, show_in_sidebar,
             requires_patient, requires_visit, order_index, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)",
          rusqlite::params![
            rt.id,
            rt.name,
            rt.display_name,
            rt.category_id,
            rt.description,
            rt.color,
            rt.icon,
            rt.is_system,
            rt.allow_create,
            rt.allow_edit,
            rt.allow_delete,
            rt.show_in_calendar,
            rt.show_in_sidebar,
            rt.requires_patient,
            rt.requires_visit,
            rt.order_index,
            at,
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::info!(id = %record_type.id, name = %record_type.name, "record type created");
    Ok(record_type)
  }

  async fn get_type(&self, id: &str) -> Result<Option<RecordType>> {
    let id = id.to_owned();
    let raw = self.conn.call(move |conn| Ok(select_type(conn, &id)?)).await?;
    raw.map(RawRecordType::into_record_type).transpose()
  }

  async fn get_type_by_name(&self, name: &str) -> Result<Option<RecordType>> {
    let name = name.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {TYPE_COLUMNS} FROM record_types WHERE name = ?1"),
              rusqlite::params![name],
              RawRecordType::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawRecordType::into_record_type).transpose()
  }

  async fn list_types(&self) -> Result<Vec<RecordType>> {
    let raws: Vec<RawRecordType> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TYPE_COLUMNS} FROM record_types ORDER BY display_name"
        ))?;
        let rows = stmt
          .query_map([], RawRecordType::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawRecordType::into_record_type).collect()
  }

  async fn update_type(&self, id: &str, patch: RecordTypePatch) -> Result<RecordType> {
    let id = id.to_owned();
    let updated = self
      .conn
      .call(move |conn| {
        let raw = select_type(conn, &id)?
          .ok_or_else(|| boxed(CoreError::RecordTypeNotFound(id.clone())))?;
        let mut record_type = raw.into_record_type().map_err(boxed)?;
        patch.check_allowed(&record_type).map_err(boxed)?;
        patch.apply(&mut record_type);
        record_type.updated_at = Utc::now();
        write_type(conn, &record_type)?;
        Ok(record_type)
      })
      .await?;
    Ok(updated)
  }

  async fn delete_type(&self, id: &str) -> Result<()> {
    let id = id.to_owned();
    let name = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw = select_type(&tx, &id)?
          .ok_or_else(|| boxed(CoreError::RecordTypeNotFound(id.clone())))?;
        if raw.is_system {
          return Err(boxed(CoreError::SystemRecordType(raw.name, "deleted")));
        }

        for table in ["field_definitions", "form_definitions", "calendar_settings"] {
          tx.execute(
            &format!("DELETE FROM {table} WHERE record_type_id = ?1"),
            rusqlite::params![id],
          )?;
        }
        tx.execute("DELETE FROM record_types WHERE id = ?1", rusqlite::params![id])?;
        log_migration(
          &tx,
          &id,
          ChangeKind::RetainTable,
          &format!(
            "record type {} deleted; table {} and fallback rows retained",
            raw.name,
            table_name(&raw.name, raw.is_system)
          ),
        )?;
        tx.commit()?;
        Ok(raw.name)
      })
      .await?;

    tracing::info!(name = %name, "record type deleted, physical data retained");
    Ok(())
  }

  // ── Fields ────────────────────────────────────────────────────────────────

  async fn create_field(&self, record_type_id: &str, input: NewField) -> Result<FieldDefinition> {
    validate_field_name(&input.field_name)?;
    let options = encode_options(input.options.as_ref())?;
    let record_type_id = record_type_id.to_owned();
    let now = Utc::now();

    let field = self
      .conn
      .call(move |conn| {
        require_type(conn, &record_type_id)?;
        let taken = conn
          .query_row(
            "SELECT 1 FROM field_definitions WHERE record_type_id = ?1 AND field_name = ?2",
            rusqlite::params![record_type_id, input.field_name],
            |_| Ok(()),
          )
          .optional()?;
        if taken.is_some() {
          return Err(boxed(CoreError::Duplicate(format!(
            "field {} on record type {record_type_id}",
            input.field_name
          ))));
        }

        let order_index = match input.order_index {
          Some(i) => i,
          None => conn.query_row(
            "SELECT COALESCE(MAX(order_index), 0) + 1 FROM field_definitions
             WHERE record_type_id = ?1",
            rusqlite::params![record_type_id],
            |row| row.get(0),
          )?,
        };

        let field = FieldDefinition {
          id: input.resolve_id(),
          record_type_id,
          field_name: input.field_name,
          display_name: input.display_name,
          field_type: input.field_type,
          is_required: input.is_required,
          default_value: input.default_value,
          options: input.options,
          validation_rules: input.validation_rules,
          order_index,
          show_in_employee_calendar: input.show_in_employee_calendar,
          show_on_calendar: input.show_on_calendar,
          read_only: input.read_only,
          is_system: input.is_system,
          created_at: now,
        };

        conn.execute(
          "INSERT INTO field_definitions (
             id, record_type_id, field_name, display_name, field_type, is_required,
             default_value, options, validation_rules, order_index,
             show_in_employee_calendar, show_on_calendar, read_only, is_system, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
          rusqlite::params![
            field.id,
            field.record_type_id,
            field.field_name,
            field.display_name,
            field.field_type.as_ref(),
            field.is_required,
            field.default_value,
            options,
            field.validation_rules,
            field.order_index,
            field.show_in_employee_calendar,
            field.show_on_calendar,
            field.read_only,
            field.is_system,
            encode_dt(field.created_at),
          ],
        )?;
        Ok(field)
      })
      .await?;

    Ok(field)
  }

  async fn get_field(&self, id: &str) -> Result<Option<FieldDefinition>> {
    let id = id.to_owned();
    let raw = self.conn.call(move |conn| Ok(select_field(conn, &id)?)).await?;
    raw.map(RawField::into_field).transpose()
  }

  async fn list_fields(&self, record_type_id: &str) -> Result<Vec<FieldDefinition>> {
    let record_type_id = record_type_id.to_owned();
    let raws: Vec<RawField> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FIELD_COLUMNS} FROM field_definitions
           WHERE record_type_id = ?1 ORDER BY order_index, created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![record_type_id], RawField::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawField::into_field).collect()
  }

  async fn update_field(&self, id: &str, patch: FieldPatch) -> Result<FieldDefinition> {
    if let Some(name) = &patch.field_name {
      validate_field_name(name)?;
    }
    let id = id.to_owned();

    let field = self
      .conn
      .call(move |conn| {
        let raw =
          select_field(conn, &id)?.ok_or_else(|| boxed(CoreError::FieldNotFound(id.clone())))?;
        if raw.is_system {
          return Err(boxed(CoreError::SystemField(raw.field_name, "modified")));
        }
        let mut field = raw.into_field().map_err(boxed)?;

        if let Some(name) = patch.field_name.as_ref().filter(|n| **n != field.field_name) {
          let taken = conn
            .query_row(
              "SELECT 1 FROM field_definitions WHERE record_type_id = ?1 AND field_name = ?2",
              rusqlite::params![field.record_type_id, name],
              |_| Ok(()),
            )
            .optional()?;
          if taken.is_some() {
            return Err(boxed(CoreError::Duplicate(format!("field {name}"))));
          }
        }

        patch.apply(&mut field);
        write_field(conn, &field)?;
        Ok(field)
      })
      .await?;
    Ok(field)
  }

  async fn delete_field(&self, id: &str) -> Result<()> {
    let id = id.to_owned();
    self
      .conn
      .call(move |conn| {
        let raw =
          select_field(conn, &id)?.ok_or_else(|| boxed(CoreError::FieldNotFound(id.clone())))?;
        if raw.is_system {
          return Err(boxed(CoreError::SystemField(raw.field_name, "deleted")));
        }
        conn.execute("DELETE FROM field_definitions WHERE id = ?1", rusqlite::params![id])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Categories ────────────────────────────────────────────────────────────

  async fn create_category(&self, input: NewCategory) -> Result<RecordCategory> {
    let now = Utc::now();
    let category = RecordCategory {
      id:           input.id,
      name:         input.name,
      display_name: input.display_name,
      description:  input.description,
      icon:         input.icon,
      color:        input.color,
      order_index:  input.order_index,
      is_system:    input.is_system,
      created_at:   now,
      updated_at:   now,
    };

    let c = category.clone();
    self
      .conn
      .call(move |conn| {
        let taken = conn
          .query_row(
            "SELECT 1 FROM record_categories WHERE id = ?1 OR name = ?2",
            rusqlite::params![c.id, c.name],
            |_| Ok(()),
          )
          .optional()?;
        if taken.is_some() {
          return Err(boxed(CoreError::Duplicate(format!("category {}", c.name))));
        }
        let at = encode_dt(c.created_at);
        conn.execute(
          "INSERT INTO record_categories (
             id, name, display_name, description, icon, color, order_index, is_system,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
          rusqlite::params![
            c.id,
            c.name,
            c.display_name,
            c.description,
            c.icon,
            c.color,
            c.order_index,
            c.is_system,
            at,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(category)
  }

  async fn list_categories(&self) -> Result<Vec<CategoryWithTypes>> {
    let (raw_categories, raw_types): (Vec<RawCategory>, Vec<RawRecordType>) = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CATEGORY_COLUMNS} FROM record_categories ORDER BY order_index, display_name"
        ))?;
        let categories = stmt
          .query_map([], RawCategory::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {TYPE_COLUMNS} FROM record_types
           WHERE show_in_sidebar = 1 ORDER BY order_index, display_name"
        ))?;
        let types = stmt
          .query_map([], RawRecordType::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((categories, types))
      })
      .await?;

    let mut by_category: HashMap<String, Vec<RecordType>> = HashMap::new();
    for raw in raw_types {
      let record_type = raw.into_record_type()?;
      let key = record_type
        .category_id
        .clone()
        .unwrap_or_else(|| DEFAULT_CATEGORY_ID.to_owned());
      by_category.entry(key).or_default().push(record_type);
    }

    raw_categories
      .into_iter()
      .map(|raw| -> Result<CategoryWithTypes> {
        let category = raw.into_category()?;
        let record_types = by_category.remove(&category.id).unwrap_or_default();
        Ok(CategoryWithTypes {
          category,
          record_types,
        })
      })
      .collect()
  }

  // ── Forms ─────────────────────────────────────────────────────────────────

  async fn create_form(&self, input: NewForm) -> Result<FormDefinition> {
    let now = Utc::now();
    let form = FormDefinition {
      id:             input
        .id
        .unwrap_or_else(|| format!("form-{}", Uuid::new_v4().simple())),
      record_type_id: input.record_type_id,
      name:           input.name,
      is_default:     input.is_default,
      layout:         input.layout,
      created_at:     now,
      updated_at:     now,
    };
    let layout = serde_json::to_string(&form.layout)?;

    let f = form.clone();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        require_type(&tx, &f.record_type_id)?;
        if f.is_default {
          clear_default_forms(&tx, &f.record_type_id)?;
        }
        let at = encode_dt(f.created_at);
        tx.execute(
          "INSERT INTO form_definitions (
             id, record_type_id, name, is_default, layout, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          rusqlite::params![f.id, f.record_type_id, f.name, f.is_default, layout, at],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(form)
  }

  async fn list_forms(&self, record_type_id: Option<&str>) -> Result<Vec<FormDefinition>> {
    let record_type_id = record_type_id.map(str::to_owned);
    let raws: Vec<RawForm> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FORM_COLUMNS} FROM form_definitions
           WHERE ?1 IS NULL OR record_type_id = ?1
           ORDER BY is_default DESC, name"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![record_type_id], RawForm::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawForm::into_form).collect()
  }

  async fn get_form(&self, id: &str) -> Result<Option<FormDefinition>> {
    let id = id.to_owned();
    let raw = self.conn.call(move |conn| Ok(select_form(conn, &id)?)).await?;
    raw.map(RawForm::into_form).transpose()
  }

  async fn default_form(&self, record_type_id: &str) -> Result<Option<FormDefinition>> {
    let record_type_id = record_type_id.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {FORM_COLUMNS} FROM form_definitions
                 WHERE record_type_id = ?1 AND is_default = 1 LIMIT 1"
              ),
              rusqlite::params![record_type_id],
              RawForm::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawForm::into_form).transpose()
  }

  async fn update_form(&self, id: &str, patch: FormPatch) -> Result<FormDefinition> {
    let id = id.to_owned();
    let form = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw =
          select_form(&tx, &id)?.ok_or_else(|| boxed(CoreError::FormNotFound(id.clone())))?;
        let mut form = raw.into_form().map_err(boxed)?;

        if let Some(name) = patch.name {
          form.name = name;
        }
        if let Some(layout) = patch.layout {
          form.layout = layout;
        }
        if let Some(is_default) = patch.is_default {
          if is_default && !form.is_default {
            clear_default_forms(&tx, &form.record_type_id)?;
          }
          form.is_default = is_default;
        }
        form.updated_at = Utc::now();

        let layout = serde_json::to_string(&form.layout).map_err(boxed)?;
        tx.execute(
          "UPDATE form_definitions SET name = ?2, is_default = ?3, layout = ?4, updated_at = ?5
           WHERE id = ?1",
          rusqlite::params![form.id, form.name, form.is_default, layout, encode_dt(form.updated_at)],
        )?;
        tx.commit()?;
        Ok(form)
      })
      .await?;
    Ok(form)
  }

  async fn delete_form(&self, id: &str) -> Result<()> {
    let id = id.to_owned();
    self
      .conn
      .call(move |conn| {
        let changed =
          conn.execute("DELETE FROM form_definitions WHERE id = ?1", rusqlite::params![id])?;
        if changed == 0 {
          return Err(boxed(CoreError::FormNotFound(id)));
        }
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Calendar settings ─────────────────────────────────────────────────────

  async fn calendar_settings(&self, record_type_id: &str) -> Result<Option<CalendarSettings>> {
    let record_type_id = record_type_id.to_owned();
    let settings = self
      .conn
      .call(move |conn| Ok(select_calendar(conn, &record_type_id)?))
      .await?;
    Ok(settings)
  }

  async fn create_calendar_settings(
    &self,
    record_type_id: &str,
    input: NewCalendarSettings,
  ) -> Result<CalendarSettings> {
    let settings = CalendarSettings {
      id:               input.resolve_id(record_type_id),
      record_type_id:   record_type_id.to_owned(),
      date_field:       input.date_field,
      title_field:      input.title_field,
      show_on_calendar: input.show_on_calendar,
    };

    let s = settings.clone();
    self
      .conn
      .call(move |conn| {
        require_type(conn, &s.record_type_id)?;
        if select_calendar(conn, &s.record_type_id)?.is_some() {
          return Err(boxed(CoreError::Duplicate(format!(
            "calendar settings for {}",
            s.record_type_id
          ))));
        }
        conn.execute(
          "INSERT INTO calendar_settings (id, record_type_id, date_field, title_field, show_on_calendar)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![s.id, s.record_type_id, s.date_field, s.title_field, s.show_on_calendar],
        )?;
        Ok(())
      })
      .await?;

    Ok(settings)
  }

  async fn update_calendar_settings(
    &self,
    record_type_id: &str,
    patch: CalendarSettingsPatch,
  ) -> Result<CalendarSettings> {
    let record_type_id = record_type_id.to_owned();
    let settings = self
      .conn
      .call(move |conn| {
        let mut settings = select_calendar(conn, &record_type_id)?
          .ok_or_else(|| boxed(CoreError::CalendarSettingsNotFound(record_type_id.clone())))?;
        patch.apply(&mut settings);
        conn.execute(
          "UPDATE calendar_settings SET date_field = ?2, title_field = ?3, show_on_calendar = ?4
           WHERE id = ?1",
          rusqlite::params![
            settings.id,
            settings.date_field,
            settings.title_field,
            settings.show_on_calendar
          ],
        )?;
        Ok(settings)
      })
      .await?;
    Ok(settings)
  }
}
