//! Built-in catalog: the default categories and the four legacy system types
//! (employee, patient, visit, meeting) with their fields, calendar settings
//! and default forms.
//!
//! Seeding goes through the store traits like any operator edit, so it is
//! safe to run on every start; entries that already exist are left alone.

use serde_json::json;

use crate::{
  calendar::NewCalendarSettings,
  field::{FieldKind, NewField},
  form::{NewForm, default_layout},
  record_type::{DEFAULT_CATEGORY_ID, NewCategory, NewRecordType},
  store::RecordStore,
};

/// What a seeding pass inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
  pub categories:   usize,
  pub record_types: usize,
}

struct BuiltinType {
  id:       &'static str,
  display:  &'static str,
  category: &'static str,
  color:    &'static str,
  icon:     &'static str,
  order:    i64,
  fields:   fn() -> Vec<NewField>,
  calendar: (&'static str, &'static str),
}

fn categories() -> Vec<NewCategory> {
  let rows = [
    ("cat-clinical", "clinical", "Clinical", "Patient care and medical records", "Stethoscope", "#10B981", 1),
    ("cat-scheduling", "scheduling", "Scheduling", "Appointments and calendar events", "Calendar", "#3B82F6", 2),
    ("cat-administrative", "administrative", "Administrative", "Office and staff management", "Briefcase", "#8B5CF6", 3),
    ("cat-financial", "financial", "Financial", "Billing and payments", "DollarSign", "#F59E0B", 4),
    ("cat-documents", "documents", "Documents", "Forms and paperwork", "FileText", "#6B7280", 5),
    ("cat-pharmacy", "pharmacy", "Pharmacy", "Medications and prescriptions", "Pill", "#EC4899", 6),
    (DEFAULT_CATEGORY_ID, "custom", "Custom", "Operator-defined record types", "Folder", "#6B7280", 999),
  ];
  rows
    .into_iter()
    .map(|(id, name, display, description, icon, color, order)| NewCategory {
      id:           id.into(),
      name:         name.into(),
      display_name: display.into(),
      description:  Some(description.into()),
      icon:         Some(icon.into()),
      color:        color.into(),
      order_index:  order,
      is_system:    true,
    })
    .collect()
}

fn field(
  id: &str,
  name: &str,
  display: &str,
  kind: FieldKind,
  order: i64,
) -> NewField {
  let mut field = NewField::new(name, kind);
  field.id = Some(id.into());
  field.display_name = display.into();
  field.order_index = Some(order);
  field.is_system = true;
  field
}

fn employee_ref() -> serde_json::Value { json!({ "record_type": "employee" }) }

fn employee_fields() -> Vec<NewField> {
  vec![
    field("emp-1", "first_name", "First Name", FieldKind::Text, 1).required(),
    field("emp-2", "last_name", "Last Name", FieldKind::Text, 2).required(),
    field("emp-3", "email", "Email", FieldKind::Text, 3).required(),
    field("emp-4", "phone", "Phone", FieldKind::Text, 4),
    field("emp-5", "role", "Role", FieldKind::Text, 5),
    field("emp-6", "department", "Department", FieldKind::Text, 6),
    field("emp-7", "hire_date", "Hire Date", FieldKind::Date, 7),
    field("emp-8", "manager_id", "Manager", FieldKind::Relation, 8)
      .with_options(employee_ref())
      .calendar_relevant(),
  ]
}

fn patient_fields() -> Vec<NewField> {
  vec![
    field("pat-1", "first_name", "First Name", FieldKind::Text, 1).required(),
    field("pat-2", "last_name", "Last Name", FieldKind::Text, 2).required(),
    field("pat-3", "date_of_birth", "Date of Birth", FieldKind::Date, 3).required(),
    field("pat-4", "gender", "Gender", FieldKind::Select, 4)
      .with_options(json!(["Male", "Female", "Other"])),
    field("pat-5", "email", "Email", FieldKind::Text, 5),
    field("pat-6", "phone", "Phone", FieldKind::Text, 6),
    field("pat-7", "medical_record_number", "MRN", FieldKind::Text, 7),
    field("pat-8", "primary_provider_id", "Primary Provider", FieldKind::Relation, 8)
      .with_options(employee_ref())
      .calendar_relevant(),
  ]
}

fn visit_fields() -> Vec<NewField> {
  vec![
    field("vis-1", "patient_id", "Patient", FieldKind::Relation, 1)
      .required()
      .with_options(json!({ "record_type": "patient" })),
    field("vis-2", "provider_id", "Provider", FieldKind::Relation, 2)
      .required()
      .with_options(employee_ref())
      .calendar_relevant(),
    field("vis-3", "visit_date", "Visit Date", FieldKind::Datetime, 3).required(),
    field("vis-4", "visit_type", "Visit Type", FieldKind::Select, 4)
      .required()
      .with_options(json!(["Consultation", "Follow-up", "Emergency", "Routine Check"])),
    field("vis-5", "reason", "Reason", FieldKind::Text, 5),
    field("vis-6", "status", "Status", FieldKind::Select, 6)
      .with_options(json!(["scheduled", "completed", "cancelled", "no-show"])),
    field("vis-7", "duration_minutes", "Duration (min)", FieldKind::Number, 7),
  ]
}

fn meeting_fields() -> Vec<NewField> {
  vec![
    field("meet-1", "title", "Title", FieldKind::Text, 1).required(),
    field("meet-2", "description", "Description", FieldKind::Textarea, 2),
    field("meet-3", "start_time", "Start Time", FieldKind::Datetime, 3).required(),
    field("meet-4", "end_time", "End Time", FieldKind::Datetime, 4).required(),
    field("meet-5", "location", "Location", FieldKind::Text, 5),
    field("meet-6", "organizer_id", "Organizer", FieldKind::Relation, 6)
      .required()
      .with_options(employee_ref())
      .calendar_relevant(),
    field("meet-7", "meeting_type", "Type", FieldKind::Select, 7)
      .with_options(json!(["Staff", "Patient", "External", "Training"])),
    field("meet-8", "attendees", "Attendees", FieldKind::Multiselect, 8)
      .with_options(employee_ref())
      .calendar_relevant(),
  ]
}

const BUILTIN_TYPES: [BuiltinType; 4] = [
  BuiltinType {
    id:       "employee",
    display:  "Employee",
    category: "cat-administrative",
    color:    "#10B981",
    icon:     "user",
    order:    1,
    fields:   employee_fields,
    calendar: ("hire_date", "first_name"),
  },
  BuiltinType {
    id:       "patient",
    display:  "Patient",
    category: "cat-clinical",
    color:    "#3B82F6",
    icon:     "user-check",
    order:    1,
    fields:   patient_fields,
    calendar: ("created_at", "first_name"),
  },
  BuiltinType {
    id:       "visit",
    display:  "Visit",
    category: "cat-clinical",
    color:    "#EF4444",
    icon:     "calendar",
    order:    2,
    fields:   visit_fields,
    calendar: ("visit_date", "visit_type"),
  },
  BuiltinType {
    id:       "meeting",
    display:  "Meeting",
    category: "cat-scheduling",
    color:    "#F59E0B",
    icon:     "users",
    order:    1,
    fields:   meeting_fields,
    calendar: ("start_time", "title"),
  },
];

/// Insert whatever part of the built-in catalog is missing, then synchronise
/// the built-in types so their tables exist.
pub async fn seed_builtin_catalog<S: RecordStore>(store: &S) -> Result<SeedSummary, S::Error> {
  let mut summary = SeedSummary::default();

  let existing: Vec<String> = store
    .list_categories()
    .await?
    .into_iter()
    .map(|c| c.category.id)
    .collect();
  for category in categories() {
    if !existing.contains(&category.id) {
      store.create_category(category).await?;
      summary.categories += 1;
    }
  }

  for builtin in &BUILTIN_TYPES {
    if store.get_type(builtin.id).await?.is_some() {
      continue;
    }

    let mut input = NewRecordType::new(builtin.id, builtin.display).system();
    input.id = Some(builtin.id.into());
    input.category_id = Some(builtin.category.into());
    input.color = builtin.color.into();
    input.icon = Some(builtin.icon.into());
    input.order_index = builtin.order;
    let record_type = store.create_type(input).await?;

    for field in (builtin.fields)() {
      store.create_field(&record_type.id, field).await?;
    }

    let (date_field, title_field) = builtin.calendar;
    store
      .create_calendar_settings(
        &record_type.id,
        NewCalendarSettings::new(date_field).titled(title_field),
      )
      .await?;

    let fields = store.list_fields(&record_type.id).await?;
    if store.default_form(&record_type.id).await?.is_none() {
      store
        .create_form(NewForm {
          id:             Some(format!("form-{}-default", record_type.name)),
          record_type_id: record_type.id.clone(),
          name:           format!("Default {} Form", record_type.display_name),
          is_default:     true,
          layout:         default_layout(&fields),
        })
        .await?;
    }

    store.ensure_synced(&record_type, &fields).await?;
    summary.record_types += 1;
  }

  Ok(summary)
}
