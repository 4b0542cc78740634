//! Catalog schema for the Formwork SQLite store.
//!
//! Only the fixed catalog tables live here. Per-type record tables are
//! created at runtime by the synchroniser (see `sync.rs`).
//!
//! Foreign keys are declared but not enforced: the bundled SQLite build
//! turns enforcement on, so `SCHEMA` switches it off for the connection.
//! Relation columns are best-effort references and deleting a referenced
//! row never fails.

/// Catalog DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = OFF;

CREATE TABLE IF NOT EXISTS record_categories (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE,
    display_name  TEXT NOT NULL,
    description   TEXT,
    icon          TEXT,
    color         TEXT NOT NULL DEFAULT '#6B7280',
    order_index   INTEGER NOT NULL DEFAULT 999,
    is_system     BOOLEAN NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- `name` is baked into the physical table name and never updated.
CREATE TABLE IF NOT EXISTS record_types (
    id                TEXT PRIMARY KEY,
    name              TEXT NOT NULL UNIQUE,
    display_name      TEXT NOT NULL,
    category_id       TEXT REFERENCES record_categories(id),
    description       TEXT,
    color             TEXT NOT NULL DEFAULT '#6B7280',
    icon              TEXT,
    is_system         BOOLEAN NOT NULL DEFAULT 0,
    allow_create      BOOLEAN NOT NULL DEFAULT 1,
    allow_edit        BOOLEAN NOT NULL DEFAULT 1,
    allow_delete      BOOLEAN NOT NULL DEFAULT 1,
    show_in_calendar  BOOLEAN NOT NULL DEFAULT 1,
    show_in_sidebar   BOOLEAN NOT NULL DEFAULT 1,
    requires_patient  BOOLEAN NOT NULL DEFAULT 0,
    requires_visit    BOOLEAN NOT NULL DEFAULT 0,
    order_index       INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS field_definitions (
    id                         TEXT PRIMARY KEY,
    record_type_id             TEXT NOT NULL REFERENCES record_types(id),
    field_name                 TEXT NOT NULL,
    display_name               TEXT NOT NULL,
    field_type                 TEXT NOT NULL,   -- FieldKind, snake_case
    is_required                BOOLEAN NOT NULL DEFAULT 0,
    default_value              TEXT,
    options                    TEXT,            -- JSON, kind-specific
    validation_rules           TEXT,
    order_index                INTEGER NOT NULL DEFAULT 0,
    show_in_employee_calendar  BOOLEAN NOT NULL DEFAULT 0,
    show_on_calendar           BOOLEAN NOT NULL DEFAULT 0,
    read_only                  BOOLEAN NOT NULL DEFAULT 0,
    is_system                  BOOLEAN NOT NULL DEFAULT 0,
    created_at                 TEXT NOT NULL,
    UNIQUE (record_type_id, field_name)
);

CREATE TABLE IF NOT EXISTS form_definitions (
    id              TEXT PRIMARY KEY,
    record_type_id  TEXT NOT NULL REFERENCES record_types(id),
    name            TEXT NOT NULL,
    is_default      BOOLEAN NOT NULL DEFAULT 0,
    layout          TEXT NOT NULL,   -- JSON FormLayout
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS calendar_settings (
    id                TEXT PRIMARY KEY,
    record_type_id    TEXT NOT NULL UNIQUE REFERENCES record_types(id),
    date_field        TEXT NOT NULL,
    title_field       TEXT,
    show_on_calendar  BOOLEAN NOT NULL DEFAULT 1
);

-- JSON documents for record types without a dedicated table.
CREATE TABLE IF NOT EXISTS dynamic_records (
    id              TEXT PRIMARY KEY,
    record_type_id  TEXT NOT NULL,
    data            TEXT NOT NULL,
    created_by      TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

-- Append-only. No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS schema_migrations (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    record_type_id  TEXT NOT NULL,
    change_type     TEXT NOT NULL,   -- ChangeKind, snake_case
    details         TEXT NOT NULL,
    executed_at     TEXT NOT NULL
);

-- Fallback category for types created without one.
INSERT OR IGNORE INTO record_categories
    (id, name, display_name, description, icon, color, order_index, is_system, created_at, updated_at)
VALUES
    ('cat-custom', 'custom', 'Custom', 'Operator-defined record types', 'Folder', '#6B7280', 999, 1,
     strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), strftime('%Y-%m-%dT%H:%M:%SZ', 'now'));

CREATE INDEX IF NOT EXISTS field_definitions_type_idx ON field_definitions(record_type_id);
CREATE INDEX IF NOT EXISTS form_definitions_type_idx  ON form_definitions(record_type_id);
CREATE INDEX IF NOT EXISTS dynamic_records_type_idx   ON dynamic_records(record_type_id);
CREATE INDEX IF NOT EXISTS schema_migrations_type_idx ON schema_migrations(record_type_id);

PRAGMA user_version = 1;
";
