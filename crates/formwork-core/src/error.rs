//! Error types for `formwork-core`.

use thiserror::Error;

/// Domain errors: caller mistakes and catalog violations that every backend
/// reports the same way.
#[derive(Debug, Error)]
pub enum Error {
  #[error("record type not found: {0}")]
  RecordTypeNotFound(String),

  #[error("field not found: {0}")]
  FieldNotFound(String),

  #[error("record not found: {0}")]
  RecordNotFound(String),

  #[error("category not found: {0}")]
  CategoryNotFound(String),

  #[error("form not found: {0}")]
  FormNotFound(String),

  #[error("calendar settings not found for record type {0}")]
  CalendarSettingsNotFound(String),

  #[error("record type {0} is a system type and cannot be {1}")]
  SystemRecordType(String, &'static str),

  #[error("field {0} is a system field and cannot be {1}")]
  SystemField(String, &'static str),

  #[error("invalid field name {0:?}: {1}")]
  InvalidFieldName(String, &'static str),

  #[error("invalid record type name {0:?}")]
  InvalidRecordTypeName(String),

  #[error("{0} already exists")]
  Duplicate(String),

  #[error("constraint violation: {0}")]
  ConstraintViolation(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// `true` for the lookup failures that map to "not found" at the boundary.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::RecordTypeNotFound(_)
        | Self::FieldNotFound(_)
        | Self::RecordNotFound(_)
        | Self::CategoryNotFound(_)
        | Self::FormNotFound(_)
        | Self::CalendarSettingsNotFound(_)
    )
  }

  /// `true` for attempts to mutate system-protected catalog entries.
  pub fn is_protected(&self) -> bool {
    matches!(self, Self::SystemRecordType(..) | Self::SystemField(..))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Implemented by backend error types so transport layers can recover the
/// domain error (if any) without depending on a concrete backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The domain error carried by this error, or `None` for storage faults.
  fn domain(&self) -> Option<&Error>;
}
