//! Error type for `formwork-store-sqlite`.

use formwork_core::StoreError;
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] formwork_core::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown field kind {0:?}")]
  UnknownFieldKind(String),

  #[error("unrecognised stored value: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl StoreError for Error {
  fn domain(&self) -> Option<&formwork_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }
}

impl From<rusqlite::Error> for Error {
  fn from(err: rusqlite::Error) -> Self {
    if let rusqlite::Error::SqliteFailure(e, msg) = &err {
      if e.code != ErrorCode::ConstraintViolation {
        return Self::Database(tokio_rusqlite::Error::Rusqlite(err));
      }
      let msg = msg.clone().unwrap_or_else(|| err.to_string());
      let unique = matches!(
        e.extended_code,
        rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
      );
      return if unique {
        Self::Core(formwork_core::Error::Duplicate(msg))
      } else {
        Self::Core(formwork_core::Error::ConstraintViolation(msg))
      };
    }
    Self::Database(tokio_rusqlite::Error::Rusqlite(err))
  }
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(err: tokio_rusqlite::Error) -> Self {
    match err {
      tokio_rusqlite::Error::Rusqlite(e) => e.into(),
      // Errors raised inside a `Connection::call` closure travel boxed.
      tokio_rusqlite::Error::Other(inner) => match inner.downcast::<Error>() {
        Ok(e) => *e,
        Err(inner) => Self::Database(tokio_rusqlite::Error::Other(inner)),
      },
      other => Self::Database(other),
    }
  }
}

/// Box an error so it can leave a `Connection::call` closure and be
/// recovered intact by the `From<tokio_rusqlite::Error>` impl.
pub(crate) fn boxed(err: impl Into<Error>) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(err.into()))
}
