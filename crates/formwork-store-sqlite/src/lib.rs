//! SQLite backend for the Formwork record engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. That thread is also what serialises
//! schema synchronisation: two reconciliations of the same type can never
//! interleave their DDL.

mod backend;
mod catalog;
mod ddl;
mod encode;
mod schema;
mod store;
mod sync;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
