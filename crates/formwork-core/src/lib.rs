//! Core types and trait definitions for the Formwork dynamic record engine.
//!
//! Operators define record types and fields at runtime; this crate holds the
//! logical model, the pure naming rules that map it onto physical tables, the
//! desired-versus-actual schema diff, and the calendar projection that sits on
//! top of record access.
//!
//! This crate is deliberately free of HTTP and database dependencies.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod calendar;
pub mod error;
pub mod field;
pub mod fixtures;
pub mod form;
pub mod naming;
pub mod record_type;
pub mod schema;
pub mod store;
pub mod value;

pub use error::{Error, Result, StoreError};
