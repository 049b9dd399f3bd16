//! SQLite backend for the Folio catalogue store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each trait method runs as one
//! closure on that thread, inside one transaction when it writes.

mod activities;
mod datasets;
mod encode;
mod organizations;
mod resources;
mod schema;
mod store;
mod users;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
