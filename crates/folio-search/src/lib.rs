//! SQLite FTS5 backend for the Folio search index.
//!
//! The index lives in its own database so it can be dropped and rebuilt
//! from the catalogue store at any time.

mod index;
mod query;
mod schema;

pub mod error;

pub use error::ParseError;
pub use index::SqliteIndex;
pub use query::{ParsedQuery, parse};

#[cfg(test)]
mod tests;
