//! Core types, rules and trait definitions for the Folio data catalogue.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! authorization and visibility rules live here as pure functions so every
//! other layer (store, index, catalogue, HTTP) applies the same decisions.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod activity;
pub mod actor;
pub mod authz;
pub mod dataset;
pub mod error;
pub mod organization;
pub mod plugin;
pub mod search;
pub mod store;
pub mod user;
pub mod validation;
pub mod visibility;

pub use error::{Error, Result};
