//! JSON HTTP API for Folio.
//!
//! Exposes an axum [`Router`] over a [`Catalog`]. Every handler resolves
//! the [`auth::CurrentActor`] first and hands it to the catalogue, which
//! makes all authorization decisions. This layer only translates requests
//! and maps [`folio_catalog::Error`] onto status codes.

pub mod activity;
pub mod auth;
pub mod config;
pub mod datasets;
pub mod error;
pub mod organizations;
pub mod resources;
pub mod search;
pub mod users;

pub use config::{ServerConfig, SqliteCatalog};
pub use error::ApiError;

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use folio_catalog::Catalog;
use folio_core::{search::SearchIndex, store::CatalogStore};
use tower_http::trace::TraceLayer;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, I> {
  pub catalog: Catalog<S, I>,
}

impl<S, I> Clone for AppState<S, I> {
  fn clone(&self) -> Self { Self { catalog: self.catalog.clone() } }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API [`Router`].
pub fn router<S, I>(state: AppState<S, I>) -> Router
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  Router::new()
    // Users
    .route("/users", post(users::register::<S, I>))
    .route("/users/me", get(users::me))
    .route("/users/me/organizations", get(organizations::editable::<S, I>))
    // Organizations
    .route("/organizations", post(organizations::create::<S, I>))
    .route("/organizations/{org}", delete(organizations::delete::<S, I>))
    .route("/organizations/{org}/datasets", get(organizations::datasets::<S, I>))
    .route("/organizations/{org}/activity", get(organizations::activity::<S, I>))
    .route(
      "/organizations/{org}/members/{user_id}",
      put(organizations::set_member::<S, I>).delete(organizations::remove_member::<S, I>),
    )
    // Datasets
    .route("/datasets", post(datasets::create::<S, I>))
    .route("/datasets/new", get(datasets::new_form::<S, I>))
    .route(
      "/datasets/{id}",
      get(datasets::get_one::<S, I>)
        .patch(datasets::update::<S, I>)
        .delete(datasets::delete::<S, I>),
    )
    .route("/datasets/{id}/activate", post(datasets::activate::<S, I>))
    .route(
      "/datasets/{id}/follow",
      put(datasets::follow::<S, I>).delete(datasets::unfollow::<S, I>),
    )
    .route("/datasets/{id}/followers", get(datasets::followers::<S, I>))
    // Resources and views
    .route(
      "/datasets/{id}/resources",
      get(resources::list::<S, I>).post(resources::create::<S, I>),
    )
    .route(
      "/resources/{resource_id}",
      get(resources::get_one::<S, I>)
        .patch(resources::update::<S, I>)
        .delete(resources::delete::<S, I>),
    )
    .route(
      "/resources/{resource_id}/views",
      get(resources::list_views::<S, I>).post(resources::create_view::<S, I>),
    )
    .route(
      "/views/{view_id}",
      get(resources::get_view::<S, I>)
        .patch(resources::update_view::<S, I>)
        .delete(resources::delete_view::<S, I>),
    )
    // Activity
    .route(
      "/datasets/{id}/activity",
      get(activity::stream::<S, I>).post(activity::record_custom::<S, I>),
    )
    .route("/datasets/{id}/activity/{activity_id}", get(activity::snapshot::<S, I>))
    .route("/datasets/{id}/diff", get(activity::diff::<S, I>))
    .route("/activity/{activity_id}/changes", get(activity::changes::<S, I>))
    // Search
    .route("/search", get(search::handler::<S, I>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
