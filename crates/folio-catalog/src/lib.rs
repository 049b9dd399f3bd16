//! Catalogue operations for Folio.
//!
//! [`Catalog`] is the workflow layer: every operation takes the acting
//! [`Actor`], asks the authorization evaluator, performs the store mutation
//! (which appends its activity in the same transaction) and then brings the
//! search index up to date. Index synchronisation is best effort; a failure
//! is logged and the committed mutation stands.
//!
//! Denials are reported so as not to leak existence: an actor who cannot
//! read a dataset gets [`Error::NotFound`] for it, whatever they asked to do.

mod activity;
mod datasets;
mod following;
mod maintenance;
mod organizations;
mod resources;
mod search;
mod users;

pub mod error;

use std::sync::Arc;

use folio_core::{
  actor::Actor,
  authz::{self, Action, AuthPolicy, Target},
  dataset::Dataset,
  organization::Organization,
  plugin::PluginRegistry,
  search::{SearchConfig, SearchIndex},
  store::CatalogStore,
};

pub use activity::{ActivityChanges, ActivityStream};
pub use datasets::{DatasetForm, DatasetRead};
pub use error::{Error, Result};
pub use maintenance::{RebuildOptions, RebuildReport};

use crate::error::store_error;

/// The catalogue service, generic over its store and index backends.
pub struct Catalog<S, I> {
  store:   Arc<S>,
  index:   Arc<I>,
  policy:  AuthPolicy,
  search:  SearchConfig,
  plugins: PluginRegistry,
}

impl<S, I> Clone for Catalog<S, I> {
  fn clone(&self) -> Self {
    Self {
      store:   Arc::clone(&self.store),
      index:   Arc::clone(&self.index),
      policy:  self.policy,
      search:  self.search,
      plugins: self.plugins.clone(),
    }
  }
}

impl<S, I> Catalog<S, I>
where
  S: CatalogStore,
  I: SearchIndex,
{
  pub fn new(store: Arc<S>, index: Arc<I>) -> Self {
    Self {
      store,
      index,
      policy: AuthPolicy::default(),
      search: SearchConfig::default(),
      plugins: PluginRegistry::new(),
    }
  }

  pub fn with_policy(mut self, policy: AuthPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_search_config(mut self, config: SearchConfig) -> Self {
    self.search = config;
    self
  }

  pub fn with_plugins(mut self, plugins: PluginRegistry) -> Self {
    self.plugins = plugins;
    self
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn index(&self) -> &I { &self.index }

  pub fn policy(&self) -> &AuthPolicy { &self.policy }

  pub fn search_config(&self) -> &SearchConfig { &self.search }

  // ─── Lookups ─────────────────────────────────────────────────────────────

  pub(crate) async fn require_dataset(&self, id_or_name: &str) -> Result<Dataset> {
    self
      .store
      .find_dataset(id_or_name)
      .await
      .map_err(store_error)?
      .ok_or_else(|| Error::NotFound(format!("Dataset {id_or_name:?} not found")))
  }

  pub(crate) async fn require_organization(
    &self,
    id_or_name: &str,
  ) -> Result<Organization> {
    self
      .store
      .get_organization(id_or_name)
      .await
      .map_err(store_error)?
      .ok_or_else(|| {
        Error::NotFound(format!("Organization {id_or_name:?} not found"))
      })
  }

  // ─── Authorization ───────────────────────────────────────────────────────

  pub(crate) fn allowed(&self, actor: &Actor, action: Action, target: Target<'_>) -> bool {
    authz::evaluate(&self.policy, actor, action, target).is_allowed()
  }

  /// Reads that are denied look exactly like missing datasets.
  pub(crate) fn authorize_read(
    &self,
    actor: &Actor,
    action: Action,
    dataset: &Dataset,
  ) -> Result<()> {
    if self.allowed(actor, action, Target::Dataset(dataset)) {
      Ok(())
    } else {
      Err(Error::NotFound(format!("Dataset {:?} not found", dataset.name)))
    }
  }

  /// A denied mutation is `Forbidden` only when the actor could see the
  /// dataset in the first place.
  pub(crate) fn authorize_write(
    &self,
    actor: &Actor,
    action: Action,
    dataset: &Dataset,
  ) -> Result<()> {
    if self.allowed(actor, action, Target::Dataset(dataset)) {
      return Ok(());
    }
    self.authorize_read(actor, Action::DatasetRead, dataset)?;
    tracing::debug!(
      actor = actor.name().unwrap_or("anonymous"),
      %action,
      dataset = %dataset.dataset_id,
      "authorization denied"
    );
    Err(Error::Forbidden(format!(
      "{} not authorized to {} dataset {}",
      who(actor),
      verb(action),
      dataset.name
    )))
  }
}

pub(crate) fn who(actor: &Actor) -> String {
  match actor.name() {
    Some(name) => format!("User {name}"),
    None => "Anonymous user".to_owned(),
  }
}

fn verb(action: Action) -> &'static str {
  match action {
    Action::DatasetDelete => "delete",
    Action::DatasetRead | Action::ResourceRead => "read",
    Action::ResourceCreate | Action::ResourceUpdate | Action::ResourceDelete => {
      "edit resources of"
    }
    _ => "edit",
  }
}
