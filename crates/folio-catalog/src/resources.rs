//! Resources and resource views, authorized through the parent dataset.

use folio_core::{
  actor::Actor,
  authz::Action,
  dataset::{
    Dataset, NewResource, NewResourceView, Resource, ResourcePatch,
    ResourceView, ResourceViewPatch,
  },
  search::SearchIndex,
  store::CatalogStore,
};
use uuid::Uuid;

use crate::{Catalog, Error, Result, error::store_error};

impl<S, I> Catalog<S, I>
where
  S: CatalogStore,
  I: SearchIndex,
{
  async fn resource_and_dataset(&self, resource_id: Uuid) -> Result<(Resource, Dataset)> {
    let not_found = || Error::NotFound(format!("Resource {resource_id} not found"));
    let resource = self
      .store
      .get_resource(resource_id)
      .await
      .map_err(store_error)?
      .ok_or_else(not_found)?;
    let dataset = self
      .store
      .get_dataset(resource.dataset_id)
      .await
      .map_err(store_error)?
      .ok_or_else(not_found)?;
    Ok((resource, dataset))
  }

  async fn view_and_dataset(&self, view_id: Uuid) -> Result<(ResourceView, Dataset)> {
    let view = self
      .store
      .get_view(view_id)
      .await
      .map_err(store_error)?
      .ok_or_else(|| Error::NotFound(format!("View {view_id} not found")))?;
    let (_, dataset) = self.resource_and_dataset(view.resource_id).await?;
    Ok((view, dataset))
  }

  /// Re-dictize after a resource change and bring the index up to date.
  async fn resync(&self, dataset_id: Uuid) {
    match self.dictize(dataset_id).await {
      Ok(dict) => self.sync_index(&dict).await,
      Err(e) => {
        tracing::warn!(dataset = %dataset_id, error = %e, "could not reload dataset for indexing");
      }
    }
  }

  // ─── Resources ───────────────────────────────────────────────────────────

  pub async fn create_resource(
    &self,
    actor: &Actor,
    dataset: &str,
    input: NewResource,
  ) -> Result<Resource> {
    let dataset = self.require_dataset(dataset).await?;
    self.authorize_write(actor, Action::ResourceCreate, &dataset)?;
    input.validate()?;
    let resource = self
      .store
      .create_resource(dataset.dataset_id, input, actor.activity_ref())
      .await
      .map_err(store_error)?;
    tracing::info!(
      dataset = %dataset.dataset_id,
      resource = %resource.resource_id,
      "created resource"
    );
    self.resync(dataset.dataset_id).await;
    Ok(resource)
  }

  pub async fn read_resource(&self, actor: &Actor, resource_id: Uuid) -> Result<Resource> {
    let (resource, dataset) = self.resource_and_dataset(resource_id).await?;
    self.authorize_read(actor, Action::ResourceRead, &dataset)?;
    Ok(resource)
  }

  pub async fn update_resource(
    &self,
    actor: &Actor,
    resource_id: Uuid,
    patch: ResourcePatch,
  ) -> Result<Resource> {
    let (_, dataset) = self.resource_and_dataset(resource_id).await?;
    self.authorize_write(actor, Action::ResourceUpdate, &dataset)?;
    patch.validate()?;
    let resource = self
      .store
      .update_resource(resource_id, patch, actor.activity_ref())
      .await
      .map_err(store_error)?;
    self.resync(dataset.dataset_id).await;
    Ok(resource)
  }

  /// The dataset survives losing its last resource.
  pub async fn delete_resource(&self, actor: &Actor, resource_id: Uuid) -> Result<()> {
    let (_, dataset) = self.resource_and_dataset(resource_id).await?;
    self.authorize_write(actor, Action::ResourceDelete, &dataset)?;
    self
      .store
      .delete_resource(resource_id, actor.activity_ref())
      .await
      .map_err(store_error)?;
    tracing::info!(dataset = %dataset.dataset_id, resource = %resource_id, "deleted resource");
    self.resync(dataset.dataset_id).await;
    Ok(())
  }

  pub async fn list_resources(&self, actor: &Actor, dataset: &str) -> Result<Vec<Resource>> {
    let dataset = self.require_dataset(dataset).await?;
    self.authorize_read(actor, Action::ResourceRead, &dataset)?;
    self
      .store
      .list_resources(dataset.dataset_id)
      .await
      .map_err(store_error)
  }

  // ─── Views ───────────────────────────────────────────────────────────────

  pub async fn create_view(
    &self,
    actor: &Actor,
    resource_id: Uuid,
    input: NewResourceView,
  ) -> Result<ResourceView> {
    let (_, dataset) = self.resource_and_dataset(resource_id).await?;
    self.authorize_write(actor, Action::ResourceUpdate, &dataset)?;
    input.validate()?;
    self
      .store
      .create_view(resource_id, input)
      .await
      .map_err(store_error)
  }

  pub async fn read_view(&self, actor: &Actor, view_id: Uuid) -> Result<ResourceView> {
    let (view, dataset) = self.view_and_dataset(view_id).await?;
    self.authorize_read(actor, Action::ResourceRead, &dataset)?;
    Ok(view)
  }

  pub async fn update_view(
    &self,
    actor: &Actor,
    view_id: Uuid,
    patch: ResourceViewPatch,
  ) -> Result<ResourceView> {
    let (_, dataset) = self.view_and_dataset(view_id).await?;
    self.authorize_write(actor, Action::ResourceUpdate, &dataset)?;
    patch.validate()?;
    self
      .store
      .update_view(view_id, patch)
      .await
      .map_err(store_error)
  }

  pub async fn delete_view(&self, actor: &Actor, view_id: Uuid) -> Result<()> {
    let (_, dataset) = self.view_and_dataset(view_id).await?;
    self.authorize_write(actor, Action::ResourceUpdate, &dataset)?;
    self.store.delete_view(view_id).await.map_err(store_error)
  }

  pub async fn list_views(&self, actor: &Actor, resource_id: Uuid) -> Result<Vec<ResourceView>> {
    let (_, dataset) = self.resource_and_dataset(resource_id).await?;
    self.authorize_read(actor, Action::ResourceRead, &dataset)?;
    self.store.list_views(resource_id).await.map_err(store_error)
  }
}
