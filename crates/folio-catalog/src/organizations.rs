//! Organizations and memberships.

use folio_core::{
  actor::Actor,
  authz::{Action, Target},
  dataset::Dataset,
  organization::{Capacity, Membership, NewOrganization, Organization},
  search::SearchIndex,
  store::{CatalogStore, DatasetFilter},
  visibility,
};
use uuid::Uuid;

use crate::{ActivityStream, Catalog, Error, Result, error::store_error, who};

impl<S, I> Catalog<S, I>
where
  S: CatalogStore,
  I: SearchIndex,
{
  /// The creator becomes the organization's admin.
  pub async fn create_organization(
    &self,
    actor: &Actor,
    input: NewOrganization,
  ) -> Result<Organization> {
    if !self.allowed(actor, Action::OrganizationCreate, Target::None) {
      return Err(Error::Forbidden(format!(
        "{} not authorized to create organizations",
        who(actor)
      )));
    }
    input.validate()?;
    let org = self
      .store
      .create_organization(input, actor.user_id())
      .await
      .map_err(store_error)?;
    tracing::info!(org = %org.org_id, name = %org.name, "created organization");
    Ok(org)
  }

  fn authorize_organization(&self, actor: &Actor, org: &Organization) -> Result<()> {
    if self.allowed(actor, Action::OrganizationUpdate, Target::Organization(org)) {
      Ok(())
    } else {
      Err(Error::Forbidden(format!(
        "{} not authorized to edit organization {}",
        who(actor),
        org.name
      )))
    }
  }

  pub async fn delete_organization(
    &self,
    actor: &Actor,
    id_or_name: &str,
  ) -> Result<Organization> {
    let org = self.require_organization(id_or_name).await?;
    self.authorize_organization(actor, &org)?;
    let org = self
      .store
      .delete_organization(org.org_id)
      .await
      .map_err(store_error)?;
    tracing::info!(org = %org.org_id, "deleted organization");
    Ok(org)
  }

  /// Replaces any capacity the user already held.
  pub async fn set_membership(
    &self,
    actor: &Actor,
    id_or_name: &str,
    user_id: Uuid,
    capacity: Capacity,
  ) -> Result<Membership> {
    let org = self.require_organization(id_or_name).await?;
    self.authorize_organization(actor, &org)?;
    let membership = Membership { user_id, org_id: org.org_id, capacity };
    self
      .store
      .set_membership(membership)
      .await
      .map_err(store_error)?;
    Ok(membership)
  }

  pub async fn remove_membership(
    &self,
    actor: &Actor,
    id_or_name: &str,
    user_id: Uuid,
  ) -> Result<()> {
    let org = self.require_organization(id_or_name).await?;
    self.authorize_organization(actor, &org)?;
    let removed = self
      .store
      .remove_membership(user_id, org.org_id)
      .await
      .map_err(store_error)?;
    if !removed {
      return Err(Error::NotFound(format!(
        "User {user_id} is not a member of {}",
        org.name
      )));
    }
    Ok(())
  }

  /// Organizations `actor` may add datasets to.
  pub async fn editable_organizations(&self, actor: &Actor) -> Result<Vec<Organization>> {
    let orgs = self.store.list_organizations().await.map_err(store_error)?;
    if actor.is_sysadmin() {
      return Ok(orgs);
    }
    Ok(
      orgs
        .into_iter()
        .filter(|o| actor.capacity_in(o.org_id).is_some_and(Capacity::can_edit))
        .collect(),
    )
  }

  /// The organization's datasets that `actor` may see listed.
  pub async fn organization_datasets(
    &self,
    actor: &Actor,
    id_or_name: &str,
  ) -> Result<Vec<Dataset>> {
    let org = self.require_organization(id_or_name).await?;
    let filter = DatasetFilter { owner_org: Some(org.org_id), ..DatasetFilter::default() };
    let datasets = self.store.list_datasets(filter).await.map_err(store_error)?;
    Ok(
      datasets
        .into_iter()
        .filter(|d| visibility::can_list(&self.policy, actor, d))
        .collect(),
    )
  }

  /// Activities of the organization's datasets that `actor` may read.
  pub async fn organization_activity(
    &self,
    actor: &Actor,
    id_or_name: &str,
    limit: usize,
    offset: usize,
  ) -> Result<ActivityStream> {
    let org = self.require_organization(id_or_name).await?;
    let activities = self
      .store
      .list_organization_activities(org.org_id, limit, offset)
      .await
      .map_err(store_error)?;
    let activities = self.readable_activities(actor, activities).await?;
    let can_view_versions = actor.is_sysadmin()
      || actor.capacity_in(org.org_id).is_some_and(Capacity::can_edit);
    Ok(ActivityStream { activities, can_view_versions })
  }
}
