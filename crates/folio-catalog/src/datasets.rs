//! Dataset lifecycle: create (as a draft), update, activate, delete, read.

use folio_core::{
  actor::Actor,
  authz::{Action, Target},
  dataset::{DatasetDict, DatasetPatch, DatasetState, NewDataset},
  organization::{OrganizationState, OrganizationSummary},
  search::SearchIndex,
  store::CatalogStore,
  validation::{MISSING_VALUE, ValidationErrors},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{Catalog, Error, Result, error::store_error, who};

pub const NEEDS_RESOURCE: &str = "You must add at least one data resource";

/// What the "new dataset" page should offer the actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum DatasetForm {
  /// The form may be shown. When `owner_required` is set the actor must
  /// pick one of `organizations`.
  Form {
    organizations:  Vec<OrganizationSummary>,
    owner_required: bool,
  },
  /// The actor belongs to no organization but may create one.
  CreateOrganizationFirst,
  AskSysadmin,
}

/// A dataset as read by an actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetRead {
  pub dataset:     DatasetDict,
  /// The canonical name, when the lookup used anything else (an id).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub redirect_to: Option<String>,
}

impl<S, I> Catalog<S, I>
where
  S: CatalogStore,
  I: SearchIndex,
{
  pub async fn new_dataset_form(
    &self,
    actor: &Actor,
    owner_org: Option<Uuid>,
  ) -> Result<DatasetForm> {
    if !actor.is_authenticated() {
      return Err(Error::Forbidden(format!(
        "{} not authorized to create datasets",
        who(actor)
      )));
    }
    let target = Target::NewDataset { owner_org };
    let allowed = self.allowed(actor, Action::DatasetCreate, target);
    let organizations: Vec<_> = self
      .editable_organizations(actor)
      .await?
      .iter()
      .map(|o| o.summary())
      .collect();

    if !allowed {
      return match owner_org {
        Some(_) => Err(Error::Forbidden(format!(
          "{} not authorized to add datasets to this organization",
          who(actor)
        ))),
        None => Ok(DatasetForm::AskSysadmin),
      };
    }
    let owner_required =
      !self.policy.create_unowned_dataset && !actor.is_sysadmin();
    if owner_required && organizations.is_empty() {
      return Ok(DatasetForm::CreateOrganizationFirst);
    }
    Ok(DatasetForm::Form { organizations, owner_required })
  }

  /// The owner must be a live organization.
  async fn check_owner(&self, org_id: Uuid) -> Result<()> {
    let org = self
      .store
      .get_organization(&org_id.to_string())
      .await
      .map_err(store_error)?;
    match org {
      Some(o) if o.state == OrganizationState::Active => Ok(()),
      _ => Err(Error::Validation(ValidationErrors::single(
        "owner_org",
        "Organization does not exist",
      ))),
    }
  }

  /// New datasets start as drafts unless the input says otherwise.
  pub async fn create_dataset(
    &self,
    actor: &Actor,
    input: NewDataset,
  ) -> Result<DatasetDict> {
    let target = Target::NewDataset { owner_org: input.owner_org };
    if !self.allowed(actor, Action::DatasetCreate, target) {
      return Err(Error::Forbidden(format!(
        "{} not authorized to create datasets",
        who(actor)
      )));
    }

    let mut errors = input.validate().err().unwrap_or_default();
    if input.owner_org.is_none()
      && !self.policy.create_unowned_dataset
      && !actor.is_sysadmin()
    {
      errors.add("owner_org", MISSING_VALUE);
    }
    errors.into_result()?;
    if let Some(org_id) = input.owner_org {
      self.check_owner(org_id).await?;
    }

    let dict = self
      .store
      .create_dataset(input, actor.activity_ref())
      .await
      .map_err(store_error)?;
    tracing::info!(
      dataset = %dict.dataset.dataset_id,
      name = %dict.dataset.name,
      state = %dict.dataset.state,
      "created dataset"
    );
    self.sync_index(&dict).await;
    Ok(dict)
  }

  pub async fn read_dataset(&self, actor: &Actor, id_or_name: &str) -> Result<DatasetRead> {
    let dataset = self.require_dataset(id_or_name).await?;
    self.authorize_read(actor, Action::DatasetRead, &dataset)?;
    let dict = self.dictize(dataset.dataset_id).await?;
    let redirect_to = (id_or_name != dict.dataset.name).then(|| dict.dataset.name.clone());
    Ok(DatasetRead { dataset: dict, redirect_to })
  }

  pub(crate) async fn dictize(&self, dataset_id: Uuid) -> Result<DatasetDict> {
    self
      .store
      .dictize_dataset(dataset_id)
      .await
      .map_err(store_error)?
      .ok_or_else(|| Error::NotFound(format!("Dataset {dataset_id} not found")))
  }

  pub async fn update_dataset(
    &self,
    actor: &Actor,
    id_or_name: &str,
    patch: DatasetPatch,
  ) -> Result<DatasetDict> {
    let dataset = self.require_dataset(id_or_name).await?;
    self.authorize_write(actor, Action::DatasetUpdate, &dataset)?;
    patch.validate()?;
    if patch.is_empty() {
      return self.dictize(dataset.dataset_id).await;
    }

    let owner_org = patch.owner_org.unwrap_or(dataset.owner_org);
    if owner_org != dataset.owner_org {
      match owner_org {
        Some(org_id) => {
          let target = Target::NewDataset { owner_org: Some(org_id) };
          if !self.allowed(actor, Action::DatasetCreate, target) {
            return Err(Error::Forbidden(format!(
              "{} not authorized to move datasets to that organization",
              who(actor)
            )));
          }
          self.check_owner(org_id).await?;
        }
        None if !self.policy.create_unowned_dataset && !actor.is_sysadmin() => {
          return Err(Error::Validation(ValidationErrors::single(
            "owner_org",
            MISSING_VALUE,
          )));
        }
        None => {}
      }
    }
    if patch.private.unwrap_or(dataset.private) && owner_org.is_none() {
      return Err(Error::Validation(ValidationErrors::single(
        "private",
        "Private datasets must belong to an organization",
      )));
    }

    let dict = self
      .store
      .update_dataset(dataset.dataset_id, patch, actor.activity_ref())
      .await
      .map_err(store_error)?;
    tracing::info!(dataset = %dataset.dataset_id, "updated dataset");
    self.sync_index(&dict).await;
    Ok(dict)
  }

  /// Move a draft (or, for sysadmins, a deleted dataset) to active.
  pub async fn activate_dataset(
    &self,
    actor: &Actor,
    id_or_name: &str,
  ) -> Result<DatasetDict> {
    let dataset = self.require_dataset(id_or_name).await?;
    self.authorize_write(actor, Action::DatasetUpdate, &dataset)?;
    let resources = self
      .store
      .list_resources(dataset.dataset_id)
      .await
      .map_err(store_error)?;
    if resources.is_empty() {
      return Err(Error::Validation(ValidationErrors::single(
        "resources",
        NEEDS_RESOURCE,
      )));
    }

    let dict = self
      .store
      .set_dataset_state(dataset.dataset_id, DatasetState::Active, actor.activity_ref())
      .await
      .map_err(store_error)?;
    tracing::info!(dataset = %dataset.dataset_id, "activated dataset");
    self.sync_index(&dict).await;
    Ok(dict)
  }

  pub async fn delete_dataset(&self, actor: &Actor, id_or_name: &str) -> Result<()> {
    let dataset = self.require_dataset(id_or_name).await?;
    self.authorize_write(actor, Action::DatasetDelete, &dataset)?;
    let dict = self
      .store
      .set_dataset_state(dataset.dataset_id, DatasetState::Deleted, actor.activity_ref())
      .await
      .map_err(store_error)?;
    tracing::info!(dataset = %dataset.dataset_id, "deleted dataset");
    self.sync_index(&dict).await;
    Ok(())
  }
}
