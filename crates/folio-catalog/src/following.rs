use folio_core::{
  actor::Actor,
  authz::Action,
  search::SearchIndex,
  store::CatalogStore,
  user::User,
  validation::ValidationErrors,
};

use crate::{Catalog, Error, Result, error::store_error, who};

impl<S, I> Catalog<S, I>
where
  S: CatalogStore,
  I: SearchIndex,
{
  pub async fn follow_dataset(&self, actor: &Actor, dataset: &str) -> Result<()> {
    let Some(user_id) = actor.user_id() else {
      return Err(Error::Forbidden("You must be logged in to follow a dataset".into()));
    };
    let dataset = self.require_dataset(dataset).await?;
    self.authorize_read(actor, Action::DatasetRead, &dataset)?;
    let added = self
      .store
      .follow(user_id, dataset.dataset_id)
      .await
      .map_err(store_error)?;
    if !added {
      return Err(Error::Validation(ValidationErrors::single(
        "message",
        format!("You are already following {}", dataset.name),
      )));
    }
    Ok(())
  }

  pub async fn unfollow_dataset(&self, actor: &Actor, dataset: &str) -> Result<()> {
    let Some(user_id) = actor.user_id() else {
      return Err(Error::Forbidden("You must be logged in to unfollow a dataset".into()));
    };
    let dataset = self.require_dataset(dataset).await?;
    self.authorize_read(actor, Action::DatasetRead, &dataset)?;
    let removed = self
      .store
      .unfollow(user_id, dataset.dataset_id)
      .await
      .map_err(store_error)?;
    if !removed {
      return Err(Error::NotFound(format!(
        "You are not following {}.",
        dataset.name
      )));
    }
    Ok(())
  }

  /// Sysadmins only.
  pub async fn followers(&self, actor: &Actor, dataset: &str) -> Result<Vec<User>> {
    if !actor.is_sysadmin() {
      return Err(Error::Forbidden(format!(
        "{} not authorized to see followers",
        who(actor)
      )));
    }
    let dataset = self.require_dataset(dataset).await?;
    self
      .store
      .followers(dataset.dataset_id)
      .await
      .map_err(store_error)
  }
}
