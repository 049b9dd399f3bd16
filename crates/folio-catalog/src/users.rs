//! Users and actor loading.

use std::collections::HashMap;

use folio_core::{
  actor::Actor,
  search::SearchIndex,
  store::{CatalogStore, StoreError as _, StoreFailure},
  user::{NewUser, User},
  validation::ValidationErrors,
};
use uuid::Uuid;

use crate::{Catalog, Error, Result, error::store_error, who};

impl<S, I> Catalog<S, I>
where
  S: CatalogStore,
  I: SearchIndex,
{
  /// Only sysadmins may create further sysadmins.
  pub async fn register_user(&self, actor: &Actor, input: NewUser) -> Result<User> {
    if input.sysadmin && !actor.is_sysadmin() {
      return Err(Error::Forbidden(format!(
        "{} not authorized to create sysadmins",
        who(actor)
      )));
    }
    input.validate()?;

    let user = self.store.create_user(input).await.map_err(|e| {
      match e.failure() {
        StoreFailure::NameTaken => Error::Validation(ValidationErrors::single(
          "name",
          "That login name is not available.",
        )),
        _ => store_error(e),
      }
    })?;
    tracing::info!(user = %user.user_id, name = %user.name, "registered user");
    Ok(user)
  }

  /// Build the actor for a user with their memberships loaded once.
  pub async fn actor_for(&self, user: User) -> Result<Actor> {
    let memberships = self
      .store
      .memberships_for_user(user.user_id)
      .await
      .map_err(store_error)?
      .into_iter()
      .map(|m| (m.org_id, m.capacity))
      .collect::<HashMap<_, _>>();
    Ok(Actor::user(user, memberships))
  }

  pub async fn load_actor(&self, user_id: Uuid) -> Result<Actor> {
    let user = self
      .store
      .get_user(user_id)
      .await
      .map_err(store_error)?
      .ok_or_else(|| Error::NotFound(format!("User {user_id} not found")))?;
    self.actor_for(user).await
  }

  /// A user and their stored password hash, for authentication.
  pub async fn credentials(&self, name: &str) -> Result<Option<(User, Option<String>)>> {
    let Some(user) = self
      .store
      .get_user_by_name(name)
      .await
      .map_err(store_error)?
    else {
      return Ok(None);
    };
    let hash = self
      .store
      .password_hash(user.user_id)
      .await
      .map_err(store_error)?;
    Ok(Some((user, hash)))
  }
}
