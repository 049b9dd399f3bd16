//! [`SqliteStore`], the SQLite implementation of [`CatalogStore`].

use std::path::Path;

use folio_core::{
  activity::{Activity, ActorRef, NewActivity},
  dataset::{
    Dataset, DatasetDict, DatasetPatch, DatasetState, NewDataset, NewResource,
    NewResourceView, Resource, ResourcePatch, ResourceView, ResourceViewPatch,
  },
  organization::{Membership, NewOrganization, Organization},
  store::{CatalogStore, DatasetFilter},
  user::{NewUser, User},
};
use rusqlite::Connection;
use uuid::Uuid;

use crate::{
  Error, Result, activities, datasets, organizations, resources,
  schema::SCHEMA, users,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Folio catalogue store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Run `f` inside a transaction that commits only if `f` succeeds.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        match f(&tx) {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          // Dropping the transaction rolls it back.
          Err(e) => Ok(Err(e)),
        }
      })
      .await?
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    self.write(move |c| users::insert(c, input)).await
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
    self.read(move |c| users::get(c, user_id)).await
  }

  async fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
    let name = name.to_owned();
    self.read(move |c| users::get_by_name(c, &name)).await
  }

  async fn password_hash(&self, user_id: Uuid) -> Result<Option<String>> {
    self.read(move |c| users::password_hash(c, user_id)).await
  }

  async fn list_users(&self) -> Result<Vec<User>> { self.read(users::list).await }

  // ── Organizations ─────────────────────────────────────────────────────────

  async fn create_organization(
    &self,
    input: NewOrganization,
    creator: Option<Uuid>,
  ) -> Result<Organization> {
    self
      .write(move |c| organizations::insert(c, input, creator))
      .await
  }

  async fn get_organization(
    &self,
    id_or_name: &str,
  ) -> Result<Option<Organization>> {
    let key = id_or_name.to_owned();
    self.read(move |c| organizations::find(c, &key)).await
  }

  async fn list_organizations(&self) -> Result<Vec<Organization>> {
    self.read(organizations::list).await
  }

  async fn delete_organization(&self, org_id: Uuid) -> Result<Organization> {
    self
      .write(move |c| organizations::soft_delete(c, org_id))
      .await
  }

  async fn set_membership(&self, membership: Membership) -> Result<()> {
    self
      .write(move |c| organizations::upsert_membership(c, membership))
      .await
  }

  async fn remove_membership(&self, user_id: Uuid, org_id: Uuid) -> Result<bool> {
    self
      .write(move |c| organizations::delete_membership(c, user_id, org_id))
      .await
  }

  async fn memberships_for_user(&self, user_id: Uuid) -> Result<Vec<Membership>> {
    self
      .read(move |c| organizations::memberships_for_user(c, user_id))
      .await
  }

  async fn members_of(&self, org_id: Uuid) -> Result<Vec<Membership>> {
    self.read(move |c| organizations::members_of(c, org_id)).await
  }

  // ── Datasets ──────────────────────────────────────────────────────────────

  async fn create_dataset(
    &self,
    input: NewDataset,
    actor: ActorRef,
  ) -> Result<DatasetDict> {
    let dict = self.write(move |c| datasets::insert(c, input, actor)).await?;
    tracing::info!(dataset = %dict.dataset.name, id = %dict.dataset.dataset_id, "dataset created");
    Ok(dict)
  }

  async fn get_dataset(&self, dataset_id: Uuid) -> Result<Option<Dataset>> {
    self.read(move |c| datasets::get(c, dataset_id)).await
  }

  async fn find_dataset(&self, id_or_name: &str) -> Result<Option<Dataset>> {
    let key = id_or_name.to_owned();
    self.read(move |c| datasets::find(c, &key)).await
  }

  async fn dictize_dataset(&self, dataset_id: Uuid) -> Result<Option<DatasetDict>> {
    self.read(move |c| datasets::dictize(c, dataset_id)).await
  }

  async fn update_dataset(
    &self,
    dataset_id: Uuid,
    patch: DatasetPatch,
    actor: ActorRef,
  ) -> Result<DatasetDict> {
    self
      .write(move |c| datasets::update(c, dataset_id, patch, actor))
      .await
  }

  async fn set_dataset_state(
    &self,
    dataset_id: Uuid,
    state: DatasetState,
    actor: ActorRef,
  ) -> Result<DatasetDict> {
    let dict = self
      .write(move |c| datasets::set_state(c, dataset_id, state, actor))
      .await?;
    tracing::info!(id = %dataset_id, %state, "dataset state changed");
    Ok(dict)
  }

  async fn list_datasets(&self, filter: DatasetFilter) -> Result<Vec<Dataset>> {
    self.read(move |c| datasets::list(c, &filter)).await
  }

  // ── Resources ─────────────────────────────────────────────────────────────

  async fn create_resource(
    &self,
    dataset_id: Uuid,
    input: NewResource,
    actor: ActorRef,
  ) -> Result<Resource> {
    self
      .write(move |c| resources::insert(c, dataset_id, input, actor))
      .await
  }

  async fn get_resource(&self, resource_id: Uuid) -> Result<Option<Resource>> {
    self.read(move |c| resources::get(c, resource_id)).await
  }

  async fn update_resource(
    &self,
    resource_id: Uuid,
    patch: ResourcePatch,
    actor: ActorRef,
  ) -> Result<Resource> {
    self
      .write(move |c| resources::update(c, resource_id, patch, actor))
      .await
  }

  async fn delete_resource(&self, resource_id: Uuid, actor: ActorRef) -> Result<()> {
    self
      .write(move |c| resources::delete(c, resource_id, actor))
      .await
  }

  async fn list_resources(&self, dataset_id: Uuid) -> Result<Vec<Resource>> {
    self.read(move |c| resources::list(c, dataset_id)).await
  }

  // ── Resource views ────────────────────────────────────────────────────────

  async fn create_view(
    &self,
    resource_id: Uuid,
    input: NewResourceView,
  ) -> Result<ResourceView> {
    self
      .write(move |c| resources::insert_view(c, resource_id, input))
      .await
  }

  async fn get_view(&self, view_id: Uuid) -> Result<Option<ResourceView>> {
    self.read(move |c| resources::get_view(c, view_id)).await
  }

  async fn update_view(
    &self,
    view_id: Uuid,
    patch: ResourceViewPatch,
  ) -> Result<ResourceView> {
    self
      .write(move |c| resources::update_view(c, view_id, patch))
      .await
  }

  async fn delete_view(&self, view_id: Uuid) -> Result<()> {
    self.write(move |c| resources::delete_view(c, view_id)).await
  }

  async fn list_views(&self, resource_id: Uuid) -> Result<Vec<ResourceView>> {
    self.read(move |c| resources::list_views(c, resource_id)).await
  }

  // ── Activities ────────────────────────────────────────────────────────────

  async fn record_activity(&self, input: NewActivity) -> Result<Activity> {
    self.write(move |c| activities::insert(c, input)).await
  }

  async fn get_activity(&self, activity_id: Uuid) -> Result<Option<Activity>> {
    self.read(move |c| activities::get(c, activity_id)).await
  }

  async fn list_activities(
    &self,
    object_id: Uuid,
    limit: usize,
    offset: usize,
  ) -> Result<Vec<Activity>> {
    self
      .read(move |c| activities::list_for_object(c, object_id, limit, offset))
      .await
  }

  async fn list_organization_activities(
    &self,
    org_id: Uuid,
    limit: usize,
    offset: usize,
  ) -> Result<Vec<Activity>> {
    self
      .read(move |c| activities::list_for_organization(c, org_id, limit, offset))
      .await
  }

  async fn previous_activity(&self, activity_id: Uuid) -> Result<Option<Activity>> {
    self.read(move |c| activities::previous(c, activity_id)).await
  }

  async fn delete_activity(&self, activity_id: Uuid) -> Result<bool> {
    let removed = self
      .write(move |c| activities::delete(c, activity_id))
      .await?;
    if removed {
      tracing::info!(id = %activity_id, "activity deleted");
    }
    Ok(removed)
  }

  // ── Followers ─────────────────────────────────────────────────────────────

  async fn follow(&self, user_id: Uuid, dataset_id: Uuid) -> Result<bool> {
    self
      .write(move |c| users::follow(c, user_id, dataset_id))
      .await
  }

  async fn unfollow(&self, user_id: Uuid, dataset_id: Uuid) -> Result<bool> {
    self
      .write(move |c| users::unfollow(c, user_id, dataset_id))
      .await
  }

  async fn followers(&self, dataset_id: Uuid) -> Result<Vec<User>> {
    self.read(move |c| users::followers(c, dataset_id)).await
  }
}
