//! The `CatalogStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `folio-store-sqlite`).
//! Higher layers (`folio-catalog`, `folio-api`, `folio-cli`) depend on this
//! abstraction, not on any concrete backend.
//!
//! The store performs no authorization. Callers decide who may do what and
//! the store only guarantees atomicity: every dataset mutation commits
//! together with the activity that records it.

use std::future::Future;

use uuid::Uuid;

use crate::{
  activity::{Activity, ActorRef, NewActivity},
  dataset::{
    Dataset, DatasetDict, DatasetPatch, DatasetState, NewDataset, NewResource,
    NewResourceView, Resource, ResourcePatch, ResourceView, ResourceViewPatch,
  },
  organization::{Membership, NewOrganization, Organization},
  user::{NewUser, User},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`CatalogStore::list_datasets`].
#[derive(Debug, Clone, Default)]
pub struct DatasetFilter {
  pub owner_org:       Option<Uuid>,
  /// Restrict to one state. `None` means every state except deleted,
  /// unless `include_deleted` is set.
  pub state:           Option<DatasetState>,
  pub include_deleted: bool,
}

impl DatasetFilter {
  /// Every active dataset.
  pub fn active() -> Self {
    Self { state: Some(DatasetState::Active), ..Self::default() }
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Coarse classification of a backend error, enough for callers to map it
/// to a user-facing outcome without knowing the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
  /// A referenced row does not exist.
  NotFound,
  /// A unique name is already in use.
  NameTaken,
  Other,
}

pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn failure(&self) -> StoreFailure;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Folio catalogue store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CatalogStore: Send + Sync {
  type Error: StoreError;

  // ── Users ─────────────────────────────────────────────────────────────

  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// The stored argon2 hash, if the user has a password.
  fn password_hash(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  // ── Organizations ─────────────────────────────────────────────────────

  /// Create an organization. When `creator` is given they become its
  /// admin in the same transaction.
  fn create_organization(
    &self,
    input: NewOrganization,
    creator: Option<Uuid>,
  ) -> impl Future<Output = Result<Organization, Self::Error>> + Send + '_;

  /// Look up by id (any state) or by name (active only).
  fn get_organization<'a>(
    &'a self,
    id_or_name: &'a str,
  ) -> impl Future<Output = Result<Option<Organization>, Self::Error>> + Send + 'a;

  /// Active organizations, by name.
  fn list_organizations(
    &self,
  ) -> impl Future<Output = Result<Vec<Organization>, Self::Error>> + Send + '_;

  /// Soft-delete an organization. Its datasets keep their owner.
  fn delete_organization(
    &self,
    org_id: Uuid,
  ) -> impl Future<Output = Result<Organization, Self::Error>> + Send + '_;

  /// Grant a capacity, replacing any capacity the user already held there.
  fn set_membership(
    &self,
    membership: Membership,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Returns `false` if the user was not a member.
  fn remove_membership(
    &self,
    user_id: Uuid,
    org_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn memberships_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Membership>, Self::Error>> + Send + '_;

  fn members_of(
    &self,
    org_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Membership>, Self::Error>> + Send + '_;

  // ── Datasets ──────────────────────────────────────────────────────────

  /// Persist a new dataset and append its `new package` activity.
  fn create_dataset(
    &self,
    input: NewDataset,
    actor: ActorRef,
  ) -> impl Future<Output = Result<DatasetDict, Self::Error>> + Send + '_;

  /// Fetch by id, in any state.
  fn get_dataset(
    &self,
    dataset_id: Uuid,
  ) -> impl Future<Output = Result<Option<Dataset>, Self::Error>> + Send + '_;

  /// Resolve an id (any state) or a name (non-deleted only).
  fn find_dataset<'a>(
    &'a self,
    id_or_name: &'a str,
  ) -> impl Future<Output = Result<Option<Dataset>, Self::Error>> + Send + 'a;

  fn dictize_dataset(
    &self,
    dataset_id: Uuid,
  ) -> impl Future<Output = Result<Option<DatasetDict>, Self::Error>> + Send + '_;

  /// Apply a patch and append a `changed package` activity.
  fn update_dataset(
    &self,
    dataset_id: Uuid,
    patch: DatasetPatch,
    actor: ActorRef,
  ) -> impl Future<Output = Result<DatasetDict, Self::Error>> + Send + '_;

  /// Move a dataset through its lifecycle. Deleting appends a
  /// `deleted package` activity, anything else `changed package`.
  fn set_dataset_state(
    &self,
    dataset_id: Uuid,
    state: DatasetState,
    actor: ActorRef,
  ) -> impl Future<Output = Result<DatasetDict, Self::Error>> + Send + '_;

  fn list_datasets(
    &self,
    filter: DatasetFilter,
  ) -> impl Future<Output = Result<Vec<Dataset>, Self::Error>> + Send + '_;

  // ── Resources ─────────────────────────────────────────────────────────

  /// Append a resource to the end of its dataset. Records a
  /// `changed package` activity on the dataset.
  fn create_resource(
    &self,
    dataset_id: Uuid,
    input: NewResource,
    actor: ActorRef,
  ) -> impl Future<Output = Result<Resource, Self::Error>> + Send + '_;

  fn get_resource(
    &self,
    resource_id: Uuid,
  ) -> impl Future<Output = Result<Option<Resource>, Self::Error>> + Send + '_;

  fn update_resource(
    &self,
    resource_id: Uuid,
    patch: ResourcePatch,
    actor: ActorRef,
  ) -> impl Future<Output = Result<Resource, Self::Error>> + Send + '_;

  /// Remove a resource and its views, closing the gap in positions.
  fn delete_resource(
    &self,
    resource_id: Uuid,
    actor: ActorRef,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Resources of a dataset, in position order.
  fn list_resources(
    &self,
    dataset_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Resource>, Self::Error>> + Send + '_;

  // ── Resource views ────────────────────────────────────────────────────

  fn create_view(
    &self,
    resource_id: Uuid,
    input: NewResourceView,
  ) -> impl Future<Output = Result<ResourceView, Self::Error>> + Send + '_;

  fn get_view(
    &self,
    view_id: Uuid,
  ) -> impl Future<Output = Result<Option<ResourceView>, Self::Error>> + Send + '_;

  fn update_view(
    &self,
    view_id: Uuid,
    patch: ResourceViewPatch,
  ) -> impl Future<Output = Result<ResourceView, Self::Error>> + Send + '_;

  fn delete_view(
    &self,
    view_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_views(
    &self,
    resource_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ResourceView>, Self::Error>> + Send + '_;

  // ── Activities ────────────────────────────────────────────────────────

  /// Append an activity outside of a dataset mutation (custom activity
  /// types, imports). An actor that is not a known user is stored as
  /// [`ActorRef::System`].
  fn record_activity(
    &self,
    input: NewActivity,
  ) -> impl Future<Output = Result<Activity, Self::Error>> + Send + '_;

  fn get_activity(
    &self,
    activity_id: Uuid,
  ) -> impl Future<Output = Result<Option<Activity>, Self::Error>> + Send + '_;

  /// Activities of one dataset, newest first.
  fn list_activities(
    &self,
    object_id: Uuid,
    limit: usize,
    offset: usize,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + '_;

  /// Activities of every dataset an organization owned at the time,
  /// newest first.
  fn list_organization_activities(
    &self,
    org_id: Uuid,
    limit: usize,
    offset: usize,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + '_;

  /// The activity recorded on the same object immediately before this one.
  fn previous_activity(
    &self,
    activity_id: Uuid,
  ) -> impl Future<Output = Result<Option<Activity>, Self::Error>> + Send + '_;

  /// Administrative removal. Returns `false` if absent.
  fn delete_activity(
    &self,
    activity_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Followers ─────────────────────────────────────────────────────────

  /// Returns `false` if the user already followed the dataset.
  fn follow(
    &self,
    user_id: Uuid,
    dataset_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Returns `false` if the user was not following the dataset.
  fn unfollow(
    &self,
    user_id: Uuid,
    dataset_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn followers(
    &self,
    dataset_id: Uuid,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;
}
