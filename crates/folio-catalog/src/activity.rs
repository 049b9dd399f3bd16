//! Activity streams and dataset versions.
//!
//! Streams are readable by anyone who can read the dataset. Historical
//! snapshots and diffs need the right to update it.

use std::collections::HashMap;

use folio_core::{
  activity::{
    self, Activity, ActivityData, ActivityType, ChangeSet, NewActivity,
    SnapshotPayload,
  },
  actor::Actor,
  authz::{Action, Target},
  dataset::{Dataset, DatasetDict},
  search::SearchIndex,
  store::CatalogStore,
  validation::{MISSING_VALUE, ValidationErrors},
};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Catalog, Error, Result, error::store_error};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityStream {
  pub activities:        Vec<Activity>,
  /// Whether the actor may open snapshots and diffs from this stream.
  pub can_view_versions: bool,
}

/// What one activity changed relative to the one before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityChanges {
  pub activity:             Activity,
  pub previous_activity_id: Option<Uuid>,
  pub changes:              ChangeSet,
}

impl<S, I> Catalog<S, I>
where
  S: CatalogStore,
  I: SearchIndex,
{
  async fn require_activity(&self, activity_id: Uuid) -> Result<Activity> {
    self
      .store
      .get_activity(activity_id)
      .await
      .map_err(store_error)?
      .ok_or_else(|| Error::NotFound(format!("Activity {activity_id} not found")))
  }

  fn authorize_versions(&self, actor: &Actor, dataset: &Dataset) -> Result<()> {
    self.authorize_write(actor, Action::DatasetUpdate, dataset)
  }

  /// Drop activities on datasets the actor may not read.
  pub(crate) async fn readable_activities(
    &self,
    actor: &Actor,
    activities: Vec<Activity>,
  ) -> Result<Vec<Activity>> {
    let mut readable: HashMap<Uuid, bool> = HashMap::new();
    let mut out = Vec::with_capacity(activities.len());
    for activity in activities {
      let visible = match readable.get(&activity.object_id) {
        Some(&visible) => visible,
        None => {
          let dataset = self
            .store
            .get_dataset(activity.object_id)
            .await
            .map_err(store_error)?;
          let visible = match &dataset {
            Some(d) => self.allowed(actor, Action::DatasetRead, Target::Dataset(d)),
            None => actor.is_sysadmin(),
          };
          readable.insert(activity.object_id, visible);
          visible
        }
      };
      if visible {
        out.push(activity);
      }
    }
    Ok(out)
  }

  /// A dataset's activities, newest first.
  pub async fn get_activity_stream(
    &self,
    actor: &Actor,
    dataset: &str,
    limit: usize,
    offset: usize,
  ) -> Result<ActivityStream> {
    let dataset = self.require_dataset(dataset).await?;
    self.authorize_read(actor, Action::DatasetRead, &dataset)?;
    let activities = self
      .store
      .list_activities(dataset.dataset_id, limit, offset)
      .await
      .map_err(store_error)?;
    let can_view_versions =
      self.allowed(actor, Action::DatasetUpdate, Target::Dataset(&dataset));
    Ok(ActivityStream { activities, can_view_versions })
  }

  /// The dataset as recorded by one of its activities.
  pub async fn snapshot_at(
    &self,
    actor: &Actor,
    dataset: &str,
    activity_id: Uuid,
  ) -> Result<DatasetDict> {
    let dataset = self.require_dataset(dataset).await?;
    self.authorize_versions(actor, &dataset)?;
    let activity = self.require_activity(activity_id).await?;
    Ok(activity::snapshot_at(dataset.dataset_id, &activity)?.clone())
  }

  /// Compare the dataset as recorded by two of its activities.
  pub async fn diff(
    &self,
    actor: &Actor,
    dataset: &str,
    before: Uuid,
    after: Uuid,
  ) -> Result<ChangeSet> {
    let dataset = self.require_dataset(dataset).await?;
    self.authorize_versions(actor, &dataset)?;
    let before = self.require_activity(before).await?;
    let after = self.require_activity(after).await?;
    Ok(activity::diff(
      activity::snapshot_at(dataset.dataset_id, &before)?,
      activity::snapshot_at(dataset.dataset_id, &after)?,
    )?)
  }

  /// Diff an activity against the previous one on the same dataset. The
  /// first activity introduces every field.
  pub async fn changes(&self, actor: &Actor, activity_id: Uuid) -> Result<ActivityChanges> {
    let activity = self.require_activity(activity_id).await?;
    let dataset = self
      .store
      .get_dataset(activity.object_id)
      .await
      .map_err(store_error)?
      .ok_or_else(|| Error::NotFound(format!("Activity {activity_id} not found")))?;
    self.authorize_versions(actor, &dataset)?;

    let previous = self
      .store
      .previous_activity(activity_id)
      .await
      .map_err(store_error)?;
    let after = activity.snapshot()?;
    let changes = match &previous {
      Some(prev) => activity::diff(prev.snapshot()?, after)?,
      None => activity::introduced(after)?,
    };
    Ok(ActivityChanges {
      previous_activity_id: previous.map(|p| p.activity_id),
      changes,
      activity,
    })
  }

  /// Append an extension-defined activity carrying the current snapshot.
  pub async fn record_custom_activity(
    &self,
    actor: &Actor,
    dataset: &str,
    activity_type: &str,
    extra: Map<String, Value>,
  ) -> Result<Activity> {
    let dataset = self.require_dataset(dataset).await?;
    self.authorize_versions(actor, &dataset)?;

    let activity_type = ActivityType::from(activity_type.trim());
    match &activity_type {
      ActivityType::Custom(name) if name.is_empty() => {
        return Err(Error::Validation(ValidationErrors::single(
          "activity_type",
          MISSING_VALUE,
        )));
      }
      ActivityType::Custom(_) => {}
      _ => {
        return Err(Error::Validation(ValidationErrors::single(
          "activity_type",
          "Reserved activity type",
        )));
      }
    }

    let dict = self.dictize(dataset.dataset_id).await?;
    let input = NewActivity {
      object_id: dataset.dataset_id,
      org_id: dataset.owner_org,
      actor: actor.activity_ref(),
      activity_type,
      data: ActivityData::snapshot(SnapshotPayload {
        package: Some(dict),
        actor_name: actor.name().map(str::to_owned),
        extra,
      }),
    };
    let activity = self.store.record_activity(input).await.map_err(store_error)?;
    tracing::info!(
      dataset = %dataset.dataset_id,
      activity = %activity.activity_id,
      kind = %activity.activity_type,
      "recorded custom activity"
    );
    Ok(activity)
  }
}
