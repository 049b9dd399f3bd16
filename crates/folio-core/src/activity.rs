//! The append-only activity log and dataset versioning.
//!
//! Every mutation of a dataset appends an [`Activity`] carrying a complete
//! snapshot of the dataset afterwards. Snapshots are self-contained, so a
//! historical state is read straight off its activity and two states are
//! compared field by field.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Error, Result, dataset::DatasetDict};

/// The payload layout written by this version of the log. Entries stored
/// under any other version are kept verbatim and reported as unmigrated.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

// ─── Actor reference ─────────────────────────────────────────────────────────

/// Who performed an activity. Stored as the user id, or `"system"` when no
/// user can be attributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ActorRef {
  User(Uuid),
  System,
}

impl ActorRef {
  pub fn user_id(self) -> Option<Uuid> {
    match self {
      ActorRef::User(id) => Some(id),
      ActorRef::System => None,
    }
  }
}

impl fmt::Display for ActorRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ActorRef::User(id) => write!(f, "{id}"),
      ActorRef::System => f.write_str("system"),
    }
  }
}

impl FromStr for ActorRef {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    if s == "system" {
      return Ok(ActorRef::System);
    }
    Uuid::parse_str(s).map(ActorRef::User).map_err(|_| {
      Error::UnknownDiscriminant { kind: "actor", value: s.to_owned() }
    })
  }
}

impl From<ActorRef> for String {
  fn from(actor: ActorRef) -> Self { actor.to_string() }
}

impl TryFrom<String> for ActorRef {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { s.parse() }
}

// ─── Activity type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ActivityType {
  NewPackage,
  ChangedPackage,
  DeletedPackage,
  /// Defined by an extension; stored under its own name.
  Custom(String),
}

impl ActivityType {
  pub fn as_str(&self) -> &str {
    match self {
      ActivityType::NewPackage => "new package",
      ActivityType::ChangedPackage => "changed package",
      ActivityType::DeletedPackage => "deleted package",
      ActivityType::Custom(s) => s,
    }
  }

  /// Human phrasing used in activity streams.
  pub fn summary(&self) -> &str {
    match self {
      ActivityType::NewPackage => "created the dataset",
      ActivityType::ChangedPackage => "updated the dataset",
      ActivityType::DeletedPackage => "deleted the dataset",
      ActivityType::Custom(s) => s,
    }
  }
}

impl fmt::Display for ActivityType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl From<String> for ActivityType {
  fn from(s: String) -> Self {
    match s.as_str() {
      "new package" => ActivityType::NewPackage,
      "changed package" => ActivityType::ChangedPackage,
      "deleted package" => ActivityType::DeletedPackage,
      _ => ActivityType::Custom(s),
    }
  }
}

impl From<&str> for ActivityType {
  fn from(s: &str) -> Self { ActivityType::from(s.to_owned()) }
}

impl From<ActivityType> for String {
  fn from(t: ActivityType) -> Self {
    match t {
      ActivityType::Custom(s) => s,
      other => other.as_str().to_owned(),
    }
  }
}

// ─── Payload ─────────────────────────────────────────────────────────────────

/// The current payload layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPayload {
  /// The dataset as it stood after the activity.
  #[serde(default)]
  pub package:    Option<DatasetDict>,
  /// Actor's name at the time, kept so streams survive user renames.
  #[serde(default)]
  pub actor_name: Option<String>,
  /// Free-form data attached by custom activity types.
  #[serde(default)]
  pub extra:      Map<String, Value>,
}

/// A payload tagged with the schema it was written under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityData {
  Snapshot(Box<SnapshotPayload>),
  Unmigrated { schema_version: u32, payload: Value },
}

impl ActivityData {
  pub fn snapshot(payload: SnapshotPayload) -> Self {
    ActivityData::Snapshot(Box::new(payload))
  }

  /// Interpret a stored payload. Anything that is not a well-formed
  /// current-version payload is kept as-is.
  pub fn decode(schema_version: u32, payload: Value) -> Self {
    if schema_version != CURRENT_SCHEMA_VERSION {
      return ActivityData::Unmigrated { schema_version, payload };
    }
    match serde_json::from_value(payload.clone()) {
      Ok(snapshot) => ActivityData::Snapshot(Box::new(snapshot)),
      Err(_) => ActivityData::Unmigrated { schema_version, payload },
    }
  }

  pub fn encode(&self) -> Result<(u32, Value)> {
    match self {
      ActivityData::Snapshot(s) => {
        Ok((CURRENT_SCHEMA_VERSION, serde_json::to_value(s)?))
      }
      ActivityData::Unmigrated { schema_version, payload } => {
        Ok((*schema_version, payload.clone()))
      }
    }
  }

  pub fn is_migrated(&self) -> bool {
    matches!(self, ActivityData::Snapshot(_))
  }
}

// ─── Activity ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
  pub activity_id:   Uuid,
  /// The dataset this activity belongs to.
  pub object_id:     Uuid,
  /// Owning organization at the time, if any.
  pub org_id:        Option<Uuid>,
  pub actor:         ActorRef,
  pub activity_type: ActivityType,
  pub timestamp:     DateTime<Utc>,
  pub data:          ActivityData,
}

impl Activity {
  pub fn summary(&self) -> &str { self.activity_type.summary() }

  pub fn actor_name(&self) -> Option<&str> {
    match &self.data {
      ActivityData::Snapshot(s) => s.actor_name.as_deref(),
      ActivityData::Unmigrated { .. } => None,
    }
  }

  /// The dataset state recorded by this activity.
  pub fn snapshot(&self) -> Result<&DatasetDict> {
    match &self.data {
      ActivityData::Unmigrated { .. } => {
        Err(Error::UnmigratedActivity(self.activity_id))
      }
      ActivityData::Snapshot(s) => {
        s.package.as_ref().ok_or(Error::NoSnapshot(self.activity_id))
      }
    }
  }
}

/// Input to [`crate::store::CatalogStore::record_activity`]. The store
/// assigns the id and timestamp.
#[derive(Debug, Clone)]
pub struct NewActivity {
  pub object_id:     Uuid,
  pub org_id:        Option<Uuid>,
  pub actor:         ActorRef,
  pub activity_type: ActivityType,
  pub data:          ActivityData,
}

/// The dataset state as of `activity`, which must belong to `object_id`.
pub fn snapshot_at(object_id: Uuid, activity: &Activity) -> Result<&DatasetDict> {
  if activity.object_id != object_id {
    return Err(Error::ActivityObjectMismatch {
      activity_id: activity.activity_id,
      object_id,
    });
  }
  activity.snapshot()
}

// ─── Diff ────────────────────────────────────────────────────────────────────

/// Fields that change on every write and carry no user-visible meaning.
const BOOKKEEPING_FIELDS: &[&str] = &["metadata_modified"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum FieldChange {
  Unchanged,
  Added { value: Value },
  Removed { value: Value },
  Changed { from: Value, to: Value },
}

impl FieldChange {
  pub fn is_unchanged(&self) -> bool { matches!(self, FieldChange::Unchanged) }
}

/// Per-field comparison of two snapshots, keyed by top-level field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet {
  pub fields: BTreeMap<String, FieldChange>,
}

impl ChangeSet {
  pub fn get(&self, field: &str) -> Option<&FieldChange> {
    self.fields.get(field)
  }

  /// Names of the fields that differ, in field order.
  pub fn changed_fields(&self) -> Vec<&str> {
    self
      .fields
      .iter()
      .filter(|(_, c)| !c.is_unchanged())
      .map(|(k, _)| k.as_str())
      .collect()
  }

  pub fn is_empty(&self) -> bool { self.changed_fields().is_empty() }
}

pub fn diff(before: &DatasetDict, after: &DatasetDict) -> Result<ChangeSet> {
  let before = as_object(before)?;
  let after = as_object(after)?;

  let mut fields = BTreeMap::new();
  let keys = before.keys().chain(after.keys());
  for key in keys {
    if BOOKKEEPING_FIELDS.contains(&key.as_str()) || fields.contains_key(key) {
      continue;
    }
    let change = match (before.get(key), after.get(key)) {
      (Some(a), Some(b)) if a == b => FieldChange::Unchanged,
      (Some(a), Some(b)) => FieldChange::Changed { from: a.clone(), to: b.clone() },
      (None, Some(b)) => FieldChange::Added { value: b.clone() },
      (Some(a), None) => FieldChange::Removed { value: a.clone() },
      (None, None) => continue,
    };
    fields.insert(key.clone(), change);
  }
  Ok(ChangeSet { fields })
}

/// The change set of a dataset's first activity: every field is new.
pub fn introduced(after: &DatasetDict) -> Result<ChangeSet> {
  let fields = as_object(after)?
    .into_iter()
    .filter(|(key, _)| !BOOKKEEPING_FIELDS.contains(&key.as_str()))
    .map(|(key, value)| (key, FieldChange::Added { value }))
    .collect();
  Ok(ChangeSet { fields })
}

fn as_object(dict: &DatasetDict) -> Result<Map<String, Value>> {
  match serde_json::to_value(dict)? {
    Value::Object(map) => Ok(map),
    _ => Ok(Map::new()),
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;
  use serde_json::json;

  use super::*;
  use crate::dataset::{Dataset, DatasetState};

  fn dict(title: &str) -> DatasetDict {
    let now = Utc::now();
    DatasetDict {
      dataset:      Dataset {
        dataset_id: Uuid::nil(),
        name: "annakarenina".into(),
        title: title.into(),
        notes: None,
        owner_org: None,
        private: false,
        state: DatasetState::Active,
        creator_user_id: None,
        tags: vec!["russian".into()],
        metadata_created: now,
        metadata_modified: now,
      },
      organization: None,
      resources:    vec![],
    }
  }

  #[test]
  fn diff_reports_only_mutated_fields() {
    let a = dict("A");
    let mut b = dict("B");
    b.dataset.metadata_created = a.dataset.metadata_created;
    b.dataset.metadata_modified = a.dataset.metadata_modified + Duration::seconds(5);

    let changes = diff(&a, &b).unwrap();
    assert_eq!(changes.changed_fields(), vec!["title"]);
    assert_eq!(
      changes.get("title"),
      Some(&FieldChange::Changed { from: json!("A"), to: json!("B") })
    );
    assert!(changes.get("metadata_modified").is_none());
  }

  #[test]
  fn identical_snapshots_have_empty_diff() {
    let a = dict("Same");
    assert!(diff(&a, &a).unwrap().is_empty());
  }

  #[test]
  fn first_activity_introduces_every_field() {
    let changes = introduced(&dict("New")).unwrap();
    assert_eq!(
      changes.get("title"),
      Some(&FieldChange::Added { value: json!("New") })
    );
    assert!(changes.get("metadata_modified").is_none());
  }

  #[test]
  fn unknown_schema_is_unmigrated() {
    let data = ActivityData::decode(1, json!({"package": {"name": "old"}}));
    assert!(!data.is_migrated());

    let activity = Activity {
      activity_id:   Uuid::new_v4(),
      object_id:     Uuid::new_v4(),
      org_id:        None,
      actor:         ActorRef::System,
      activity_type: ActivityType::ChangedPackage,
      timestamp:     Utc::now(),
      data,
    };
    assert!(matches!(
      snapshot_at(activity.object_id, &activity),
      Err(Error::UnmigratedActivity(_))
    ));
    assert!(matches!(
      snapshot_at(Uuid::new_v4(), &activity),
      Err(Error::ActivityObjectMismatch { .. })
    ));
  }

  #[test]
  fn current_schema_round_trips_through_storage_form() {
    let data = ActivityData::snapshot(SnapshotPayload {
      package: Some(dict("T")),
      ..SnapshotPayload::default()
    });
    let (version, value) = data.encode().unwrap();
    assert_eq!(version, CURRENT_SCHEMA_VERSION);
    assert_eq!(ActivityData::decode(version, value), data);
  }

  #[test]
  fn activity_types_and_summaries() {
    assert_eq!(ActivityType::from("new package"), ActivityType::NewPackage);
    assert_eq!(ActivityType::ChangedPackage.summary(), "updated the dataset");
    let custom = ActivityType::from("changed datastore");
    assert_eq!(custom, ActivityType::Custom("changed datastore".into()));
    assert_eq!(custom.summary(), "changed datastore");
  }

  #[test]
  fn actor_refs_parse() {
    assert_eq!("system".parse::<ActorRef>().unwrap(), ActorRef::System);
    let id = Uuid::new_v4();
    assert_eq!(id.to_string().parse::<ActorRef>().unwrap(), ActorRef::User(id));
    assert!("nobody".parse::<ActorRef>().is_err());
  }
}
