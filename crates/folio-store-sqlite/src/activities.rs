//! The activity log.

use folio_core::{
  activity::{
    Activity, ActivityData, ActivityType, ActorRef, NewActivity,
    SnapshotPayload,
  },
  dataset::DatasetDict,
};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{ACTIVITY_COLUMNS, RawActivity, encode_dt, encode_uuid, now},
  users,
};

/// Map an actor onto a known user, falling back to the system sentinel.
/// Returns the reference to store and the user's current name.
fn resolve_actor(
  conn: &Connection,
  actor: ActorRef,
) -> Result<(ActorRef, Option<String>)> {
  match actor {
    ActorRef::System => Ok((ActorRef::System, None)),
    ActorRef::User(id) => Ok(match users::get(conn, id)? {
      Some(user) => (ActorRef::User(id), Some(user.name)),
      None => {
        tracing::warn!(user_id = %id, "activity actor is not a known user; recording as system");
        (ActorRef::System, None)
      }
    }),
  }
}

pub fn insert(conn: &Connection, input: NewActivity) -> Result<Activity> {
  let (actor, actor_name) = resolve_actor(conn, input.actor)?;
  let data = match input.data {
    ActivityData::Snapshot(mut payload) => {
      if payload.actor_name.is_none() {
        payload.actor_name = actor_name;
      }
      ActivityData::Snapshot(payload)
    }
    unmigrated => unmigrated,
  };

  let activity = Activity {
    activity_id: Uuid::new_v4(),
    object_id: input.object_id,
    org_id: input.org_id,
    actor,
    activity_type: input.activity_type,
    timestamp: now(),
    data,
  };
  let (schema_version, payload) = activity.data.encode()?;

  conn.execute(
    "INSERT INTO activities (
       activity_id, object_id, org_id, actor, activity_type,
       timestamp, schema_version, data_json
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      encode_uuid(activity.activity_id),
      encode_uuid(activity.object_id),
      activity.org_id.map(encode_uuid),
      activity.actor.to_string(),
      activity.activity_type.as_str(),
      encode_dt(activity.timestamp),
      schema_version,
      payload.to_string(),
    ],
  )?;
  Ok(activity)
}

/// Record a dataset mutation with a snapshot of the result.
pub fn append_for_dataset(
  conn: &Connection,
  dict: &DatasetDict,
  actor: ActorRef,
  activity_type: ActivityType,
) -> Result<Activity> {
  insert(conn, NewActivity {
    object_id: dict.dataset.dataset_id,
    org_id: dict.dataset.owner_org,
    actor,
    activity_type,
    data: ActivityData::snapshot(SnapshotPayload {
      package: Some(dict.clone()),
      ..SnapshotPayload::default()
    }),
  })
}

pub fn get(conn: &Connection, activity_id: Uuid) -> Result<Option<Activity>> {
  conn
    .query_row(
      &format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE activity_id = ?1"),
      params![encode_uuid(activity_id)],
      RawActivity::from_row,
    )
    .optional()?
    .map(RawActivity::into_activity)
    .transpose()
}

fn list_where(
  conn: &Connection,
  column: &str,
  id: Uuid,
  limit: usize,
  offset: usize,
) -> Result<Vec<Activity>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {ACTIVITY_COLUMNS} FROM activities
     WHERE {column} = ?1
     ORDER BY timestamp DESC, seq DESC
     LIMIT ?2 OFFSET ?3"
  ))?;
  let raws = stmt
    .query_map(
      params![encode_uuid(id), sql_count(limit), sql_count(offset)],
      RawActivity::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawActivity::into_activity).collect()
}

/// SQLite reads a negative `LIMIT` as unbounded and a negative `OFFSET` as
/// zero, so oversized counts saturate instead of wrapping.
fn sql_count(n: usize) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

pub fn list_for_object(
  conn: &Connection,
  object_id: Uuid,
  limit: usize,
  offset: usize,
) -> Result<Vec<Activity>> {
  list_where(conn, "object_id", object_id, limit, offset)
}

pub fn list_for_organization(
  conn: &Connection,
  org_id: Uuid,
  limit: usize,
  offset: usize,
) -> Result<Vec<Activity>> {
  list_where(conn, "org_id", org_id, limit, offset)
}

pub fn previous(conn: &Connection, activity_id: Uuid) -> Result<Option<Activity>> {
  conn
    .query_row(
      &format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activities a
         WHERE EXISTS (
           SELECT 1 FROM activities cur
           WHERE cur.activity_id = ?1
             AND a.object_id = cur.object_id
             AND (a.timestamp < cur.timestamp
                  OR (a.timestamp = cur.timestamp AND a.seq < cur.seq))
         )
         ORDER BY a.timestamp DESC, a.seq DESC
         LIMIT 1"
      ),
      params![encode_uuid(activity_id)],
      RawActivity::from_row,
    )
    .optional()?
    .map(RawActivity::into_activity)
    .transpose()
}

pub fn delete(conn: &Connection, activity_id: Uuid) -> Result<bool> {
  let removed = conn.execute(
    "DELETE FROM activities WHERE activity_id = ?1",
    params![encode_uuid(activity_id)],
  )?;
  Ok(removed == 1)
}
