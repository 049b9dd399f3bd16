//! Datasets and their dictized form.

use folio_core::{
  activity::{ActivityType, ActorRef},
  dataset::{Dataset, DatasetDict, DatasetPatch, DatasetState, NewDataset},
  store::DatasetFilter,
};
use rusqlite::{Connection, OptionalExtension as _, params, types::Value};
use uuid::Uuid;

use crate::{
  Error, Result, activities,
  encode::{
    DATASET_COLUMNS, RawDataset, encode_dt, encode_tags, encode_uuid, now,
  },
  organizations, resources, users,
};

/// Whether a live dataset other than `except` already uses `name`.
fn name_in_use(conn: &Connection, name: &str, except: Option<Uuid>) -> Result<bool> {
  let except = except.map(encode_uuid).unwrap_or_default();
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM datasets
         WHERE name = ?1 AND state != 'deleted' AND dataset_id != ?2",
        params![name, except],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

fn write_row(conn: &Connection, d: &Dataset) -> Result<()> {
  conn.execute(
    "INSERT INTO datasets (
       dataset_id, name, title, notes, owner_org, private, state,
       creator_user_id, tags, metadata_created, metadata_modified
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
     ON CONFLICT (dataset_id) DO UPDATE SET
       name = excluded.name,
       title = excluded.title,
       notes = excluded.notes,
       owner_org = excluded.owner_org,
       private = excluded.private,
       state = excluded.state,
       tags = excluded.tags,
       metadata_modified = excluded.metadata_modified",
    params![
      encode_uuid(d.dataset_id),
      d.name,
      d.title,
      d.notes,
      d.owner_org.map(encode_uuid),
      d.private,
      d.state.as_ref(),
      d.creator_user_id.map(encode_uuid),
      encode_tags(&d.tags)?,
      encode_dt(d.metadata_created),
      encode_dt(d.metadata_modified),
    ],
  )?;
  Ok(())
}

pub fn insert(
  conn: &Connection,
  input: NewDataset,
  actor: ActorRef,
) -> Result<DatasetDict> {
  if name_in_use(conn, &input.name, None)? {
    return Err(Error::NameTaken { kind: "dataset", name: input.name });
  }
  if let Some(org_id) = input.owner_org {
    organizations::require(conn, org_id)?;
  }
  let creator_user_id = match actor.user_id() {
    Some(id) => users::get(conn, id)?.map(|u| u.user_id),
    None => None,
  };

  let created = now();
  let dataset = Dataset {
    dataset_id: Uuid::new_v4(),
    title: input.resolved_title(),
    name: input.name,
    notes: input.notes,
    owner_org: input.owner_org,
    private: input.private,
    state: input.state,
    creator_user_id,
    tags: input.tags,
    metadata_created: created,
    metadata_modified: created,
  };
  write_row(conn, &dataset)?;

  let dict = dictize_loaded(conn, dataset)?;
  activities::append_for_dataset(conn, &dict, actor, ActivityType::NewPackage)?;
  Ok(dict)
}

pub fn get(conn: &Connection, dataset_id: Uuid) -> Result<Option<Dataset>> {
  conn
    .query_row(
      &format!("SELECT {DATASET_COLUMNS} FROM datasets WHERE dataset_id = ?1"),
      params![encode_uuid(dataset_id)],
      RawDataset::from_row,
    )
    .optional()?
    .map(RawDataset::into_dataset)
    .transpose()
}

pub fn require(conn: &Connection, dataset_id: Uuid) -> Result<Dataset> {
  get(conn, dataset_id)?.ok_or(Error::DatasetNotFound(dataset_id))
}

/// Ids win over names; a name only resolves to a dataset that is not
/// deleted, since deleted datasets release their names.
pub fn find(conn: &Connection, id_or_name: &str) -> Result<Option<Dataset>> {
  if let Ok(dataset_id) = Uuid::parse_str(id_or_name) {
    if let Some(dataset) = get(conn, dataset_id)? {
      return Ok(Some(dataset));
    }
  }
  conn
    .query_row(
      &format!(
        "SELECT {DATASET_COLUMNS} FROM datasets
         WHERE name = ?1 AND state != 'deleted'"
      ),
      params![id_or_name],
      RawDataset::from_row,
    )
    .optional()?
    .map(RawDataset::into_dataset)
    .transpose()
}

fn dictize_loaded(conn: &Connection, dataset: Dataset) -> Result<DatasetDict> {
  let organization = match dataset.owner_org {
    Some(org_id) => organizations::get(conn, org_id)?.map(|o| o.summary()),
    None => None,
  };
  let resources = resources::list(conn, dataset.dataset_id)?;
  Ok(DatasetDict { dataset, organization, resources })
}

pub fn dictize(conn: &Connection, dataset_id: Uuid) -> Result<Option<DatasetDict>> {
  get(conn, dataset_id)?
    .map(|d| dictize_loaded(conn, d))
    .transpose()
}

/// Bump `metadata_modified` after a change to something the dataset owns.
pub fn touch(conn: &Connection, dataset_id: Uuid) -> Result<DatasetDict> {
  conn.execute(
    "UPDATE datasets SET metadata_modified = ?2 WHERE dataset_id = ?1",
    params![encode_uuid(dataset_id), encode_dt(now())],
  )?;
  dictize(conn, dataset_id)?.ok_or(Error::DatasetNotFound(dataset_id))
}

pub fn update(
  conn: &Connection,
  dataset_id: Uuid,
  patch: DatasetPatch,
  actor: ActorRef,
) -> Result<DatasetDict> {
  let mut dataset = require(conn, dataset_id)?;
  patch.apply_to(&mut dataset);

  if patch.name.is_some()
    && dataset.state != DatasetState::Deleted
    && name_in_use(conn, &dataset.name, Some(dataset_id))?
  {
    return Err(Error::NameTaken { kind: "dataset", name: dataset.name });
  }
  if let Some(Some(org_id)) = patch.owner_org {
    organizations::require(conn, org_id)?;
  }
  dataset.metadata_modified = now();
  write_row(conn, &dataset)?;

  let dict = dictize_loaded(conn, dataset)?;
  activities::append_for_dataset(conn, &dict, actor, ActivityType::ChangedPackage)?;
  Ok(dict)
}

pub fn set_state(
  conn: &Connection,
  dataset_id: Uuid,
  state: DatasetState,
  actor: ActorRef,
) -> Result<DatasetDict> {
  let mut dataset = require(conn, dataset_id)?;
  if dataset.state == state {
    return dictize_loaded(conn, dataset);
  }
  // Leaving the deleted state reclaims the name.
  if dataset.state == DatasetState::Deleted
    && name_in_use(conn, &dataset.name, Some(dataset_id))?
  {
    return Err(Error::NameTaken { kind: "dataset", name: dataset.name });
  }

  dataset.state = state;
  dataset.metadata_modified = now();
  write_row(conn, &dataset)?;

  let activity_type = match state {
    DatasetState::Deleted => ActivityType::DeletedPackage,
    _ => ActivityType::ChangedPackage,
  };
  let dict = dictize_loaded(conn, dataset)?;
  activities::append_for_dataset(conn, &dict, actor, activity_type)?;
  Ok(dict)
}

pub fn list(conn: &Connection, filter: &DatasetFilter) -> Result<Vec<Dataset>> {
  let mut conds: Vec<&'static str> = vec![];
  let mut args: Vec<Value> = vec![];

  if let Some(org_id) = filter.owner_org {
    conds.push("owner_org = ?");
    args.push(Value::Text(encode_uuid(org_id)));
  }
  match filter.state {
    Some(state) => {
      conds.push("state = ?");
      args.push(Value::Text(state.as_ref().to_owned()));
    }
    None if !filter.include_deleted => conds.push("state != 'deleted'"),
    None => {}
  }

  let where_clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };

  let mut stmt = conn.prepare(&format!(
    "SELECT {DATASET_COLUMNS} FROM datasets {where_clause} ORDER BY name"
  ))?;
  let raws = stmt
    .query_map(rusqlite::params_from_iter(args), RawDataset::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawDataset::into_dataset).collect()
}
