//! Resources and resource views.
//!
//! Resource changes are dataset changes: each one bumps the parent's
//! `metadata_modified` and records a `changed package` activity. Views are
//! presentation only and are not logged.

use folio_core::{
  activity::{ActivityType, ActorRef},
  dataset::{
    NewResource, NewResourceView, Resource, ResourcePatch, ResourceView,
    ResourceViewPatch,
  },
};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Error, Result, activities, datasets,
  encode::{
    RESOURCE_COLUMNS, RawResource, RawView, VIEW_COLUMNS, encode_dt,
    encode_uuid, now,
  },
};

fn record_change(conn: &Connection, dataset_id: Uuid, actor: ActorRef) -> Result<()> {
  let dict = datasets::touch(conn, dataset_id)?;
  activities::append_for_dataset(conn, &dict, actor, ActivityType::ChangedPackage)?;
  Ok(())
}

pub fn insert(
  conn: &Connection,
  dataset_id: Uuid,
  input: NewResource,
  actor: ActorRef,
) -> Result<Resource> {
  datasets::require(conn, dataset_id)?;
  let position: u32 = conn.query_row(
    "SELECT COUNT(*) FROM resources WHERE dataset_id = ?1",
    params![encode_uuid(dataset_id)],
    |row| row.get(0),
  )?;

  let resource = Resource {
    resource_id: Uuid::new_v4(),
    dataset_id,
    url: input.url,
    name: input.name,
    description: input.description,
    format: input.format,
    position,
    created_at: now(),
  };

  conn.execute(
    "INSERT INTO resources (
       resource_id, dataset_id, url, name, description, format, position,
       created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      encode_uuid(resource.resource_id),
      encode_uuid(dataset_id),
      resource.url,
      resource.name,
      resource.description,
      resource.format,
      resource.position,
      encode_dt(resource.created_at),
    ],
  )?;

  record_change(conn, dataset_id, actor)?;
  Ok(resource)
}

pub fn get(conn: &Connection, resource_id: Uuid) -> Result<Option<Resource>> {
  conn
    .query_row(
      &format!("SELECT {RESOURCE_COLUMNS} FROM resources WHERE resource_id = ?1"),
      params![encode_uuid(resource_id)],
      RawResource::from_row,
    )
    .optional()?
    .map(RawResource::into_resource)
    .transpose()
}

fn require(conn: &Connection, resource_id: Uuid) -> Result<Resource> {
  get(conn, resource_id)?.ok_or(Error::ResourceNotFound(resource_id))
}

pub fn update(
  conn: &Connection,
  resource_id: Uuid,
  patch: ResourcePatch,
  actor: ActorRef,
) -> Result<Resource> {
  let mut resource = require(conn, resource_id)?;
  patch.apply_to(&mut resource);

  conn.execute(
    "UPDATE resources SET url = ?2, name = ?3, description = ?4, format = ?5
     WHERE resource_id = ?1",
    params![
      encode_uuid(resource_id),
      resource.url,
      resource.name,
      resource.description,
      resource.format,
    ],
  )?;

  record_change(conn, resource.dataset_id, actor)?;
  Ok(resource)
}

pub fn delete(conn: &Connection, resource_id: Uuid, actor: ActorRef) -> Result<()> {
  let resource = require(conn, resource_id)?;
  // Views go with their resource through ON DELETE CASCADE.
  conn.execute(
    "DELETE FROM resources WHERE resource_id = ?1",
    params![encode_uuid(resource_id)],
  )?;
  conn.execute(
    "UPDATE resources SET position = position - 1
     WHERE dataset_id = ?1 AND position > ?2",
    params![encode_uuid(resource.dataset_id), resource.position],
  )?;

  record_change(conn, resource.dataset_id, actor)
}

pub fn list(conn: &Connection, dataset_id: Uuid) -> Result<Vec<Resource>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {RESOURCE_COLUMNS} FROM resources
     WHERE dataset_id = ?1 ORDER BY position"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(dataset_id)], RawResource::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawResource::into_resource).collect()
}

// ─── Views ───────────────────────────────────────────────────────────────────

pub fn insert_view(
  conn: &Connection,
  resource_id: Uuid,
  input: NewResourceView,
) -> Result<ResourceView> {
  require(conn, resource_id)?;
  let position: u32 = conn.query_row(
    "SELECT COUNT(*) FROM resource_views WHERE resource_id = ?1",
    params![encode_uuid(resource_id)],
    |row| row.get(0),
  )?;

  let view = ResourceView {
    view_id: Uuid::new_v4(),
    resource_id,
    view_type: input.view_type,
    title: input.title,
    description: input.description,
    position,
  };

  conn.execute(
    "INSERT INTO resource_views (
       view_id, resource_id, view_type, title, description, position
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    params![
      encode_uuid(view.view_id),
      encode_uuid(resource_id),
      view.view_type,
      view.title,
      view.description,
      view.position,
    ],
  )?;
  Ok(view)
}

pub fn get_view(conn: &Connection, view_id: Uuid) -> Result<Option<ResourceView>> {
  conn
    .query_row(
      &format!("SELECT {VIEW_COLUMNS} FROM resource_views WHERE view_id = ?1"),
      params![encode_uuid(view_id)],
      RawView::from_row,
    )
    .optional()?
    .map(RawView::into_view)
    .transpose()
}

pub fn update_view(
  conn: &Connection,
  view_id: Uuid,
  patch: ResourceViewPatch,
) -> Result<ResourceView> {
  let mut view = get_view(conn, view_id)?.ok_or(Error::ViewNotFound(view_id))?;
  patch.apply_to(&mut view);
  conn.execute(
    "UPDATE resource_views SET title = ?2, description = ?3 WHERE view_id = ?1",
    params![encode_uuid(view_id), view.title, view.description],
  )?;
  Ok(view)
}

pub fn delete_view(conn: &Connection, view_id: Uuid) -> Result<()> {
  let view = get_view(conn, view_id)?.ok_or(Error::ViewNotFound(view_id))?;
  conn.execute(
    "DELETE FROM resource_views WHERE view_id = ?1",
    params![encode_uuid(view_id)],
  )?;
  conn.execute(
    "UPDATE resource_views SET position = position - 1
     WHERE resource_id = ?1 AND position > ?2",
    params![encode_uuid(view.resource_id), view.position],
  )?;
  Ok(())
}

pub fn list_views(conn: &Connection, resource_id: Uuid) -> Result<Vec<ResourceView>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {VIEW_COLUMNS} FROM resource_views
     WHERE resource_id = ?1 ORDER BY position"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(resource_id)], RawView::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawView::into_view).collect()
}
