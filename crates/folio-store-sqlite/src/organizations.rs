//! Organizations and memberships.

use folio_core::organization::{
  Capacity, Membership, NewOrganization, Organization, OrganizationState,
};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    ORGANIZATION_COLUMNS, RawMembership, RawOrganization, encode_dt,
    encode_uuid, now,
  },
  users,
};

fn name_in_use(conn: &Connection, name: &str) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM organizations WHERE name = ?1 AND state != 'deleted'",
        params![name],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

pub fn insert(
  conn: &Connection,
  input: NewOrganization,
  creator: Option<Uuid>,
) -> Result<Organization> {
  if name_in_use(conn, &input.name)? {
    return Err(Error::NameTaken { kind: "organization", name: input.name });
  }
  if let Some(user_id) = creator {
    users::require(conn, user_id)?;
  }

  let org = Organization {
    org_id:     Uuid::new_v4(),
    title:      input.resolved_title(),
    name:       input.name,
    state:      OrganizationState::Active,
    created_at: now(),
  };

  conn.execute(
    "INSERT INTO organizations (org_id, name, title, state, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(org.org_id),
      org.name,
      org.title,
      org.state.as_ref(),
      encode_dt(org.created_at),
    ],
  )?;

  if let Some(user_id) = creator {
    upsert_membership(conn, Membership {
      user_id,
      org_id: org.org_id,
      capacity: Capacity::Admin,
    })?;
  }
  Ok(org)
}

pub fn get(conn: &Connection, org_id: Uuid) -> Result<Option<Organization>> {
  conn
    .query_row(
      &format!(
        "SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE org_id = ?1"
      ),
      params![encode_uuid(org_id)],
      RawOrganization::from_row,
    )
    .optional()?
    .map(RawOrganization::into_organization)
    .transpose()
}

pub fn require(conn: &Connection, org_id: Uuid) -> Result<Organization> {
  get(conn, org_id)?.ok_or(Error::OrganizationNotFound(org_id))
}

pub fn find(conn: &Connection, id_or_name: &str) -> Result<Option<Organization>> {
  if let Ok(org_id) = Uuid::parse_str(id_or_name) {
    if let Some(org) = get(conn, org_id)? {
      return Ok(Some(org));
    }
  }
  conn
    .query_row(
      &format!(
        "SELECT {ORGANIZATION_COLUMNS} FROM organizations
         WHERE name = ?1 AND state != 'deleted'"
      ),
      params![id_or_name],
      RawOrganization::from_row,
    )
    .optional()?
    .map(RawOrganization::into_organization)
    .transpose()
}

pub fn list(conn: &Connection) -> Result<Vec<Organization>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {ORGANIZATION_COLUMNS} FROM organizations
     WHERE state != 'deleted' ORDER BY name"
  ))?;
  let raws = stmt
    .query_map([], RawOrganization::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawOrganization::into_organization).collect()
}

pub fn soft_delete(conn: &Connection, org_id: Uuid) -> Result<Organization> {
  let mut org = require(conn, org_id)?;
  org.state = OrganizationState::Deleted;
  conn.execute(
    "UPDATE organizations SET state = ?2 WHERE org_id = ?1",
    params![encode_uuid(org_id), org.state.as_ref()],
  )?;
  Ok(org)
}

// ─── Memberships ─────────────────────────────────────────────────────────────

pub fn upsert_membership(conn: &Connection, m: Membership) -> Result<()> {
  users::require(conn, m.user_id)?;
  require(conn, m.org_id)?;
  conn.execute(
    "INSERT INTO memberships (user_id, org_id, capacity) VALUES (?1, ?2, ?3)
     ON CONFLICT (user_id, org_id) DO UPDATE SET capacity = excluded.capacity",
    params![encode_uuid(m.user_id), encode_uuid(m.org_id), m.capacity.as_ref()],
  )?;
  Ok(())
}

pub fn delete_membership(
  conn: &Connection,
  user_id: Uuid,
  org_id: Uuid,
) -> Result<bool> {
  let removed = conn.execute(
    "DELETE FROM memberships WHERE user_id = ?1 AND org_id = ?2",
    params![encode_uuid(user_id), encode_uuid(org_id)],
  )?;
  Ok(removed == 1)
}

/// Memberships in live organizations only.
pub fn memberships_for_user(
  conn: &Connection,
  user_id: Uuid,
) -> Result<Vec<Membership>> {
  let mut stmt = conn.prepare(
    "SELECT m.user_id, m.org_id, m.capacity
     FROM memberships m
     JOIN organizations o ON o.org_id = m.org_id
     WHERE m.user_id = ?1 AND o.state != 'deleted'
     ORDER BY o.name",
  )?;
  let raws = stmt
    .query_map(params![encode_uuid(user_id)], RawMembership::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawMembership::into_membership).collect()
}

pub fn members_of(conn: &Connection, org_id: Uuid) -> Result<Vec<Membership>> {
  let mut stmt = conn.prepare(
    "SELECT m.user_id, m.org_id, m.capacity
     FROM memberships m
     JOIN users u ON u.user_id = m.user_id
     WHERE m.org_id = ?1
     ORDER BY u.name",
  )?;
  let raws = stmt
    .query_map(params![encode_uuid(org_id)], RawMembership::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawMembership::into_membership).collect()
}
