//! Users and followers.

use folio_core::user::{NewUser, User};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{RawUser, USER_COLUMNS, encode_dt, encode_uuid, now},
};

pub fn insert(conn: &Connection, input: NewUser) -> Result<User> {
  let taken: bool = conn
    .query_row("SELECT 1 FROM users WHERE name = ?1", params![input.name], |_| {
      Ok(true)
    })
    .optional()?
    .unwrap_or(false);
  if taken {
    return Err(Error::NameTaken { kind: "user", name: input.name });
  }

  let user = User {
    user_id:      Uuid::new_v4(),
    display_name: input.resolved_display_name(),
    name:         input.name,
    sysadmin:     input.sysadmin,
    created_at:   now(),
  };

  conn.execute(
    "INSERT INTO users (user_id, name, display_name, sysadmin, password_hash, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    params![
      encode_uuid(user.user_id),
      user.name,
      user.display_name,
      user.sysadmin,
      input.password_hash,
      encode_dt(user.created_at),
    ],
  )?;
  Ok(user)
}

pub fn get(conn: &Connection, user_id: Uuid) -> Result<Option<User>> {
  conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
      params![encode_uuid(user_id)],
      RawUser::from_row,
    )
    .optional()?
    .map(RawUser::into_user)
    .transpose()
}

pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<User>> {
  conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE name = ?1"),
      params![name],
      RawUser::from_row,
    )
    .optional()?
    .map(RawUser::into_user)
    .transpose()
}

pub fn require(conn: &Connection, user_id: Uuid) -> Result<User> {
  get(conn, user_id)?.ok_or(Error::UserNotFound(user_id))
}

pub fn password_hash(conn: &Connection, user_id: Uuid) -> Result<Option<String>> {
  let hash: Option<Option<String>> = conn
    .query_row(
      "SELECT password_hash FROM users WHERE user_id = ?1",
      params![encode_uuid(user_id)],
      |row| row.get(0),
    )
    .optional()?;
  Ok(hash.flatten())
}

pub fn list(conn: &Connection) -> Result<Vec<User>> {
  let mut stmt =
    conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY name"))?;
  let raws = stmt
    .query_map([], RawUser::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawUser::into_user).collect()
}

// ─── Followers ───────────────────────────────────────────────────────────────

pub fn follow(conn: &Connection, user_id: Uuid, dataset_id: Uuid) -> Result<bool> {
  require(conn, user_id)?;
  crate::datasets::require(conn, dataset_id)?;
  let inserted = conn.execute(
    "INSERT OR IGNORE INTO followers (user_id, dataset_id, created_at)
     VALUES (?1, ?2, ?3)",
    params![encode_uuid(user_id), encode_uuid(dataset_id), encode_dt(now())],
  )?;
  Ok(inserted == 1)
}

pub fn unfollow(
  conn: &Connection,
  user_id: Uuid,
  dataset_id: Uuid,
) -> Result<bool> {
  let removed = conn.execute(
    "DELETE FROM followers WHERE user_id = ?1 AND dataset_id = ?2",
    params![encode_uuid(user_id), encode_uuid(dataset_id)],
  )?;
  Ok(removed == 1)
}

pub fn followers(conn: &Connection, dataset_id: Uuid) -> Result<Vec<User>> {
  let mut stmt = conn.prepare(
    "SELECT u.user_id, u.name, u.display_name, u.sysadmin, u.created_at
     FROM followers f
     JOIN users u ON u.user_id = f.user_id
     WHERE f.dataset_id = ?1
     ORDER BY f.created_at, u.name",
  )?;
  let raws = stmt
    .query_map(params![encode_uuid(dataset_id)], RawUser::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawUser::into_user).collect()
}
