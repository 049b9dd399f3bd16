//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond width
//! so that text ordering matches time ordering. Tags are compact JSON.
//! UUIDs are hyphenated lowercase strings. Enums use their lowercase names.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use folio_core::{
  activity::{Activity, ActivityData, ActivityType, ActorRef},
  dataset::{Dataset, Resource, ResourceView},
  organization::{Membership, Organization},
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Decode a lowercase enum name written by its `AsRef<str>` impl.
pub fn decode_enum<T: FromStr>(kind: &'static str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| {
    folio_core::Error::UnknownDiscriminant { kind, value: s.to_owned() }.into()
  })
}

pub fn encode_tags(tags: &[String]) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────
//
// Each `Raw*` holds the column strings of one row exactly as read; the
// `*_COLUMNS` constant lists the columns in the order `from_row` expects.

pub const USER_COLUMNS: &str =
  "user_id, name, display_name, sysadmin, created_at";

pub struct RawUser {
  pub user_id:      String,
  pub name:         String,
  pub display_name: String,
  pub sysadmin:     bool,
  pub created_at:   String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:      row.get(0)?,
      name:         row.get(1)?,
      display_name: row.get(2)?,
      sysadmin:     row.get(3)?,
      created_at:   row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:      decode_uuid(&self.user_id)?,
      name:         self.name,
      display_name: self.display_name,
      sysadmin:     self.sysadmin,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const ORGANIZATION_COLUMNS: &str = "org_id, name, title, state, created_at";

pub struct RawOrganization {
  pub org_id:     String,
  pub name:       String,
  pub title:      String,
  pub state:      String,
  pub created_at: String,
}

impl RawOrganization {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      org_id:     row.get(0)?,
      name:       row.get(1)?,
      title:      row.get(2)?,
      state:      row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_organization(self) -> Result<Organization> {
    Ok(Organization {
      org_id:     decode_uuid(&self.org_id)?,
      name:       self.name,
      title:      self.title,
      state:      decode_enum("organization state", &self.state)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawMembership {
  pub user_id:  String,
  pub org_id:   String,
  pub capacity: String,
}

impl RawMembership {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:  row.get(0)?,
      org_id:   row.get(1)?,
      capacity: row.get(2)?,
    })
  }

  pub fn into_membership(self) -> Result<Membership> {
    Ok(Membership {
      user_id:  decode_uuid(&self.user_id)?,
      org_id:   decode_uuid(&self.org_id)?,
      capacity: decode_enum("capacity", &self.capacity)?,
    })
  }
}

pub const DATASET_COLUMNS: &str = "dataset_id, name, title, notes, owner_org, \
                                   private, state, creator_user_id, tags, \
                                   metadata_created, metadata_modified";

pub struct RawDataset {
  pub dataset_id:        String,
  pub name:              String,
  pub title:             String,
  pub notes:             Option<String>,
  pub owner_org:         Option<String>,
  pub private:           bool,
  pub state:             String,
  pub creator_user_id:   Option<String>,
  pub tags:              String,
  pub metadata_created:  String,
  pub metadata_modified: String,
}

impl RawDataset {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      dataset_id:        row.get(0)?,
      name:              row.get(1)?,
      title:             row.get(2)?,
      notes:             row.get(3)?,
      owner_org:         row.get(4)?,
      private:           row.get(5)?,
      state:             row.get(6)?,
      creator_user_id:   row.get(7)?,
      tags:              row.get(8)?,
      metadata_created:  row.get(9)?,
      metadata_modified: row.get(10)?,
    })
  }

  pub fn into_dataset(self) -> Result<Dataset> {
    Ok(Dataset {
      dataset_id:        decode_uuid(&self.dataset_id)?,
      name:              self.name,
      title:             self.title,
      notes:             self.notes,
      owner_org:         decode_opt_uuid(self.owner_org)?,
      private:           self.private,
      state:             decode_enum("dataset state", &self.state)?,
      creator_user_id:   decode_opt_uuid(self.creator_user_id)?,
      tags:              decode_tags(&self.tags)?,
      metadata_created:  decode_dt(&self.metadata_created)?,
      metadata_modified: decode_dt(&self.metadata_modified)?,
    })
  }
}

pub const RESOURCE_COLUMNS: &str = "resource_id, dataset_id, url, name, \
                                    description, format, position, created_at";

pub struct RawResource {
  pub resource_id: String,
  pub dataset_id:  String,
  pub url:         String,
  pub name:        Option<String>,
  pub description: Option<String>,
  pub format:      Option<String>,
  pub position:    u32,
  pub created_at:  String,
}

impl RawResource {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      resource_id: row.get(0)?,
      dataset_id:  row.get(1)?,
      url:         row.get(2)?,
      name:        row.get(3)?,
      description: row.get(4)?,
      format:      row.get(5)?,
      position:    row.get(6)?,
      created_at:  row.get(7)?,
    })
  }

  pub fn into_resource(self) -> Result<Resource> {
    Ok(Resource {
      resource_id: decode_uuid(&self.resource_id)?,
      dataset_id:  decode_uuid(&self.dataset_id)?,
      url:         self.url,
      name:        self.name,
      description: self.description,
      format:      self.format,
      position:    self.position,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const VIEW_COLUMNS: &str =
  "view_id, resource_id, view_type, title, description, position";

pub struct RawView {
  pub view_id:     String,
  pub resource_id: String,
  pub view_type:   String,
  pub title:       String,
  pub description: Option<String>,
  pub position:    u32,
}

impl RawView {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      view_id:     row.get(0)?,
      resource_id: row.get(1)?,
      view_type:   row.get(2)?,
      title:       row.get(3)?,
      description: row.get(4)?,
      position:    row.get(5)?,
    })
  }

  pub fn into_view(self) -> Result<ResourceView> {
    Ok(ResourceView {
      view_id:     decode_uuid(&self.view_id)?,
      resource_id: decode_uuid(&self.resource_id)?,
      view_type:   self.view_type,
      title:       self.title,
      description: self.description,
      position:    self.position,
    })
  }
}

pub const ACTIVITY_COLUMNS: &str = "activity_id, object_id, org_id, actor, \
                                    activity_type, timestamp, schema_version, \
                                    data_json";

pub struct RawActivity {
  pub activity_id:    String,
  pub object_id:      String,
  pub org_id:         Option<String>,
  pub actor:          String,
  pub activity_type:  String,
  pub timestamp:      String,
  pub schema_version: u32,
  pub data_json:      String,
}

impl RawActivity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      activity_id:    row.get(0)?,
      object_id:      row.get(1)?,
      org_id:         row.get(2)?,
      actor:          row.get(3)?,
      activity_type:  row.get(4)?,
      timestamp:      row.get(5)?,
      schema_version: row.get(6)?,
      data_json:      row.get(7)?,
    })
  }

  pub fn into_activity(self) -> Result<Activity> {
    let payload: serde_json::Value = serde_json::from_str(&self.data_json)?;
    Ok(Activity {
      activity_id:   decode_uuid(&self.activity_id)?,
      object_id:     decode_uuid(&self.object_id)?,
      org_id:        decode_opt_uuid(self.org_id)?,
      actor:         ActorRef::from_str(&self.actor)?,
      activity_type: ActivityType::from(self.activity_type),
      timestamp:     decode_dt(&self.timestamp)?,
      data:          ActivityData::decode(self.schema_version, payload),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_have_fixed_width() {
    let a = decode_dt("2024-01-01T00:00:00Z").unwrap();
    let b = decode_dt("2024-01-01T00:00:00.5Z").unwrap();
    assert_eq!(encode_dt(a).len(), encode_dt(b).len());
    assert!(encode_dt(a) < encode_dt(b));
  }

  #[test]
  fn now_round_trips_exactly() {
    let t = now();
    assert_eq!(decode_dt(&encode_dt(t)).unwrap(), t);
  }
}
