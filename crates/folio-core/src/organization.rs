//! Organizations and the memberships that grant capacities within them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::validation::{ValidationErrors, check_name};

/// A membership's permission tier. Ordered: `Member < Editor < Admin`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Capacity {
  /// May read the organization's private datasets.
  Member,
  /// May also create, update and delete the organization's datasets.
  Editor,
  /// May also manage memberships and the organization itself.
  Admin,
}

impl Capacity {
  /// Whether this capacity may create and modify datasets.
  pub fn can_edit(self) -> bool { self >= Capacity::Editor }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrganizationState {
  #[default]
  Active,
  Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
  pub org_id:     Uuid,
  pub name:       String,
  pub title:      String,
  pub state:      OrganizationState,
  pub created_at: DateTime<Utc>,
}

impl Organization {
  pub fn summary(&self) -> OrganizationSummary {
    OrganizationSummary {
      org_id: self.org_id,
      name:   self.name.clone(),
      title:  self.title.clone(),
    }
  }
}

/// The slice of an organization embedded in a dictized dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSummary {
  pub org_id: Uuid,
  pub name:   String,
  pub title:  String,
}

/// Input to [`crate::store::CatalogStore::create_organization`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrganization {
  pub name:  String,
  #[serde(default)]
  pub title: Option<String>,
}

impl NewOrganization {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), title: None }
  }

  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_name(&mut errors, "name", &self.name);
    errors.into_result()
  }

  pub fn resolved_title(&self) -> String {
    self
      .title
      .clone()
      .filter(|t| !t.trim().is_empty())
      .unwrap_or_else(|| self.name.clone())
  }
}

/// A user's single capacity within one organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
  pub user_id:  Uuid,
  pub org_id:   Uuid,
  pub capacity: Capacity,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use super::*;

  #[test]
  fn capacities_are_ordered() {
    assert!(Capacity::Member < Capacity::Editor);
    assert!(Capacity::Editor < Capacity::Admin);
    assert!(!Capacity::Member.can_edit());
    assert!(Capacity::Editor.can_edit());
    assert!(Capacity::Admin.can_edit());
  }

  #[test]
  fn capacity_string_forms() {
    assert_eq!(Capacity::Editor.as_ref(), "editor");
    assert_eq!(Capacity::from_str("admin").unwrap(), Capacity::Admin);
    assert!(Capacity::from_str("owner").is_err());
  }
}
