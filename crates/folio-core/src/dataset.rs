//! Datasets (packages), their resources, and resource views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  organization::OrganizationSummary,
  validation::{
    ValidationErrors, check_name, check_required, check_tags,
  },
};

// ─── State ───────────────────────────────────────────────────────────────────

/// Lifecycle of a dataset.
///
/// `Draft` datasets are mid-creation and never discoverable through the
/// default search. `Deleted` datasets are soft-deleted: hidden from every
/// listing, but still retrievable by id for sysadmins.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DatasetState {
  #[default]
  Draft,
  Active,
  Deleted,
}

// ─── Dataset ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
  pub dataset_id:        Uuid,
  /// URL-safe, unique among non-deleted datasets; may change over time.
  pub name:              String,
  pub title:             String,
  pub notes:             Option<String>,
  pub owner_org:         Option<Uuid>,
  pub private:           bool,
  pub state:             DatasetState,
  /// `None` when created by the system rather than a user.
  pub creator_user_id:   Option<Uuid>,
  pub tags:              Vec<String>,
  pub metadata_created:  DateTime<Utc>,
  pub metadata_modified: DateTime<Utc>,
}

impl Dataset {
  pub fn is_active(&self) -> bool { self.state == DatasetState::Active }
}

/// Input to [`crate::store::CatalogStore::create_dataset`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDataset {
  #[serde(default)]
  pub name:      String,
  #[serde(default)]
  pub title:     Option<String>,
  #[serde(default)]
  pub notes:     Option<String>,
  #[serde(default)]
  pub owner_org: Option<Uuid>,
  #[serde(default)]
  pub private:   bool,
  #[serde(default)]
  pub tags:      Vec<String>,
  /// Datasets start as drafts unless the caller creates them fully formed.
  #[serde(default)]
  pub state:     DatasetState,
}

impl NewDataset {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Self::default() }
  }

  /// Field rules that need no store access.
  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_name(&mut errors, "name", &self.name);
    check_tags(&mut errors, &self.tags);
    if self.state == DatasetState::Deleted {
      errors.add("state", "A dataset cannot be created deleted");
    }
    if self.private && self.owner_org.is_none() {
      errors.add("private", "Private datasets must belong to an organization");
    }
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

/// Partial update of a dataset. `None` leaves a field untouched;
/// `owner_org: Some(None)` removes the owning organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DatasetPatch {
  #[serde(default)]
  pub name:      Option<String>,
  #[serde(default)]
  pub title:     Option<String>,
  #[serde(default, deserialize_with = "present")]
  pub notes:     Option<Option<String>>,
  #[serde(default, deserialize_with = "present")]
  pub owner_org: Option<Option<Uuid>>,
  #[serde(default)]
  pub private:   Option<bool>,
  #[serde(default)]
  pub tags:      Option<Vec<String>>,
}

impl DatasetPatch {
  pub fn is_empty(&self) -> bool { self == &Self::default() }

  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if let Some(name) = &self.name {
      check_name(&mut errors, "name", name);
    }
    if let Some(tags) = &self.tags {
      check_tags(&mut errors, tags);
    }
    errors.into_result()
  }

  /// Apply the patch to an in-memory copy; the store persists the result.
  pub fn apply_to(&self, dataset: &mut Dataset) {
    if let Some(name) = &self.name {
      dataset.name = name.clone();
    }
    if let Some(title) = &self.title {
      dataset.title = title.clone();
    }
    if let Some(notes) = &self.notes {
      dataset.notes = notes.clone();
    }
    if let Some(owner_org) = self.owner_org {
      dataset.owner_org = owner_org;
    }
    if let Some(private) = self.private {
      dataset.private = private;
    }
    if let Some(tags) = &self.tags {
      dataset.tags = tags.clone();
    }
  }
}

/// Distinguishes an explicit JSON `null` from an absent key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

// ─── Resource ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
  pub resource_id: Uuid,
  pub dataset_id:  Uuid,
  pub url:         String,
  pub name:        Option<String>,
  pub description: Option<String>,
  pub format:      Option<String>,
  /// Zero-based order within the parent dataset.
  pub position:    u32,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewResource {
  #[serde(default)]
  pub url:         String,
  #[serde(default)]
  pub name:        Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub format:      Option<String>,
}

impl NewResource {
  pub fn new(url: impl Into<String>) -> Self {
    Self { url: url.into(), ..Self::default() }
  }

  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_required(&mut errors, "url", &self.url);
    errors.into_result()
  }

  /// An entirely blank submission, as sent by a form saved with no input.
  pub fn is_blank(&self) -> bool {
    self.url.trim().is_empty()
      && [&self.name, &self.description, &self.format]
        .iter()
        .all(|f| f.as_deref().is_none_or(|s| s.trim().is_empty()))
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResourcePatch {
  #[serde(default)]
  pub url:         Option<String>,
  #[serde(default)]
  pub name:        Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub format:      Option<String>,
}

impl ResourcePatch {
  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if let Some(url) = &self.url {
      check_required(&mut errors, "url", url);
    }
    errors.into_result()
  }

  pub fn apply_to(&self, resource: &mut Resource) {
    if let Some(url) = &self.url {
      resource.url = url.clone();
    }
    if let Some(name) = &self.name {
      resource.name = Some(name.clone());
    }
    if let Some(description) = &self.description {
      resource.description = Some(description.clone());
    }
    if let Some(format) = &self.format {
      resource.format = Some(format.clone());
    }
  }
}

// ─── Resource views ──────────────────────────────────────────────────────────

/// A named presentation of a resource (image preview, table, map...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceView {
  pub view_id:     Uuid,
  pub resource_id: Uuid,
  pub view_type:   String,
  pub title:       String,
  pub description: Option<String>,
  pub position:    u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewResourceView {
  #[serde(default)]
  pub view_type:   String,
  #[serde(default)]
  pub title:       String,
  #[serde(default)]
  pub description: Option<String>,
}

impl NewResourceView {
  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_required(&mut errors, "view_type", &self.view_type);
    check_required(&mut errors, "title", &self.title);
    errors.into_result()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResourceViewPatch {
  #[serde(default)]
  pub title:       Option<String>,
  #[serde(default, deserialize_with = "present")]
  pub description: Option<Option<String>>,
}

impl ResourceViewPatch {
  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if let Some(title) = &self.title {
      check_required(&mut errors, "title", title);
    }
    errors.into_result()
  }

  pub fn apply_to(&self, view: &mut ResourceView) {
    if let Some(title) = &self.title {
      view.title = title.clone();
    }
    if let Some(description) = &self.description {
      view.description = description.clone();
    }
  }
}

// ─── Dictized form ───────────────────────────────────────────────────────────

/// The full structured state of a dataset: its own fields, its owning
/// organization, and its resources in order.
///
/// This is the snapshot stored in activities and the source of search
/// documents. It is always derived from the store, never stored as a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDict {
  #[serde(flatten)]
  pub dataset:      Dataset,
  pub organization: Option<OrganizationSummary>,
  pub resources:    Vec<Resource>,
}
