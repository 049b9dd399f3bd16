//! The search index abstraction and its query model.
//!
//! The index is treated as an opaque engine: callers hand it documents
//! derived from [`DatasetDict`]s and query it under a mandatory
//! [`SearchScope`]. Backends live in their own crates (`folio-search`).

use std::{collections::BTreeMap, future::Future, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  dataset::{DatasetDict, DatasetState},
  visibility::{SearchScope, dataset_labels},
};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SearchConfig {
  /// Whether private datasets the actor may see are included by default.
  #[serde(default = "default_include_private")]
  pub default_include_private: bool,
  #[serde(default = "default_rows")]
  pub default_rows:            usize,
  #[serde(default = "max_rows")]
  pub max_rows:                usize,
}

fn default_include_private() -> bool { true }
fn default_rows() -> usize { 20 }
fn max_rows() -> usize { 1000 }

impl Default for SearchConfig {
  fn default() -> Self {
    Self {
      default_include_private: default_include_private(),
      default_rows:            default_rows(),
      max_rows:                max_rows(),
    }
  }
}

// ─── Sorting ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
  /// Best match first, most recently modified among equals.
  #[default]
  Relevance,
  NameAsc,
  NameDesc,
  TitleAsc,
  TitleDesc,
  ModifiedAsc,
  ModifiedDesc,
}

impl SortOrder {
  /// Parse a sort expression such as `"name asc"` or
  /// `"score desc, metadata_modified desc"`. Only the leading clause
  /// decides the order; a blank expression yields the default.
  pub fn parse(input: &str) -> crate::Result<Self> {
    let invalid = || crate::Error::InvalidSort(input.to_owned());

    let Some(clause) = input.split(',').map(str::trim).find(|c| !c.is_empty())
    else {
      return Ok(Self::default());
    };

    let mut parts = clause.split_whitespace();
    let field = parts.next().ok_or_else(invalid)?;
    let descending = match parts.next() {
      None | Some("asc") => false,
      Some("desc") => true,
      Some(_) => return Err(invalid()),
    };
    if parts.next().is_some() {
      return Err(invalid());
    }

    Ok(match (field, descending) {
      ("score", true) => SortOrder::Relevance,
      ("name", false) => SortOrder::NameAsc,
      ("name", true) => SortOrder::NameDesc,
      ("title_string" | "title", false) => SortOrder::TitleAsc,
      ("title_string" | "title", true) => SortOrder::TitleDesc,
      ("metadata_modified", false) => SortOrder::ModifiedAsc,
      ("metadata_modified", true) => SortOrder::ModifiedDesc,
      _ => return Err(invalid()),
    })
  }
}

impl FromStr for SortOrder {
  type Err = crate::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

// ─── Facets and filters ──────────────────────────────────────────────────────

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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FacetField {
  Tags,
  /// Owning organization, by name.
  Organization,
  ResFormat,
}

/// An exact-match restriction on a facet field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
  pub field: FacetField,
  pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
  pub value: String,
  pub count: usize,
}

// ─── Request / results ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
  /// Query text; `None`, blank, or `*:*` match everything.
  pub q:               Option<String>,
  pub filters:         Vec<Filter>,
  pub facet_fields:    Vec<FacetField>,
  pub sort:            SortOrder,
  /// Page size; `None` uses the configured default.
  pub rows:            Option<usize>,
  pub start:           usize,
  /// Overrides [`SearchConfig::default_include_private`].
  pub include_private: Option<bool>,
  pub include_drafts:  bool,
}

impl SearchRequest {
  pub fn text(q: impl Into<String>) -> Self {
    Self { q: Some(q.into()), ..Self::default() }
  }

  /// The effective page size under `config`.
  pub fn page_size(&self, config: &SearchConfig) -> usize {
    self.rows.unwrap_or(config.default_rows).min(config.max_rows)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
  /// Total matches before pagination.
  pub count:   usize,
  pub results: Vec<DatasetDict>,
  /// Counts per requested facet field, most frequent first.
  pub facets:  BTreeMap<String, Vec<FacetCount>>,
  /// Set instead of failing when the query text could not be parsed.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error:   Option<String>,
}

/// Shown to users in place of results when the query text is malformed.
pub const SEARCH_ERROR_MESSAGE: &str = "error while searching";

impl SearchResults {
  pub fn query_error() -> Self {
    Self { error: Some(SEARCH_ERROR_MESSAGE.to_owned()), ..Self::default() }
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// The flattened, indexable form of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDocument {
  pub dataset_id:        Uuid,
  pub name:              String,
  pub title:             String,
  pub notes:             String,
  pub tags:              Vec<String>,
  /// Resource names, descriptions and URLs, for full-text matching.
  pub res_text:          String,
  pub res_formats:       Vec<String>,
  pub organization:      Option<String>,
  pub labels:            Vec<String>,
  pub private:           bool,
  pub state:             DatasetState,
  pub metadata_modified: DateTime<Utc>,
  /// Returned verbatim in search results.
  pub dict:              DatasetDict,
}

impl IndexDocument {
  pub fn from_dict(dict: &DatasetDict) -> Self {
    let d = &dict.dataset;
    let res_text = dict
      .resources
      .iter()
      .flat_map(|r| {
        [r.name.as_deref(), r.description.as_deref(), Some(r.url.as_str())]
      })
      .flatten()
      .collect::<Vec<_>>()
      .join(" ");
    let mut res_formats: Vec<String> = dict
      .resources
      .iter()
      .filter_map(|r| r.format.as_deref())
      .map(|f| f.trim().to_uppercase())
      .filter(|f| !f.is_empty())
      .collect();
    res_formats.sort();
    res_formats.dedup();

    Self {
      dataset_id: d.dataset_id,
      name: d.name.clone(),
      title: d.title.clone(),
      notes: d.notes.clone().unwrap_or_default(),
      tags: d.tags.clone(),
      res_text,
      res_formats,
      organization: dict.organization.as_ref().map(|o| o.name.clone()),
      labels: dataset_labels(d).into_iter().collect(),
      private: d.private,
      state: d.state,
      metadata_modified: d.metadata_modified,
      dict: dict.clone(),
    }
  }

  pub fn facet_values(&self, field: FacetField) -> Vec<String> {
    match field {
      FacetField::Tags => self.tags.clone(),
      FacetField::Organization => self.organization.iter().cloned().collect(),
      FacetField::ResFormat => self.res_formats.clone(),
    }
  }
}

/// What [`SearchIndex::index`] did with a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
  Inserted,
  Updated,
  /// The stored document already matched.
  Unchanged,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum IndexError {
  /// The engine could not be reached. Worth one retry.
  #[error("search index unavailable: {0}")]
  Unavailable(String),

  /// The query text could not be parsed.
  #[error("invalid search query: {0}")]
  Query(String),

  #[error("search index error: {0}")]
  Backend(String),
}

impl IndexError {
  pub fn is_transient(&self) -> bool { matches!(self, IndexError::Unavailable(_)) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A full-text index of datasets.
///
/// Deleted datasets are never indexed; callers `unindex` them instead.
pub trait SearchIndex: Send + Sync {
  /// Insert or replace the document for `doc.dataset_id`.
  fn index(
    &self,
    doc: IndexDocument,
  ) -> impl Future<Output = Result<IndexOutcome, IndexError>> + Send + '_;

  /// Remove a document. Returns `false` if it was not indexed.
  fn unindex(
    &self,
    dataset_id: Uuid,
  ) -> impl Future<Output = Result<bool, IndexError>> + Send + '_;

  /// Run `request` restricted to what `scope` permits.
  fn query<'a>(
    &'a self,
    scope: &'a SearchScope,
    request: &'a SearchRequest,
    config: &'a SearchConfig,
  ) -> impl Future<Output = Result<SearchResults, IndexError>> + Send + 'a;

  /// Remove every document. Returns how many were removed.
  fn clear(&self) -> impl Future<Output = Result<usize, IndexError>> + Send + '_;

  fn indexed_ids(
    &self,
  ) -> impl Future<Output = Result<Vec<Uuid>, IndexError>> + Send + '_;

  fn count(&self) -> impl Future<Output = Result<usize, IndexError>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_known_sorts() {
    assert_eq!(SortOrder::parse("").unwrap(), SortOrder::Relevance);
    assert_eq!(
      SortOrder::parse("score desc, metadata_modified desc").unwrap(),
      SortOrder::Relevance
    );
    assert_eq!(SortOrder::parse("name asc").unwrap(), SortOrder::NameAsc);
    assert_eq!(
      SortOrder::parse("title_string desc").unwrap(),
      SortOrder::TitleDesc
    );
    assert_eq!(
      SortOrder::parse("metadata_modified desc").unwrap(),
      SortOrder::ModifiedDesc
    );
  }

  #[test]
  fn rejects_unknown_sorts() {
    assert!(SortOrder::parse("gvgyr_fgevat+nfp").is_err());
    assert!(SortOrder::parse("name sideways").is_err());
    assert!(SortOrder::parse("score asc").is_err());
  }

  #[test]
  fn page_size_is_capped() {
    let config = SearchConfig { max_rows: 50, ..SearchConfig::default() };
    let mut req = SearchRequest::default();
    assert_eq!(req.page_size(&config), 20);
    req.rows = Some(500);
    assert_eq!(req.page_size(&config), 50);
  }
}
