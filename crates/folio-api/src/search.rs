//! Handler for `GET /search`.
//!
//! `fq` takes comma-separated `field:value` filters, e.g.
//! `fq=tags:economy,res_format:CSV`; `facet.field` takes comma-separated
//! field names. A malformed `q` is not an error: the 200 response carries
//! an `error` message instead of results.

use std::str::FromStr;

use axum::{
  Json,
  extract::{Query, State},
};
use folio_core::{
  search::{FacetField, Filter, SearchIndex, SearchRequest, SearchResults, SortOrder},
  store::CatalogStore,
};
use serde::Deserialize;

use crate::{AppState, auth::CurrentActor, error::ApiError};

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
  pub q:               Option<String>,
  pub fq:              Option<String>,
  #[serde(rename = "facet.field")]
  pub facet_field:     Option<String>,
  /// E.g. `metadata_modified desc`.
  pub sort:            Option<String>,
  pub rows:            Option<usize>,
  pub start:           Option<usize>,
  pub include_private: Option<bool>,
  pub include_drafts:  Option<bool>,
}

fn facet_field(name: &str) -> Result<FacetField, ApiError> {
  FacetField::from_str(name.trim())
    .map_err(|_| ApiError::BadRequest(format!("unknown facet field {name:?}")))
}

fn parse_filters(fq: &str) -> Result<Vec<Filter>, ApiError> {
  fq.split(',')
    .map(str::trim)
    .filter(|clause| !clause.is_empty())
    .map(|clause| {
      let (field, value) = clause
        .split_once(':')
        .ok_or_else(|| ApiError::BadRequest(format!("malformed filter {clause:?}")))?;
      Ok(Filter {
        field: facet_field(field)?,
        value: value.trim().trim_matches('"').to_owned(),
      })
    })
    .collect()
}

impl SearchParams {
  pub fn into_request(self) -> Result<SearchRequest, ApiError> {
    let sort = match self.sort.as_deref() {
      Some(sort) => SortOrder::parse(sort).map_err(folio_catalog::Error::from)?,
      None => SortOrder::default(),
    };
    let filters = match self.fq.as_deref() {
      Some(fq) => parse_filters(fq)?,
      None => Vec::new(),
    };
    let facet_fields = match self.facet_field.as_deref() {
      Some(fields) => fields
        .split(',')
        .filter(|f| !f.trim().is_empty())
        .map(facet_field)
        .collect::<Result<_, _>>()?,
      None => Vec::new(),
    };

    Ok(SearchRequest {
      q: self.q,
      filters,
      facet_fields,
      sort,
      rows: self.rows,
      start: self.start.unwrap_or(0),
      include_private: self.include_private,
      include_drafts: self.include_drafts.unwrap_or(false),
    })
  }
}

/// `GET /search[?q=...][&fq=...][&facet.field=...][&sort=...][&rows=...][&start=...]`
pub async fn handler<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  let request = params.into_request()?;
  Ok(Json(state.catalog.search(&actor, request).await?))
}
