//! Tests for `SqliteIndex` against an in-memory database.

use std::{
  collections::HashMap,
  sync::atomic::{AtomicUsize, Ordering},
};

use chrono::{Duration, Utc};
use folio_core::{
  actor::Actor,
  dataset::{Dataset, DatasetDict, DatasetState, Resource},
  organization::{Capacity, OrganizationSummary},
  search::{
    FacetField, Filter, IndexDocument, IndexError, IndexOutcome, SearchConfig,
    SearchIndex, SearchRequest, SortOrder,
  },
  user::User,
  visibility::{self, SearchScope},
};
use uuid::Uuid;

use crate::{SqliteIndex, index::retry_once};

async fn index() -> SqliteIndex {
  SqliteIndex::open_in_memory().await.expect("in-memory index")
}

fn dict(name: &str, title: &str) -> DatasetDict {
  let now = Utc::now();
  DatasetDict {
    dataset:      Dataset {
      dataset_id:        Uuid::new_v4(),
      name:              name.into(),
      title:             title.into(),
      notes:             None,
      owner_org:         None,
      private:           false,
      state:             DatasetState::Active,
      creator_user_id:   None,
      tags:              vec![],
      metadata_created:  now,
      metadata_modified: now,
    },
    organization: None,
    resources:    vec![],
  }
}

fn resource(dict: &DatasetDict, url: &str, format: &str) -> Resource {
  Resource {
    resource_id: Uuid::new_v4(),
    dataset_id:  dict.dataset.dataset_id,
    url:         url.into(),
    name:        None,
    description: None,
    format:      Some(format.into()),
    position:    dict.resources.len() as u32,
    created_at:  Utc::now(),
  }
}

fn org(name: &str) -> OrganizationSummary {
  OrganizationSummary {
    org_id: Uuid::new_v4(),
    name:   name.into(),
    title:  name.into(),
  }
}

fn actor(memberships: &[(Uuid, Capacity)]) -> Actor {
  let user = User {
    user_id:      Uuid::new_v4(),
    name:         "tester".into(),
    display_name: "Tester".into(),
    sysadmin:     false,
    created_at:   Utc::now(),
  };
  Actor::user(user, memberships.iter().copied().collect::<HashMap<_, _>>())
}

fn everyone() -> SearchScope {
  SearchScope { labels: None, include_private: true, include_drafts: false }
}

async fn add(index: &SqliteIndex, dict: &DatasetDict) -> IndexOutcome {
  index.index(IndexDocument::from_dict(dict)).await.unwrap()
}

async fn names(
  index: &SqliteIndex,
  scope: &SearchScope,
  request: &SearchRequest,
) -> Vec<String> {
  index
    .query(scope, request, &SearchConfig::default())
    .await
    .unwrap()
    .results
    .into_iter()
    .map(|d| d.dataset.name)
    .collect()
}

// ─── Indexing ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn indexing_is_idempotent() {
  let idx = index().await;
  let mut d = dict("warandpeace", "War and Peace");

  assert_eq!(add(&idx, &d).await, IndexOutcome::Inserted);
  assert_eq!(add(&idx, &d).await, IndexOutcome::Unchanged);
  assert_eq!(idx.count().await.unwrap(), 1);

  d.dataset.title = "War & Peace".into();
  assert_eq!(add(&idx, &d).await, IndexOutcome::Updated);
  assert_eq!(idx.count().await.unwrap(), 1);

  let found = names(&idx, &everyone(), &SearchRequest::text("peace")).await;
  assert_eq!(found, vec!["warandpeace"]);
}

#[tokio::test]
async fn unindex_removes_only_once() {
  let idx = index().await;
  let d = dict("annakarenina", "Anna Karenina");
  add(&idx, &d).await;

  assert!(idx.unindex(d.dataset.dataset_id).await.unwrap());
  assert!(!idx.unindex(d.dataset.dataset_id).await.unwrap());
  assert!(idx.indexed_ids().await.unwrap().is_empty());
  let found = names(&idx, &everyone(), &SearchRequest::text("anna")).await;
  assert!(found.is_empty());
}

#[tokio::test]
async fn clear_reports_removed_documents() {
  let idx = index().await;
  let a = dict("a-dataset", "A");
  let b = dict("b-dataset", "B");
  add(&idx, &a).await;
  add(&idx, &b).await;

  let mut expected = vec![a.dataset.dataset_id, b.dataset.dataset_id];
  expected.sort();
  let mut ids = idx.indexed_ids().await.unwrap();
  ids.sort();
  assert_eq!(ids, expected);

  assert_eq!(idx.clear().await.unwrap(), 2);
  assert_eq!(idx.count().await.unwrap(), 0);
  assert_eq!(idx.clear().await.unwrap(), 0);
}

// ─── Visibility ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn private_datasets_need_membership() {
  let idx = index().await;
  let owner = org("david");
  let mut d = dict("private-dataset", "Private Dataset");
  d.dataset.owner_org = Some(owner.org_id);
  d.dataset.private = true;
  d.organization = Some(owner.clone());
  add(&idx, &d).await;

  let request = SearchRequest::text("private");
  let config = SearchConfig::default();

  let outsider = visibility::scope(&actor(&[]), &request, &config);
  let results = idx.query(&outsider, &request, &config).await.unwrap();
  assert_eq!(results.count, 0);

  let member = actor(&[(owner.org_id, Capacity::Member)]);
  let member_scope = visibility::scope(&member, &request, &config);
  let results = idx.query(&member_scope, &request, &config).await.unwrap();
  assert_eq!(results.count, 1);

  let anon = visibility::scope(&Actor::Anonymous, &request, &config);
  assert!(names(&idx, &anon, &request).await.is_empty());
}

#[tokio::test]
async fn include_private_false_hides_private() {
  let idx = index().await;
  let owner = org("david");
  let mut d = dict("hidden", "Hidden");
  d.dataset.owner_org = Some(owner.org_id);
  d.dataset.private = true;
  add(&idx, &d).await;

  let scope = SearchScope { include_private: false, ..everyone() };
  assert!(names(&idx, &scope, &SearchRequest::default()).await.is_empty());
}

#[tokio::test]
async fn drafts_only_when_requested() {
  let idx = index().await;
  let me = actor(&[]);
  let mut d = dict("my-draft", "My Draft");
  d.dataset.state = DatasetState::Draft;
  d.dataset.creator_user_id = me.user_id();
  add(&idx, &d).await;

  let config = SearchConfig::default();
  let plain = SearchRequest::default();
  let plain_scope = visibility::scope(&me, &plain, &config);
  assert!(names(&idx, &plain_scope, &plain).await.is_empty());

  let drafts = SearchRequest { include_drafts: true, ..SearchRequest::default() };
  let drafts_scope = visibility::scope(&me, &drafts, &config);
  assert_eq!(names(&idx, &drafts_scope, &drafts).await, vec!["my-draft"]);

  let someone_else = visibility::scope(&actor(&[]), &drafts, &config);
  assert!(names(&idx, &someone_else, &drafts).await.is_empty());
}

// ─── Retries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unavailable_is_retried_exactly_once() {
  let attempts = AtomicUsize::new(0);
  let counter = &attempts;
  let err = retry_once("query", || async move {
    counter.fetch_add(1, Ordering::SeqCst);
    Err::<(), _>(IndexError::Unavailable("database is locked".into()))
  })
  .await
  .unwrap_err();
  assert!(matches!(err, IndexError::Unavailable(_)));
  assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn second_attempt_can_succeed() {
  let attempts = AtomicUsize::new(0);
  let counter = &attempts;
  let value = retry_once("index", || async move {
    match counter.fetch_add(1, Ordering::SeqCst) {
      0 => Err(IndexError::Unavailable("database is locked".into())),
      n => Ok(n),
    }
  })
  .await
  .unwrap();
  assert_eq!(value, 1);
}

#[tokio::test]
async fn permanent_errors_are_not_retried() {
  let attempts = AtomicUsize::new(0);
  let counter = &attempts;
  let err = retry_once("query", || async move {
    counter.fetch_add(1, Ordering::SeqCst);
    Err::<(), _>(IndexError::Backend("no such table".into()))
  })
  .await
  .unwrap_err();
  assert!(!err.is_transient());
  assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_query_is_a_query_error() {
  let idx = index().await;
  add(&idx, &dict("warandpeace", "War and Peace")).await;

  let err = idx
    .query(
      &everyone(),
      &SearchRequest::text("--included"),
      &SearchConfig::default(),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, IndexError::Query(_)));
  assert!(!err.is_transient());
}

#[tokio::test]
async fn fields_negation_and_prefix() {
  let idx = index().await;
  let mut war = dict("warandpeace", "War and Peace");
  war.dataset.tags = vec!["russian".into(), "tolstoy".into()];
  let mut anna = dict("annakarenina", "Anna Karenina");
  anna.dataset.tags = vec!["russian".into()];
  anna.dataset.notes = Some("A novel about a war of hearts".into());
  add(&idx, &war).await;
  add(&idx, &anna).await;

  let scope = everyone();
  let mut found = names(&idx, &scope, &SearchRequest::text("tags:russian")).await;
  found.sort();
  assert_eq!(found, vec!["annakarenina", "warandpeace"]);

  let found = names(&idx, &scope, &SearchRequest::text("russian -tolstoy")).await;
  assert_eq!(found, vec!["annakarenina"]);

  let found = names(&idx, &scope, &SearchRequest::text("title:war")).await;
  assert_eq!(found, vec!["warandpeace"]);

  let found = names(&idx, &scope, &SearchRequest::text("kar*")).await;
  assert_eq!(found, vec!["annakarenina"]);

  let found = names(&idx, &scope, &SearchRequest::text("*:*")).await;
  assert_eq!(found.len(), 2);

  for q in ["-*:*", "NOT *:*", "russian -*:*"] {
    let found = names(&idx, &scope, &SearchRequest::text(q)).await;
    assert!(found.is_empty(), "{q} matched {found:?}");
  }
}

#[tokio::test]
async fn resource_text_is_searchable() {
  let idx = index().await;
  let mut d = dict("census", "Census");
  let mut r = resource(&d, "http://data.example.com/population.csv", "csv");
  r.name = Some("Population table".into());
  d.resources.push(r);
  add(&idx, &d).await;

  let found = names(&idx, &everyone(), &SearchRequest::text("population")).await;
  assert_eq!(found, vec!["census"]);
}

#[tokio::test]
async fn sorting_and_pagination() {
  let idx = index().await;
  let base = Utc::now();
  for (i, (name, title)) in
    [("bravo", "Charlie"), ("alpha", "bravo"), ("charlie", "Alpha")]
      .into_iter()
      .enumerate()
  {
    let mut d = dict(name, title);
    d.dataset.metadata_modified = base + Duration::seconds(i as i64);
    add(&idx, &d).await;
  }
  let scope = everyone();
  let sorted = |sort| SearchRequest { sort, ..SearchRequest::default() };

  assert_eq!(names(&idx, &scope, &sorted(SortOrder::NameAsc)).await, vec![
    "alpha", "bravo", "charlie"
  ]);
  assert_eq!(names(&idx, &scope, &sorted(SortOrder::TitleAsc)).await, vec![
    "charlie", "alpha", "bravo"
  ]);
  assert_eq!(names(&idx, &scope, &sorted(SortOrder::Relevance)).await, vec![
    "charlie", "alpha", "bravo"
  ]);
  assert_eq!(names(&idx, &scope, &sorted(SortOrder::ModifiedAsc)).await, vec![
    "bravo", "alpha", "charlie"
  ]);

  let page = SearchRequest {
    sort: SortOrder::NameDesc,
    rows: Some(1),
    start: 1,
    ..SearchRequest::default()
  };
  let results = idx
    .query(&scope, &page, &SearchConfig::default())
    .await
    .unwrap();
  assert_eq!(results.count, 3);
  assert_eq!(results.results.len(), 1);
  assert_eq!(results.results[0].dataset.name, "bravo");

  let far = SearchRequest { start: usize::MAX, ..SearchRequest::default() };
  let results = idx
    .query(&scope, &far, &SearchConfig::default())
    .await
    .unwrap();
  assert_eq!(results.count, 3);
  assert!(results.results.is_empty());
}

#[tokio::test]
async fn facets_and_filters() {
  let idx = index().await;
  let owner = org("national-statistics");

  let mut a = dict("census", "Census");
  a.dataset.tags = vec!["people".into(), "economy".into()];
  a.organization = Some(owner.clone());
  a.dataset.owner_org = Some(owner.org_id);
  let r = resource(&a, "http://example.com/a.csv", "csv");
  a.resources.push(r);

  let mut b = dict("budget", "Budget");
  b.dataset.tags = vec!["economy".into()];
  let r = resource(&b, "http://example.com/b.json", " json ");
  b.resources.push(r);

  add(&idx, &a).await;
  add(&idx, &b).await;

  let request = SearchRequest {
    facet_fields: vec![FacetField::Tags, FacetField::ResFormat],
    ..SearchRequest::default()
  };
  let results = idx
    .query(&everyone(), &request, &SearchConfig::default())
    .await
    .unwrap();
  let tags = &results.facets["tags"];
  assert_eq!(tags[0].value, "economy");
  assert_eq!(tags[0].count, 2);
  assert_eq!(tags[1].value, "people");
  let formats: Vec<&str> = results.facets["res_format"]
    .iter()
    .map(|f| f.value.as_str())
    .collect();
  assert_eq!(formats, vec!["CSV", "JSON"]);

  let filtered = SearchRequest {
    filters: vec![Filter { field: FacetField::ResFormat, value: "json".into() }],
    ..SearchRequest::default()
  };
  assert_eq!(names(&idx, &everyone(), &filtered).await, vec!["budget"]);

  let by_org = SearchRequest {
    filters: vec![Filter {
      field: FacetField::Organization,
      value: "national-statistics".into(),
    }],
    ..SearchRequest::default()
  };
  assert_eq!(names(&idx, &everyone(), &by_org).await, vec!["census"]);
}
