//! End-to-end requests through the router against in-memory backends.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{HeaderMap, Method, Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use folio_catalog::Catalog;
use folio_core::{store::CatalogStore, user::NewUser};
use folio_search::SqliteIndex;
use folio_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, auth::hash_password, router};

type TestState = AppState<SqliteStore, SqliteIndex>;

async fn state() -> TestState {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let index = SqliteIndex::open_in_memory().await.unwrap();
  AppState { catalog: Catalog::new(Arc::new(store), Arc::new(index)) }
}

/// Create a user with password `secret` and return their credentials.
async fn user(state: &TestState, name: &str, sysadmin: bool) -> String {
  let input = NewUser {
    sysadmin,
    password_hash: Some(hash_password("secret").unwrap()),
    ..NewUser::new(name)
  };
  state.catalog.store().create_user(input).await.unwrap();
  basic(name, "secret")
}

fn basic(name: &str, password: &str) -> String {
  format!("Basic {}", B64.encode(format!("{name}:{password}")))
}

struct Reply {
  status:  StatusCode,
  headers: HeaderMap,
  body:    Value,
}

async fn send(
  state: &TestState,
  method: Method,
  uri: &str,
  auth: Option<&str>,
  body: Option<Value>,
) -> Reply {
  let mut req = Request::builder().method(method).uri(uri);
  if let Some(auth) = auth {
    req = req.header(header::AUTHORIZATION, auth);
  }
  let req = match body {
    Some(body) => req
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => req.body(Body::empty()).unwrap(),
  };

  let resp = router(state.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let headers = resp.headers().clone();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let body = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  Reply { status, headers, body }
}

/// `owner` administers `o1`, which owns the private, active dataset `d1`.
async fn seeded(state: &TestState) -> (String, Value) {
  let owner = user(state, "owner", false).await;
  let org = send(state, Method::POST, "/organizations", Some(&owner), Some(json!({ "name": "o1" }))).await;
  assert_eq!(org.status, StatusCode::CREATED);

  let created = send(
    state,
    Method::POST,
    "/datasets",
    Some(&owner),
    Some(json!({
      "name": "d1",
      "title": "Private rainfall",
      "owner_org": org.body["org_id"],
      "private": true,
      "state": "active",
    })),
  )
  .await;
  assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
  (owner, created.body)
}

// ─── Authentication ──────────────────────────────────────────────────────────

#[tokio::test]
async fn bad_credentials_are_rejected_not_downgraded() {
  let state = state().await;
  user(&state, "alice", false).await;

  let wrong = send(&state, Method::GET, "/search", Some(&basic("alice", "nope")), None).await;
  assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
  assert!(wrong.headers.contains_key(header::WWW_AUTHENTICATE));

  let unknown = send(&state, Method::GET, "/search", Some(&basic("mallory", "secret")), None).await;
  assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);

  let anonymous = send(&state, Method::GET, "/search", None, None).await;
  assert_eq!(anonymous.status, StatusCode::OK);
}

#[tokio::test]
async fn registration_and_whoami() {
  let state = state().await;

  let created = send(
    &state,
    Method::POST,
    "/users",
    None,
    Some(json!({ "name": "bob", "password": "hunter2" })),
  )
  .await;
  assert_eq!(created.status, StatusCode::CREATED);

  let me = send(&state, Method::GET, "/users/me", Some(&basic("bob", "hunter2")), None).await;
  assert_eq!(me.status, StatusCode::OK);
  assert_eq!(me.body["name"], "bob");

  let anonymous = send(&state, Method::GET, "/users/me", None, None).await;
  assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

  let escalate = send(
    &state,
    Method::POST,
    "/users",
    None,
    Some(json!({ "name": "eve", "password": "x", "sysadmin": true })),
  )
  .await;
  assert_eq!(escalate.status, StatusCode::FORBIDDEN);

  let nopass = send(&state, Method::POST, "/users", None, Some(json!({ "name": "carol" }))).await;
  assert_eq!(nopass.status, StatusCode::BAD_REQUEST);
  assert!(nopass.body["fields"]["password"].is_array());
}

// ─── Visibility and authorization ────────────────────────────────────────────

#[tokio::test]
async fn private_datasets_are_hidden_from_outsiders() {
  let state = state().await;
  let (owner, _) = seeded(&state).await;
  let outsider = user(&state, "u1", false).await;

  for auth in [None, Some(outsider.as_str())] {
    let read = send(&state, Method::GET, "/datasets/d1", auth, None).await;
    assert_eq!(read.status, StatusCode::NOT_FOUND);
    let found = send(&state, Method::GET, "/search?q=rainfall", auth, None).await;
    assert_eq!(found.body["count"], 0);
  }

  let read = send(&state, Method::GET, "/datasets/d1", Some(&owner), None).await;
  assert_eq!(read.status, StatusCode::OK);
  assert_eq!(read.body["dataset"]["title"], "Private rainfall");
  let found = send(&state, Method::GET, "/search?q=rainfall", Some(&owner), None).await;
  assert_eq!(found.body["count"], 1);
}

#[tokio::test]
async fn members_read_but_cannot_modify() {
  let state = state().await;
  let (owner, dataset) = seeded(&state).await;
  let member = user(&state, "m1", false).await;
  let me = send(&state, Method::GET, "/users/me", Some(&member), None).await;

  let uri = format!("/organizations/o1/members/{}", me.body["user_id"].as_str().unwrap());
  let joined = send(&state, Method::PUT, &uri, Some(&owner), Some(json!({ "capacity": "member" }))).await;
  assert_eq!(joined.status, StatusCode::OK);
  assert_eq!(joined.body["capacity"], "member");

  let read = send(&state, Method::GET, "/datasets/d1", Some(&member), None).await;
  assert_eq!(read.status, StatusCode::OK);

  let patch = send(&state, Method::PATCH, "/datasets/d1", Some(&member), Some(json!({ "title": "Mine" }))).await;
  assert_eq!(patch.status, StatusCode::FORBIDDEN);

  // Anonymous callers cannot even learn that the dataset exists.
  let delete = send(&state, Method::DELETE, "/datasets/d1", None, None).await;
  assert_eq!(delete.status, StatusCode::NOT_FOUND);

  let by_id = format!("/datasets/{}", dataset["dataset_id"].as_str().unwrap());
  let read = send(&state, Method::GET, &by_id, Some(&owner), None).await;
  assert_eq!(read.status, StatusCode::OK);
  assert_eq!(read.body["redirect_to"], "d1");
  assert_eq!(read.headers[header::CONTENT_LOCATION], "/datasets/d1");
}

// ─── Validation and search errors ────────────────────────────────────────────

#[tokio::test]
async fn validation_errors_are_reported_per_field() {
  let state = state().await;
  let alice = user(&state, "alice", false).await;

  let bad = send(&state, Method::POST, "/datasets", Some(&alice), Some(json!({ "name": "A" }))).await;
  assert_eq!(bad.status, StatusCode::BAD_REQUEST);
  assert!(bad.body["fields"]["name"].is_array(), "{}", bad.body);

  send(&state, Method::POST, "/datasets", Some(&alice), Some(json!({ "name": "taken" }))).await;
  let dup = send(&state, Method::POST, "/datasets", Some(&alice), Some(json!({ "name": "taken" }))).await;
  assert_eq!(dup.status, StatusCode::BAD_REQUEST);
  assert_eq!(dup.body["fields"]["name"][0], folio_catalog::error::NAME_TAKEN);
}

#[tokio::test]
async fn search_errors_are_distinguished() {
  let state = state().await;

  let malformed = send(&state, Method::GET, "/search?q=--included", None, None).await;
  assert_eq!(malformed.status, StatusCode::OK);
  assert_eq!(
    malformed.body["error"],
    folio_core::search::SEARCH_ERROR_MESSAGE
  );

  let sort = send(&state, Method::GET, "/search?sort=popularity%20desc", None, None).await;
  assert_eq!(sort.status, StatusCode::BAD_REQUEST);
  assert!(sort.body["fields"]["sort"].is_array());

  let facet = send(&state, Method::GET, "/search?facet.field=author", None, None).await;
  assert_eq!(facet.status, StatusCode::BAD_REQUEST);
}

// ─── Workflow ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn draft_resource_activate_and_history() {
  let state = state().await;
  let alice = user(&state, "alice", false).await;

  let draft = send(&state, Method::POST, "/datasets", Some(&alice), Some(json!({ "name": "flows", "title": "River flows" }))).await;
  assert_eq!(draft.status, StatusCode::CREATED);
  assert_eq!(draft.body["state"], "draft");

  let early = send(&state, Method::POST, "/datasets/flows/activate", Some(&alice), None).await;
  assert_eq!(early.status, StatusCode::BAD_REQUEST);

  let resource = send(
    &state,
    Method::POST,
    "/datasets/flows/resources",
    Some(&alice),
    Some(json!({ "url": "https://example.org/flows.csv", "format": "CSV" })),
  )
  .await;
  assert_eq!(resource.status, StatusCode::CREATED);
  let resource_uri = format!("/resources/{}", resource.body["resource_id"].as_str().unwrap());

  let view = send(
    &state,
    Method::POST,
    &format!("{resource_uri}/views"),
    Some(&alice),
    Some(json!({ "view_type": "table", "title": "Table" })),
  )
  .await;
  assert_eq!(view.status, StatusCode::CREATED);
  let view_uri = format!("/views/{}", view.body["view_id"].as_str().unwrap());
  assert_eq!(send(&state, Method::DELETE, &view_uri, Some(&alice), None).await.status, StatusCode::NO_CONTENT);
  assert_eq!(send(&state, Method::GET, &view_uri, Some(&alice), None).await.status, StatusCode::NOT_FOUND);

  let active = send(&state, Method::POST, "/datasets/flows/activate", Some(&alice), None).await;
  assert_eq!(active.status, StatusCode::OK);
  assert_eq!(active.body["state"], "active");

  let found = send(&state, Method::GET, "/search?fq=res_format:csv&facet.field=res_format", None, None).await;
  assert_eq!(found.body["count"], 1);
  assert_eq!(found.body["facets"]["res_format"][0]["value"], "CSV");

  let renamed = send(&state, Method::PATCH, "/datasets/flows", Some(&alice), Some(json!({ "title": "Stream flows" }))).await;
  assert_eq!(renamed.status, StatusCode::OK);

  let stream = send(&state, Method::GET, "/datasets/flows/activity", Some(&alice), None).await;
  assert_eq!(stream.status, StatusCode::OK);
  assert_eq!(stream.body["can_view_versions"], true);
  let latest = stream.body["activities"][0]["activity_id"].as_str().unwrap().to_owned();

  let changes = send(&state, Method::GET, &format!("/activity/{latest}/changes"), Some(&alice), None).await;
  assert_eq!(changes.status, StatusCode::OK);
  assert_eq!(changes.body["changes"]["title"]["change"], "changed");
  assert_eq!(changes.body["changes"]["title"]["to"], "Stream flows");

  // Anyone may read the stream of a public dataset, but not its versions.
  let public = send(&state, Method::GET, "/datasets/flows/activity", None, None).await;
  assert_eq!(public.body["can_view_versions"], false);
  let snapshot = send(&state, Method::GET, &format!("/datasets/flows/activity/{latest}"), None, None).await;
  assert_eq!(snapshot.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn follow_twice_is_a_validation_error() {
  let state = state().await;
  let (owner, _) = seeded(&state).await;

  assert_eq!(send(&state, Method::PUT, "/datasets/d1/follow", Some(&owner), None).await.status, StatusCode::NO_CONTENT);
  assert_eq!(send(&state, Method::PUT, "/datasets/d1/follow", Some(&owner), None).await.status, StatusCode::BAD_REQUEST);
  assert_eq!(send(&state, Method::DELETE, "/datasets/d1/follow", Some(&owner), None).await.status, StatusCode::NO_CONTENT);
  assert_eq!(send(&state, Method::DELETE, "/datasets/d1/follow", Some(&owner), None).await.status, StatusCode::NOT_FOUND);

  let followers = send(&state, Method::GET, "/datasets/d1/followers", Some(&owner), None).await;
  assert_eq!(followers.status, StatusCode::FORBIDDEN);
  let admin = user(&state, "root", true).await;
  let followers = send(&state, Method::GET, "/datasets/d1/followers", Some(&admin), None).await;
  assert_eq!(followers.status, StatusCode::OK);
}
