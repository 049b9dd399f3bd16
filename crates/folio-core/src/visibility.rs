//! Which datasets an actor may enumerate.
//!
//! Visibility is expressed as permission labels: every dataset carries one
//! label, every actor carries a set, and a dataset is visible when the two
//! intersect. The same labels are stored in the search index so the scope
//! can be applied as a query predicate.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::{
  actor::Actor,
  authz::{self, Action, AuthPolicy, Target},
  dataset::{Dataset, DatasetState},
  search::{SearchConfig, SearchRequest},
};

pub const PUBLIC_LABEL: &str = "public";

pub fn member_label(org_id: Uuid) -> String { format!("member-{org_id}") }

pub fn editor_label(org_id: Uuid) -> String { format!("editor-{org_id}") }

pub fn creator_label(user_id: Uuid) -> String { format!("creator-{user_id}") }

/// Labels under which `dataset` may be seen.
pub fn dataset_labels(dataset: &Dataset) -> BTreeSet<String> {
  let label = if dataset.state == DatasetState::Active && !dataset.private {
    PUBLIC_LABEL.to_owned()
  } else if let (DatasetState::Draft, Some(org_id)) = (dataset.state, dataset.owner_org) {
    editor_label(org_id)
  } else if let Some(org_id) = dataset.owner_org {
    member_label(org_id)
  } else if let Some(user_id) = dataset.creator_user_id {
    creator_label(user_id)
  } else {
    // System-created, ownerless, non-public: only sysadmins see it.
    return BTreeSet::new();
  };
  BTreeSet::from([label])
}

/// Labels held by `actor`.
pub fn actor_labels(actor: &Actor) -> BTreeSet<String> {
  let mut labels = BTreeSet::from([PUBLIC_LABEL.to_owned()]);
  if let Some(user_id) = actor.user_id() {
    labels.insert(creator_label(user_id));
  }
  labels.extend(actor.memberships().map(|(org_id, _)| member_label(org_id)));
  labels.extend(actor.editable_org_ids().into_iter().map(editor_label));
  labels
}

/// The mandatory restriction wrapped around a listing or search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchScope {
  /// `None` bypasses the label check (sysadmins).
  pub labels:          Option<BTreeSet<String>>,
  pub include_private: bool,
  pub include_drafts:  bool,
}

impl SearchScope {
  /// Whether a dataset with these properties falls inside the scope.
  pub fn permits(
    &self,
    labels: &BTreeSet<String>,
    private: bool,
    state: DatasetState,
  ) -> bool {
    match state {
      DatasetState::Deleted => return false,
      DatasetState::Draft if !self.include_drafts => return false,
      _ => {}
    }
    if private && !self.include_private {
      return false;
    }
    match &self.labels {
      None => true,
      Some(held) => !held.is_disjoint(labels),
    }
  }

  pub fn permits_dataset(&self, dataset: &Dataset) -> bool {
    self.permits(&dataset_labels(dataset), dataset.private, dataset.state)
  }
}

pub fn scope(
  actor: &Actor,
  request: &SearchRequest,
  config: &SearchConfig,
) -> SearchScope {
  SearchScope {
    labels:          (!actor.is_sysadmin()).then(|| actor_labels(actor)),
    include_private: request
      .include_private
      .unwrap_or(config.default_include_private),
    include_drafts:  request.include_drafts,
  }
}

/// Whether `dataset` may appear in an in-memory listing for `actor`, such
/// as an organization's dataset list. Drafts appear only to those the
/// evaluator lets read them.
pub fn can_list(policy: &AuthPolicy, actor: &Actor, dataset: &Dataset) -> bool {
  match dataset.state {
    DatasetState::Deleted => false,
    DatasetState::Draft => authz::evaluate(
      policy,
      actor,
      Action::DatasetRead,
      Target::Dataset(dataset),
    )
    .is_allowed(),
    DatasetState::Active => {
      actor.is_sysadmin()
        || !actor_labels(actor).is_disjoint(&dataset_labels(dataset))
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use chrono::Utc;

  use super::*;
  use crate::{organization::Capacity, user::User};

  fn dataset(owner_org: Option<Uuid>, private: bool) -> Dataset {
    let now = Utc::now();
    Dataset {
      dataset_id: Uuid::new_v4(),
      name: "warandpeace".into(),
      title: "War and Peace".into(),
      notes: None,
      owner_org,
      private,
      state: DatasetState::Active,
      creator_user_id: None,
      tags: vec![],
      metadata_created: now,
      metadata_modified: now,
    }
  }

  fn user(sysadmin: bool, memberships: &[(Uuid, Capacity)]) -> Actor {
    let user = User {
      user_id: Uuid::new_v4(),
      name: "tester".into(),
      display_name: "Tester".into(),
      sysadmin,
      created_at: Utc::now(),
    };
    Actor::user(user, memberships.iter().copied().collect::<HashMap<_, _>>())
  }

  #[test]
  fn labels_follow_privacy_and_state() {
    let org = Uuid::new_v4();
    assert!(dataset_labels(&dataset(Some(org), false)).contains(PUBLIC_LABEL));
    assert!(dataset_labels(&dataset(Some(org), true)).contains(&member_label(org)));

    let creator = Uuid::new_v4();
    let mut draft = dataset(None, false);
    draft.state = DatasetState::Draft;
    draft.creator_user_id = Some(creator);
    assert_eq!(
      dataset_labels(&draft),
      BTreeSet::from([creator_label(creator)])
    );
  }

  #[test]
  fn private_is_hidden_from_outsiders() {
    let org = Uuid::new_v4();
    let d = dataset(Some(org), true);
    let outsider = user(false, &[]);
    let member = user(false, &[(org, Capacity::Member)]);
    let request = SearchRequest::default();
    let config = SearchConfig::default();

    assert!(!scope(&outsider, &request, &config).permits_dataset(&d));
    assert!(scope(&member, &request, &config).permits_dataset(&d));
    let policy = AuthPolicy::default();
    assert!(!can_list(&policy, &Actor::Anonymous, &d));
    assert!(can_list(&policy, &member, &d));
  }

  #[test]
  fn include_private_toggle_applies_to_everyone() {
    let org = Uuid::new_v4();
    let d = dataset(Some(org), true);
    let request = SearchRequest {
      include_private: Some(false),
      ..SearchRequest::default()
    };
    let config = SearchConfig::default();

    let member = user(false, &[(org, Capacity::Admin)]);
    assert!(!scope(&member, &request, &config).permits_dataset(&d));
    assert!(!scope(&user(true, &[]), &request, &config).permits_dataset(&d));
  }

  #[test]
  fn drafts_only_on_request_and_only_own() {
    let me = user(false, &[]);
    let mut mine = dataset(None, false);
    mine.state = DatasetState::Draft;
    mine.creator_user_id = me.user_id();
    let mut theirs = mine.clone();
    theirs.creator_user_id = Some(Uuid::new_v4());
    let config = SearchConfig::default();

    let default = scope(&me, &SearchRequest::default(), &config);
    assert!(!default.permits_dataset(&mine));

    let drafts = scope(
      &me,
      &SearchRequest { include_drafts: true, ..SearchRequest::default() },
      &config,
    );
    assert!(drafts.permits_dataset(&mine));
    assert!(!drafts.permits_dataset(&theirs));
  }

  #[test]
  fn deleted_is_never_listed() {
    let mut d = dataset(None, false);
    d.state = DatasetState::Deleted;
    assert!(!can_list(&AuthPolicy::default(), &user(true, &[]), &d));
  }

  #[test]
  fn org_drafts_are_listed_to_editors_not_members() {
    let org = Uuid::new_v4();
    let mut d = dataset(Some(org), false);
    d.state = DatasetState::Draft;
    let policy = AuthPolicy::default();

    assert!(!can_list(&policy, &user(false, &[(org, Capacity::Member)]), &d));
    assert!(can_list(&policy, &user(false, &[(org, Capacity::Editor)]), &d));
    assert!(can_list(&policy, &user(true, &[]), &d));

    let drafts = SearchRequest { include_drafts: true, ..SearchRequest::default() };
    let config = SearchConfig::default();
    let member = user(false, &[(org, Capacity::Member)]);
    let editor = user(false, &[(org, Capacity::Editor)]);
    assert_eq!(dataset_labels(&d), BTreeSet::from([editor_label(org)]));
    assert!(!scope(&member, &drafts, &config).permits_dataset(&d));
    assert!(scope(&editor, &drafts, &config).permits_dataset(&d));
  }
}
