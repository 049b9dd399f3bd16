//! The authorization evaluator.
//!
//! [`evaluate`] is a pure function of the policy, the actor, the action and
//! the target. Rules are tried in order and the first that applies decides.
//! Callers translate a [`Decision::Deny`] into `NotFound` or `Forbidden`
//! depending on whether the actor can read the target at all.

use serde::Deserialize;
use strum::{AsRefStr, Display};
use uuid::Uuid;

use crate::{
  actor::Actor,
  dataset::{Dataset, DatasetState},
  organization::{Capacity, Organization},
};

/// Site-wide switches that relax who may create things.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AuthPolicy {
  /// Datasets may exist without an owning organization.
  #[serde(default = "enabled")]
  pub create_unowned_dataset:    bool,
  /// Any signed-in user may create an organization.
  #[serde(default = "enabled")]
  pub user_create_organizations: bool,
}

fn enabled() -> bool { true }

impl Default for AuthPolicy {
  fn default() -> Self {
    Self { create_unowned_dataset: true, user_create_organizations: true }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
  DatasetCreate,
  DatasetUpdate,
  DatasetDelete,
  DatasetRead,
  ResourceCreate,
  ResourceUpdate,
  ResourceDelete,
  ResourceRead,
  OrganizationCreate,
  OrganizationUpdate,
}

impl Action {
  pub fn is_mutating(self) -> bool {
    !matches!(self, Action::DatasetRead | Action::ResourceRead)
  }
}

/// What an action is performed on. Resources are authorized through their
/// parent dataset.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
  None,
  Dataset(&'a Dataset),
  /// A dataset that does not exist yet.
  NewDataset { owner_org: Option<Uuid> },
  Organization(&'a Organization),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Allow,
  Deny,
}

impl Decision {
  pub fn is_allowed(self) -> bool { self == Decision::Allow }

  fn from_bool(allowed: bool) -> Self {
    if allowed { Decision::Allow } else { Decision::Deny }
  }
}

pub fn evaluate(
  policy: &AuthPolicy,
  actor: &Actor,
  action: Action,
  target: Target<'_>,
) -> Decision {
  if actor.is_sysadmin() {
    return Decision::Allow;
  }

  if !actor.is_authenticated() {
    if action.is_mutating() {
      return Decision::Deny;
    }
    return match target {
      Target::Dataset(d) => {
        Decision::from_bool(d.state == DatasetState::Active && !d.private)
      }
      _ => Decision::Allow,
    };
  }

  match (action, target) {
    (Action::OrganizationCreate, _) => {
      Decision::from_bool(policy.user_create_organizations)
    }
    (Action::OrganizationUpdate, Target::Organization(org)) => {
      Decision::from_bool(actor.capacity_in(org.org_id) == Some(Capacity::Admin))
    }
    (
      Action::DatasetCreate | Action::ResourceCreate,
      Target::NewDataset { owner_org },
    ) => may_create(policy, actor, owner_org),
    (Action::DatasetCreate, Target::None) => may_create(policy, actor, None),
    (
      Action::DatasetUpdate
      | Action::DatasetDelete
      | Action::ResourceCreate
      | Action::ResourceUpdate
      | Action::ResourceDelete,
      Target::Dataset(d),
    ) => may_edit(policy, actor, d),
    (Action::DatasetRead | Action::ResourceRead, Target::Dataset(d)) => {
      may_read(policy, actor, d)
    }
    (Action::DatasetRead | Action::ResourceRead, _) => Decision::Allow,
    _ => Decision::Deny,
  }
}

fn may_create(
  policy: &AuthPolicy,
  actor: &Actor,
  owner_org: Option<Uuid>,
) -> Decision {
  if let Some(org_id) = owner_org {
    return Decision::from_bool(
      actor.capacity_in(org_id).is_some_and(Capacity::can_edit),
    );
  }
  if policy.create_unowned_dataset {
    return Decision::Allow;
  }
  // The form will force the actor to pick one of these organizations.
  if !actor.editable_org_ids().is_empty() {
    return Decision::Allow;
  }
  Decision::from_bool(
    !actor.has_memberships() && policy.user_create_organizations,
  )
}

fn may_edit(policy: &AuthPolicy, actor: &Actor, dataset: &Dataset) -> Decision {
  // Only sysadmins touch deleted datasets.
  if dataset.state == DatasetState::Deleted {
    return Decision::Deny;
  }
  match dataset.owner_org {
    Some(org_id) => Decision::from_bool(
      actor.capacity_in(org_id).is_some_and(Capacity::can_edit),
    ),
    None => Decision::from_bool(
      policy.create_unowned_dataset || is_creator(actor, dataset),
    ),
  }
}

fn may_read(policy: &AuthPolicy, actor: &Actor, dataset: &Dataset) -> Decision {
  match dataset.state {
    DatasetState::Deleted => Decision::Deny,
    DatasetState::Draft => may_edit(policy, actor, dataset),
    DatasetState::Active if !dataset.private => Decision::Allow,
    DatasetState::Active => match dataset.owner_org {
      Some(org_id) => Decision::from_bool(actor.capacity_in(org_id).is_some()),
      None => Decision::from_bool(is_creator(actor, dataset)),
    },
  }
}

fn is_creator(actor: &Actor, dataset: &Dataset) -> bool {
  actor.user_id().is_some() && actor.user_id() == dataset.creator_user_id
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use chrono::Utc;

  use super::*;
  use crate::user::User;

  fn user(sysadmin: bool, memberships: &[(Uuid, Capacity)]) -> Actor {
    let user = User {
      user_id: Uuid::new_v4(),
      name: "someone".into(),
      display_name: "Someone".into(),
      sysadmin,
      created_at: Utc::now(),
    };
    Actor::user(user, memberships.iter().copied().collect::<HashMap<_, _>>())
  }

  fn dataset(owner_org: Option<Uuid>, private: bool) -> Dataset {
    let now = Utc::now();
    Dataset {
      dataset_id: Uuid::new_v4(),
      name: "annakarenina".into(),
      title: "Anna Karenina".into(),
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

  fn decide(actor: &Actor, action: Action, d: &Dataset) -> Decision {
    evaluate(&AuthPolicy::default(), actor, action, Target::Dataset(d))
  }

  #[test]
  fn sysadmin_bypasses_everything() {
    let admin = user(true, &[]);
    let mut d = dataset(Some(Uuid::new_v4()), true);
    d.state = DatasetState::Deleted;
    assert_eq!(decide(&admin, Action::DatasetRead, &d), Decision::Allow);
    assert_eq!(decide(&admin, Action::DatasetDelete, &d), Decision::Allow);
  }

  #[test]
  fn anonymous_reads_only_public_active() {
    let anon = Actor::Anonymous;
    let public = dataset(None, false);
    let private = dataset(Some(Uuid::new_v4()), true);
    let mut draft = dataset(None, false);
    draft.state = DatasetState::Draft;

    assert!(decide(&anon, Action::DatasetRead, &public).is_allowed());
    assert!(!decide(&anon, Action::DatasetRead, &private).is_allowed());
    assert!(!decide(&anon, Action::DatasetRead, &draft).is_allowed());
    assert!(!decide(&anon, Action::DatasetDelete, &public).is_allowed());
  }

  #[test]
  fn member_reads_private_but_cannot_edit() {
    let org = Uuid::new_v4();
    let member = user(false, &[(org, Capacity::Member)]);
    let d = dataset(Some(org), true);

    assert_eq!(decide(&member, Action::DatasetRead, &d), Decision::Allow);
    assert_eq!(decide(&member, Action::DatasetUpdate, &d), Decision::Deny);
    assert_eq!(decide(&member, Action::DatasetDelete, &d), Decision::Deny);
    assert_eq!(decide(&member, Action::ResourceCreate, &d), Decision::Deny);
  }

  #[test]
  fn editor_edits_own_organization_only() {
    let org = Uuid::new_v4();
    let editor = user(false, &[(org, Capacity::Editor)]);
    let ours = dataset(Some(org), false);
    let theirs = dataset(Some(Uuid::new_v4()), false);

    assert!(decide(&editor, Action::DatasetUpdate, &ours).is_allowed());
    assert!(!decide(&editor, Action::DatasetUpdate, &theirs).is_allowed());
  }

  #[test]
  fn outsider_cannot_read_private() {
    let outsider = user(false, &[(Uuid::new_v4(), Capacity::Admin)]);
    let d = dataset(Some(Uuid::new_v4()), true);
    assert_eq!(decide(&outsider, Action::DatasetRead, &d), Decision::Deny);
  }

  #[test]
  fn draft_is_readable_by_editors() {
    let org = Uuid::new_v4();
    let mut d = dataset(Some(org), false);
    d.state = DatasetState::Draft;

    let editor = user(false, &[(org, Capacity::Editor)]);
    let member = user(false, &[(org, Capacity::Member)]);
    assert!(decide(&editor, Action::DatasetRead, &d).is_allowed());
    assert!(!decide(&member, Action::DatasetRead, &d).is_allowed());
  }

  #[test]
  fn deleted_is_not_editable_by_editors() {
    let org = Uuid::new_v4();
    let editor = user(false, &[(org, Capacity::Editor)]);
    let mut d = dataset(Some(org), false);
    d.state = DatasetState::Deleted;

    assert_eq!(decide(&editor, Action::DatasetUpdate, &d), Decision::Deny);
    assert_eq!(decide(&editor, Action::ResourceCreate, &d), Decision::Deny);

    let mut unowned = dataset(None, false);
    unowned.state = DatasetState::Deleted;
    unowned.creator_user_id = editor.user_id();
    assert_eq!(decide(&editor, Action::DatasetUpdate, &unowned), Decision::Deny);
  }

  #[test]
  fn creation_respects_policy() {
    let org = Uuid::new_v4();
    let strict = AuthPolicy {
      create_unowned_dataset:    false,
      user_create_organizations: false,
    };
    let loner = user(false, &[]);
    let member = user(false, &[(org, Capacity::Member)]);
    let editor = user(false, &[(org, Capacity::Editor)]);
    let unowned = Target::NewDataset { owner_org: None };
    let owned = Target::NewDataset { owner_org: Some(org) };

    let create = |p: &AuthPolicy, a: &Actor, t| {
      evaluate(p, a, Action::DatasetCreate, t).is_allowed()
    };

    assert!(create(&AuthPolicy::default(), &loner, unowned));
    assert!(!create(&strict, &loner, unowned));
    assert!(!create(&strict, &member, unowned));
    assert!(create(&strict, &editor, unowned));
    assert!(create(&strict, &editor, owned));
    assert!(!create(&strict, &member, owned));

    let orgs_allowed =
      AuthPolicy { user_create_organizations: true, ..strict };
    assert!(create(&orgs_allowed, &loner, unowned));
  }

  #[test]
  fn unowned_dataset_editing_falls_back_to_creator() {
    let strict = AuthPolicy {
      create_unowned_dataset:    false,
      user_create_organizations: true,
    };
    let creator = user(false, &[]);
    let stranger = user(false, &[]);
    let mut d = dataset(None, false);
    d.creator_user_id = creator.user_id();

    let update = |a: &Actor| {
      evaluate(&strict, a, Action::DatasetUpdate, Target::Dataset(&d))
        .is_allowed()
    };
    assert!(update(&creator));
    assert!(!update(&stranger));
  }

  #[test]
  fn organization_update_requires_admin() {
    let org = Organization {
      org_id:     Uuid::new_v4(),
      name:       "david".into(),
      title:      "Dave's books".into(),
      state:      Default::default(),
      created_at: Utc::now(),
    };
    let admin = user(false, &[(org.org_id, Capacity::Admin)]);
    let editor = user(false, &[(org.org_id, Capacity::Editor)]);
    let p = AuthPolicy::default();
    let target = Target::Organization(&org);

    assert!(evaluate(&p, &admin, Action::OrganizationUpdate, target).is_allowed());
    assert!(
      !evaluate(&p, &editor, Action::OrganizationUpdate, target).is_allowed()
    );
  }
}
