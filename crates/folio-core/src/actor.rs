//! The party performing an operation.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{activity::ActorRef, organization::Capacity, user::User};

/// A signed-in user together with their memberships, loaded once per
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
  pub user:        User,
  /// Capacity per organization id. At most one entry per organization.
  pub memberships: HashMap<Uuid, Capacity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Actor {
  #[default]
  Anonymous,
  User(UserContext),
}

impl Actor {
  pub fn user(user: User, memberships: HashMap<Uuid, Capacity>) -> Self {
    Actor::User(UserContext { user, memberships })
  }

  pub fn user_id(&self) -> Option<Uuid> {
    match self {
      Actor::Anonymous => None,
      Actor::User(ctx) => Some(ctx.user.user_id),
    }
  }

  pub fn name(&self) -> Option<&str> {
    match self {
      Actor::Anonymous => None,
      Actor::User(ctx) => Some(&ctx.user.name),
    }
  }

  pub fn is_authenticated(&self) -> bool { matches!(self, Actor::User(_)) }

  pub fn is_sysadmin(&self) -> bool {
    matches!(self, Actor::User(ctx) if ctx.user.sysadmin)
  }

  pub fn capacity_in(&self, org_id: Uuid) -> Option<Capacity> {
    match self {
      Actor::Anonymous => None,
      Actor::User(ctx) => ctx.memberships.get(&org_id).copied(),
    }
  }

  /// Every (organization, capacity) the actor holds.
  pub fn memberships(&self) -> impl Iterator<Item = (Uuid, Capacity)> + '_ {
    let map = match self {
      Actor::Anonymous => None,
      Actor::User(ctx) => Some(&ctx.memberships),
    };
    map.into_iter().flatten().map(|(id, cap)| (*id, *cap))
  }

  pub fn has_memberships(&self) -> bool { self.memberships().next().is_some() }

  /// Organizations in which the actor may create and edit datasets.
  pub fn editable_org_ids(&self) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = self
      .memberships()
      .filter(|(_, cap)| cap.can_edit())
      .map(|(id, _)| id)
      .collect();
    ids.sort();
    ids
  }

  /// How this actor is recorded in the activity log.
  pub fn activity_ref(&self) -> ActorRef {
    match self.user_id() {
      Some(id) => ActorRef::User(id),
      None => ActorRef::System,
    }
  }
}
