//! Registered users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::{ValidationErrors, check_user_name};

/// A registered account. The password hash is kept by the store and never
/// travels on this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:      Uuid,
  pub name:         String,
  pub display_name: String,
  /// Global super-user; bypasses every authorization rule.
  pub sysadmin:     bool,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::store::CatalogStore::create_user`].
#[derive(Debug, Clone, Default)]
pub struct NewUser {
  pub name:          String,
  pub display_name:  Option<String>,
  pub sysadmin:      bool,
  /// Argon2 PHC string, if the account can log in with a password.
  pub password_hash: Option<String>,
}

impl NewUser {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Self::default() }
  }

  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_user_name(&mut errors, &self.name);
    errors.into_result()
  }

  /// The display name to persist; falls back to the account name.
  pub fn resolved_display_name(&self) -> String {
    self
      .display_name
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .unwrap_or(&self.name)
      .to_owned()
  }
}
