//! Identities and their capability profiles.
//!
//! An identity holds only the account credential. What it may *do* is
//! governed entirely by its one-to-one [`CapabilityProfile`], which is
//! auto-provisioned with the default role on first resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The capability a profile grants. Every freshly provisioned profile
/// starts as [`Role::Student`]; any other role is reached only through an
/// approved role-change request or a superuser direct grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Student,
  Lecturer,
  Manager,
  Admin,
}

impl Role {
  /// Roles that may approve requests and mutate managed resources directly.
  pub const PRIVILEGED: &'static [Role] = &[Role::Manager, Role::Admin];

  /// Roles that may submit room-booking requests.
  pub const BOOKERS: &'static [Role] = &[Role::Student, Role::Lecturer];

  pub fn is_privileged(self) -> bool { Self::PRIVILEGED.contains(&self) }

  pub fn as_str(self) -> &'static str {
    match self {
      Role::Student => "student",
      Role::Lecturer => "lecturer",
      Role::Manager => "manager",
      Role::Admin => "admin",
    }
  }
}

impl std::fmt::Display for Role {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A registered account. Never deleted; the password credential is stored
/// as an argon2 PHC string and never serialised outward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
  pub identity_id:  i64,
  pub email:        String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub is_superuser: bool,
  pub created_at:   DateTime<Utc>,
}

/// The role record owned one-to-one by an [`Identity`].
///
/// `manager_subtype` is only meaningful while `role` is [`Role::Manager`];
/// it is stashed at request time so approval can carry it over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityProfile {
  pub identity_id:     i64,
  pub role:            Role,
  pub manager_subtype: Option<String>,
  pub updated_at:      DateTime<Utc>,
}
