//! Bearer-token extractor and password hashing.
//!
//! [`CurrentUser`] is the only way a handler learns who is calling: it
//! validates the `Authorization: Bearer <token>` header, resolves the
//! identity, and provisions the capability profile in one step. Every
//! failure mode collapses to 401 so callers cannot probe which identities
//! exist.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use rand_core::OsRng;

use quad_core::{
  identity::{CapabilityProfile, Identity, Role},
  lifecycle::require_role,
  store::FacilityStore,
};

use crate::{AppState, error::ApiError};

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2: {e}").into()))
}

/// Verify a password against a stored PHC string.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated caller: identity plus its capability profile.
pub struct CurrentUser {
  pub identity: Identity,
  pub profile:  CapabilityProfile,
}

impl CurrentUser {
  /// Reject with 403 unless the caller's role is in `allowed`.
  pub fn require(&self, allowed: &[Role]) -> Result<(), ApiError> {
    require_role(&self.profile, allowed).map_err(ApiError::from)
  }
}

fn unauthenticated() -> ApiError {
  ApiError::Unauthenticated("a valid bearer token is required".into())
}

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let header = parts
      .headers
      .get(axum::http::header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .ok_or_else(unauthenticated)?;

    let token = header.strip_prefix("Bearer ").ok_or_else(unauthenticated)?;
    let identity_id = state
      .tokens
      .validate(token)
      .map_err(|_| unauthenticated())?;

    let identity = state
      .store
      .get_identity(identity_id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(unauthenticated)?;

    let profile = state
      .store
      .ensure_profile(identity.identity_id)
      .await
      .map_err(ApiError::store)?;

    Ok(CurrentUser { identity, profile })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_then_verify_accepts_the_password() {
    let phc = hash_password("hunter2longer").unwrap();
    assert!(phc.starts_with("$argon2"));
    assert!(verify_password("hunter2longer", &phc));
    assert!(!verify_password("wrong", &phc));
  }

  #[test]
  fn verify_rejects_garbage_hashes() {
    assert!(!verify_password("anything", "not-a-phc-string"));
  }
}
