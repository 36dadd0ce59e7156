//! Stateless bearer tokens — issue and validate.
//!
//! Tokens are HS256 JWTs whose `sub` claim carries the identity id. The
//! server keeps no session state: possession of an unexpired token signed
//! with the configured secret is the whole proof of identity.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default token lifetime.
pub const DEFAULT_TTL_DAYS: i64 = 7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
  #[error("token expired")]
  Expired,

  /// Anything that is not a well-formed, correctly-signed token carrying
  /// an integer subject. Deliberately coarse: callers only need "401".
  #[error("malformed token")]
  Malformed,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
  /// Identity id, stringified.
  sub: String,
  iat: i64,
  exp: i64,
}

/// Issues and validates the API's bearer tokens.
pub struct TokenService {
  encoding_key: jsonwebtoken::EncodingKey,
  decoding_key: jsonwebtoken::DecodingKey,
  validation:   jsonwebtoken::Validation,
  ttl:          Duration,
}

impl TokenService {
  pub fn new(secret: &str, ttl: Duration) -> Self {
    Self {
      encoding_key: jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
      decoding_key: jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
      validation:   jsonwebtoken::Validation::default(),
      ttl,
    }
  }

  /// Sign a fresh token for `identity_id`.
  pub fn issue(&self, identity_id: i64) -> Result<String, TokenError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
      sub: identity_id.to_string(),
      iat: now,
      exp: now + self.ttl.num_seconds(),
    };
    jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &self.encoding_key)
      .map_err(|_| TokenError::Malformed)
  }

  /// Validate a token and return the identity id it names.
  pub fn validate(&self, token: &str) -> Result<i64, TokenError> {
    let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
      .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
      })?;
    data.claims.sub.parse().map_err(|_| TokenError::Malformed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn service() -> TokenService {
    TokenService::new("test-secret", Duration::days(DEFAULT_TTL_DAYS))
  }

  #[test]
  fn issue_and_validate_round_trips_the_identity_id() {
    let svc = service();
    let token = svc.issue(42).unwrap();
    assert_eq!(svc.validate(&token).unwrap(), 42);
  }

  #[test]
  fn expired_token_is_rejected() {
    // Expired well past the default leeway.
    let svc = TokenService::new("test-secret", Duration::seconds(-120));
    let token = svc.issue(42).unwrap();
    assert_eq!(svc.validate(&token), Err(TokenError::Expired));
  }

  #[test]
  fn token_signed_with_another_secret_is_rejected() {
    let issuer = TokenService::new("secret-a", Duration::days(7));
    let verifier = TokenService::new("secret-b", Duration::days(7));
    let token = issuer.issue(42).unwrap();
    assert_eq!(verifier.validate(&token), Err(TokenError::Malformed));
  }

  #[test]
  fn garbage_is_rejected() {
    let svc = service();
    assert_eq!(svc.validate("not.a.token"), Err(TokenError::Malformed));
    assert_eq!(svc.validate(""), Err(TokenError::Malformed));
  }

  #[test]
  fn non_numeric_subject_is_rejected() {
    // A structurally valid token whose sub is not an identity id.
    let svc = service();
    let claims = Claims {
      sub: "alice".into(),
      iat: Utc::now().timestamp(),
      exp: Utc::now().timestamp() + 3600,
    };
    let token = jsonwebtoken::encode(
      &jsonwebtoken::Header::default(),
      &claims,
      &jsonwebtoken::EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap();
    assert_eq!(svc.validate(&token), Err(TokenError::Malformed));
  }
}
