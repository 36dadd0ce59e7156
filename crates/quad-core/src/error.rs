//! Error types for `quad-core`.

use thiserror::Error;

use crate::identity::Role;

#[derive(Debug, Error)]
pub enum Error {
  #[error("request not found: {0}")]
  RequestNotFound(i64),

  #[error("resource not found: {0}")]
  ResourceNotFound(i64),

  #[error("request {0} is already decided")]
  AlreadyDecided(i64),

  #[error("a request for the {role} role is already pending")]
  DuplicatePending { role: Role },

  #[error("role {0} is confirmed; further role changes are not allowed")]
  RoleLocked(Role),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error into the opaque [`Error::Store`] variant.
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Error::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
