//! Notifications — fire-and-forget records created by state transitions.
//!
//! A notification is created by the workflow and later marked read by its
//! owner; nobody else mutates it. Delivery/transport is out of scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  identity::Role,
  store::FacilityStore,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
  pub notification_id: i64,
  pub identity_id:     i64,
  pub title:           String,
  pub message:         String,
  pub link:            Option<String>,
  pub is_read:         bool,
  pub created_at:      DateTime<Utc>,
}

/// Input for creating a [`Notification`].
#[derive(Debug, Clone)]
pub struct NewNotification {
  pub identity_id: i64,
  pub title:       String,
  pub message:     String,
  pub link:        Option<String>,
}

impl NewNotification {
  pub fn new(
    identity_id: i64,
    title: impl Into<String>,
    message: impl Into<String>,
    link: Option<&str>,
  ) -> Self {
    Self {
      identity_id,
      title: title.into(),
      message: message.into(),
      link: link.map(str::to_owned),
    }
  }
}

/// Create one notification per identity currently holding one of `roles`.
pub async fn fan_out<S: FacilityStore>(
  store: &S,
  roles: &[Role],
  title: &str,
  message: &str,
  link: Option<&str>,
) -> Result<()> {
  let recipients = store
    .identities_with_roles(roles)
    .await
    .map_err(Error::store)?;
  for recipient in recipients {
    store
      .create_notification(NewNotification::new(
        recipient.identity_id,
        title,
        message,
        link,
      ))
      .await
      .map_err(Error::store)?;
  }
  Ok(())
}
