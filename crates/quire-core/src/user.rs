//! Users: the identities permissions and audits point at.
//!
//! Resolving a caller to a user (sessions, passwords) happens outside this
//! crate; here a user is only an id with a name attached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:    Uuid,
  /// Unique across the store.
  pub username:   String,
  pub display:    Option<String>,
  pub created_at: DateTime<Utc>,
}
