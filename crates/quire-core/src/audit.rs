//! Audit rows.
//!
//! Audits are write-once: the store inserts them in the same transaction as
//! the mutation they describe and never updates them afterwards. They are
//! removed only when their collection is deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::level::PermissionLevel;

// ─── Collection lifecycle ────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum CollectionAction {
  Create,
  Update,
  Delete,
  Archive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionAudit {
  pub audit_id:      Uuid,
  pub collection_id: Uuid,
  pub performed_by:  Option<Uuid>,
  pub performed_at:  DateTime<Utc>,
  pub action:        CollectionAction,
}

// ─── Permission changes ──────────────────────────────────────────────────────

/// One grant, update or revoke.
///
/// `old_level` is `None` for a grant, `new_level` is `None` for a revoke; an
/// update sets both, even when they are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionAudit {
  pub audit_id:      Uuid,
  /// Id of the permission row; the row itself may since have been revoked.
  pub permission_id: Uuid,
  pub collection_id: Uuid,
  pub user_id:       Uuid,
  pub performed_by:  Uuid,
  pub performed_at:  DateTime<Utc>,
  pub old_level:     Option<PermissionLevel>,
  pub new_level:     Option<PermissionLevel>,
}

impl PermissionAudit {
  pub fn is_grant(&self) -> bool { self.old_level.is_none() }

  pub fn is_revoke(&self) -> bool { self.new_level.is_none() }
}

// ─── Document mutations ──────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum DocumentAction {
  Create,
  Update,
  Delete,
}

/// Before/after snapshots of a document. Identifiers inside the snapshots are
/// plain hyphenated strings so the row reads the same regardless of how ids
/// are represented elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAudit {
  pub audit_id:     Uuid,
  pub document_id:  Uuid,
  pub performed_by: Option<Uuid>,
  pub performed_at: DateTime<Utc>,
  pub action:       DocumentAction,
  pub old_values:   Option<serde_json::Value>,
  pub new_values:   Option<serde_json::Value>,
}
