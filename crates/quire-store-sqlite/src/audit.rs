//! The audit recorder.
//!
//! `record_*` functions build an audit row with a server-assigned timestamp
//! and stage it on the caller's transaction. They never commit: the row lands
//! or disappears together with the mutation it describes.

use chrono::Utc;
use quire_core::{
  PermissionLevel,
  audit::{CollectionAction, CollectionAudit, DocumentAction, DocumentAudit, PermissionAudit},
  collection::CollectionPermission,
  document::Document,
};
use rusqlite::{Connection, params};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::encode::{
  COLLECTION_AUDIT_COLUMNS, DOCUMENT_AUDIT_COLUMNS, PERMISSION_AUDIT_COLUMNS,
  collection_audit_from_row, document_audit_from_row, encode_dt, encode_opt_uuid, encode_uuid,
  permission_audit_from_row,
};

// ─── Recording ───────────────────────────────────────────────────────────────

pub fn record_collection(
  conn: &Connection,
  collection_id: Uuid,
  action: CollectionAction,
  actor: Option<Uuid>,
) -> rusqlite::Result<CollectionAudit> {
  let audit = CollectionAudit {
    audit_id: Uuid::new_v4(),
    collection_id,
    performed_by: actor,
    performed_at: Utc::now(),
    action,
  };

  conn.execute(
    "INSERT INTO collection_audits (audit_id, collection_id, performed_by, performed_at, action)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(audit.audit_id),
      encode_uuid(audit.collection_id),
      encode_opt_uuid(audit.performed_by),
      encode_dt(audit.performed_at),
      audit.action.as_ref(),
    ],
  )?;
  Ok(audit)
}

/// Stage the audit of a grant (`old = None`), update, or revoke (`new = None`)
/// of `permission`.
pub fn record_permission(
  conn: &Connection,
  permission: &CollectionPermission,
  actor: Uuid,
  old: Option<PermissionLevel>,
  new: Option<PermissionLevel>,
) -> rusqlite::Result<PermissionAudit> {
  let audit = PermissionAudit {
    audit_id:      Uuid::new_v4(),
    permission_id: permission.permission_id,
    collection_id: permission.collection_id,
    user_id:       permission.user_id,
    performed_by:  actor,
    performed_at:  Utc::now(),
    old_level:     old,
    new_level:     new,
  };

  conn.execute(
    "INSERT INTO permission_audits (
       audit_id, permission_id, collection_id, user_id,
       performed_by, performed_at, old_level, new_level
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      encode_uuid(audit.audit_id),
      encode_uuid(audit.permission_id),
      encode_uuid(audit.collection_id),
      encode_uuid(audit.user_id),
      encode_uuid(audit.performed_by),
      encode_dt(audit.performed_at),
      audit.old_level.as_ref().map(AsRef::<str>::as_ref),
      audit.new_level.as_ref().map(AsRef::<str>::as_ref),
    ],
  )?;
  Ok(audit)
}

/// Stage a document audit with snapshots of the document before and after the
/// change.
pub fn record_document(
  conn: &Connection,
  document_id: Uuid,
  action: DocumentAction,
  actor: Option<Uuid>,
  before: Option<&Document>,
  after: Option<&Document>,
) -> rusqlite::Result<DocumentAudit> {
  let audit = DocumentAudit {
    audit_id: Uuid::new_v4(),
    document_id,
    performed_by: actor,
    performed_at: Utc::now(),
    action,
    old_values: before.map(snapshot),
    new_values: after.map(snapshot),
  };
  let collection_id = after.or(before).and_then(|d| d.collection_id);

  conn.execute(
    "INSERT INTO document_audits (
       audit_id, document_id, collection_id, performed_by,
       performed_at, action, old_values, new_values
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      encode_uuid(audit.audit_id),
      encode_uuid(audit.document_id),
      encode_opt_uuid(collection_id),
      encode_opt_uuid(audit.performed_by),
      encode_dt(audit.performed_at),
      audit.action.as_ref(),
      audit.old_values.as_ref().map(Value::to_string),
      audit.new_values.as_ref().map(Value::to_string),
    ],
  )?;
  Ok(audit)
}

/// JSON view of a document with every identifier rendered as hyphenated text.
fn snapshot(document: &Document) -> Value {
  json!({
    "document_id":   encode_uuid(document.document_id),
    "collection_id": encode_opt_uuid(document.collection_id),
    "created_by":    encode_opt_uuid(document.created_by),
    "title":         document.title,
    "description":   document.description,
    "summary":       document.summary,
    "created_at":    encode_dt(document.created_at),
  })
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// Newest first.
pub fn collection_audits(
  conn: &Connection,
  collection_id: &str,
) -> rusqlite::Result<Vec<CollectionAudit>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {COLLECTION_AUDIT_COLUMNS} FROM collection_audits
     WHERE collection_id = ?1
     ORDER BY performed_at DESC, rowid DESC"
  ))?;
  stmt
    .query_map(params![collection_id], collection_audit_from_row)?
    .collect()
}

/// Oldest first.
pub fn permission_audits(
  conn: &Connection,
  collection_id: &str,
) -> rusqlite::Result<Vec<PermissionAudit>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {PERMISSION_AUDIT_COLUMNS} FROM permission_audits
     WHERE collection_id = ?1
     ORDER BY performed_at, rowid"
  ))?;
  stmt
    .query_map(params![collection_id], permission_audit_from_row)?
    .collect()
}

/// Oldest first.
pub fn document_audits(conn: &Connection, document_id: &str) -> rusqlite::Result<Vec<DocumentAudit>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {DOCUMENT_AUDIT_COLUMNS} FROM document_audits
     WHERE document_id = ?1
     ORDER BY performed_at, rowid"
  ))?;
  stmt
    .query_map(params![document_id], document_audit_from_row)?
    .collect()
}

// ─── Cascade ─────────────────────────────────────────────────────────────────

/// Remove every audit belonging to a collection, including audits of the
/// documents it currently holds and of deleted documents last recorded in
/// it. Audits of a document that has since moved elsewhere are kept. Only
/// used by collection deletion.
pub fn delete_for_collection(conn: &Connection, collection_id: &str) -> rusqlite::Result<()> {
  conn.execute(
    "DELETE FROM document_audits
     WHERE document_id IN (SELECT document_id FROM documents WHERE collection_id = ?1)
        OR (collection_id = ?1 AND document_id NOT IN (SELECT document_id FROM documents))",
    params![collection_id],
  )?;
  conn.execute(
    "DELETE FROM permission_audits WHERE collection_id = ?1",
    params![collection_id],
  )?;
  conn.execute(
    "DELETE FROM collection_audits WHERE collection_id = ?1",
    params![collection_id],
  )?;
  Ok(())
}
