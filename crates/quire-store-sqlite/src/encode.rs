//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! UUIDs are stored as hyphenated lowercase strings. Timestamps are RFC 3339
//! with fixed microsecond precision so that text order equals time order.
//! Enums use their uppercase names. Decoding happens inside the row mappers,
//! so a malformed column surfaces as a `FromSqlConversionFailure`.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use quire_core::{
  audit::{CollectionAudit, DocumentAudit, PermissionAudit},
  collection::{Collection, CollectionPermission},
  document::Document,
  tag::Tag,
  user::User,
};
use rusqlite::{Row, types::Type};
use uuid::Uuid;

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn encode_opt_uuid(id: Option<Uuid>) -> Option<String> { id.map(encode_uuid) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_failure<E>(idx: usize, err: E) -> rusqlite::Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_uuid(idx: usize, s: &str) -> rusqlite::Result<Uuid> {
  Uuid::parse_str(s).map_err(|e| conversion_failure(idx, e))
}

pub fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
  let s: String = row.get(idx)?;
  parse_uuid(idx, &s)
}

pub fn opt_uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
  row
    .get::<_, Option<String>>(idx)?
    .map(|s| parse_uuid(idx, &s))
    .transpose()
}

pub fn dt_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
  let s: String = row.get(idx)?;
  DateTime::parse_from_rfc3339(&s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| conversion_failure(idx, e))
}

pub fn enum_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
  T: FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  let s: String = row.get(idx)?;
  s.parse().map_err(|e| conversion_failure(idx, e))
}

pub fn opt_enum_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
  T: FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  row
    .get::<_, Option<String>>(idx)?
    .map(|s| s.parse().map_err(|e| conversion_failure(idx, e)))
    .transpose()
}

pub fn opt_json_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<serde_json::Value>> {
  row
    .get::<_, Option<String>>(idx)?
    .map(|s| serde_json::from_str(&s).map_err(|e| conversion_failure(idx, e)))
    .transpose()
}

// ─── Rows ────────────────────────────────────────────────────────────────────
//
// Each `*_COLUMNS` list matches the index order its mapper reads.

pub const USER_COLUMNS: &str = "user_id, username, display, created_at";

pub fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
  Ok(User {
    user_id:    uuid_col(row, 0)?,
    username:   row.get(1)?,
    display:    row.get(2)?,
    created_at: dt_col(row, 3)?,
  })
}

pub const COLLECTION_COLUMNS: &str = "collection_id, title, description, summary";

pub fn collection_from_row(row: &Row<'_>) -> rusqlite::Result<Collection> {
  Ok(Collection {
    collection_id: uuid_col(row, 0)?,
    title:         row.get(1)?,
    description:   row.get(2)?,
    summary:       row.get(3)?,
  })
}

pub const PERMISSION_COLUMNS: &str = "permission_id, collection_id, user_id, level";

pub fn permission_from_row(row: &Row<'_>) -> rusqlite::Result<CollectionPermission> {
  Ok(CollectionPermission {
    permission_id: uuid_col(row, 0)?,
    collection_id: uuid_col(row, 1)?,
    user_id:       uuid_col(row, 2)?,
    level:         enum_col(row, 3)?,
  })
}

pub const COLLECTION_AUDIT_COLUMNS: &str =
  "audit_id, collection_id, performed_by, performed_at, action";

pub fn collection_audit_from_row(row: &Row<'_>) -> rusqlite::Result<CollectionAudit> {
  Ok(CollectionAudit {
    audit_id:      uuid_col(row, 0)?,
    collection_id: uuid_col(row, 1)?,
    performed_by:  opt_uuid_col(row, 2)?,
    performed_at:  dt_col(row, 3)?,
    action:        enum_col(row, 4)?,
  })
}

pub const PERMISSION_AUDIT_COLUMNS: &str = "audit_id, permission_id, collection_id, user_id, \
   performed_by, performed_at, old_level, new_level";

pub fn permission_audit_from_row(row: &Row<'_>) -> rusqlite::Result<PermissionAudit> {
  Ok(PermissionAudit {
    audit_id:      uuid_col(row, 0)?,
    permission_id: uuid_col(row, 1)?,
    collection_id: uuid_col(row, 2)?,
    user_id:       uuid_col(row, 3)?,
    performed_by:  uuid_col(row, 4)?,
    performed_at:  dt_col(row, 5)?,
    old_level:     opt_enum_col(row, 6)?,
    new_level:     opt_enum_col(row, 7)?,
  })
}

pub const DOCUMENT_COLUMNS: &str =
  "document_id, collection_id, created_by, title, description, summary, created_at";

pub fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
  Ok(Document {
    document_id:   uuid_col(row, 0)?,
    collection_id: opt_uuid_col(row, 1)?,
    created_by:    opt_uuid_col(row, 2)?,
    title:         row.get(3)?,
    description:   row.get(4)?,
    summary:       row.get(5)?,
    created_at:    dt_col(row, 6)?,
  })
}

pub const DOCUMENT_AUDIT_COLUMNS: &str =
  "audit_id, document_id, performed_by, performed_at, action, old_values, new_values";

pub fn document_audit_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentAudit> {
  Ok(DocumentAudit {
    audit_id:     uuid_col(row, 0)?,
    document_id:  uuid_col(row, 1)?,
    performed_by: opt_uuid_col(row, 2)?,
    performed_at: dt_col(row, 3)?,
    action:       enum_col(row, 4)?,
    old_values:   opt_json_col(row, 5)?,
    new_values:   opt_json_col(row, 6)?,
  })
}

pub const TAG_COLUMNS: &str = "tag_id, collection_id, title, color";

pub fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
  Ok(Tag {
    tag_id:        uuid_col(row, 0)?,
    collection_id: uuid_col(row, 1)?,
    title:         row.get(2)?,
    color:         row.get(3)?,
  })
}
