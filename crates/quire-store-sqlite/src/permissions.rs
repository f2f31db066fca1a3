//! Raw access to the `collection_permissions` table.
//!
//! Every function runs on the caller's connection and never commits; callers
//! pass the open transaction. Nothing outside this module reads or writes the
//! table.

use quire_core::{PermissionLevel, collection::CollectionPermission};
use rusqlite::{Connection, OptionalExtension as _, params};

use crate::encode::{PERMISSION_COLUMNS, permission_from_row};

/// The row for `(collection_id, user_id)`, or `None` when the user holds no
/// level on the collection.
pub fn get(
  conn: &Connection,
  collection_id: &str,
  user_id: &str,
) -> rusqlite::Result<Option<CollectionPermission>> {
  conn
    .query_row(
      &format!(
        "SELECT {PERMISSION_COLUMNS} FROM collection_permissions
         WHERE collection_id = ?1 AND user_id = ?2"
      ),
      params![collection_id, user_id],
      permission_from_row,
    )
    .optional()
}

/// Set the level for `(collection_id, user_id)`.
///
/// An existing row is overwritten in place and keeps its id; otherwise a new
/// row is inserted under `new_permission_id`.
pub fn upsert(
  conn: &Connection,
  new_permission_id: &str,
  collection_id: &str,
  user_id: &str,
  level: PermissionLevel,
) -> rusqlite::Result<CollectionPermission> {
  conn.execute(
    "INSERT INTO collection_permissions (permission_id, collection_id, user_id, level)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT (collection_id, user_id) DO UPDATE SET level = excluded.level",
    params![new_permission_id, collection_id, user_id, level.as_ref()],
  )?;

  conn.query_row(
    &format!(
      "SELECT {PERMISSION_COLUMNS} FROM collection_permissions
       WHERE collection_id = ?1 AND user_id = ?2"
    ),
    params![collection_id, user_id],
    permission_from_row,
  )
}

/// Returns whether a row existed.
pub fn delete(conn: &Connection, collection_id: &str, user_id: &str) -> rusqlite::Result<bool> {
  let removed = conn.execute(
    "DELETE FROM collection_permissions WHERE collection_id = ?1 AND user_id = ?2",
    params![collection_id, user_id],
  )?;
  Ok(removed > 0)
}

pub fn count_owners(conn: &Connection, collection_id: &str) -> rusqlite::Result<u64> {
  let owners: i64 = conn.query_row(
    "SELECT COUNT(*) FROM collection_permissions WHERE collection_id = ?1 AND level = ?2",
    params![collection_id, PermissionLevel::Owner.as_ref()],
    |row| row.get(0),
  )?;
  Ok(owners.unsigned_abs())
}

pub fn list(conn: &Connection, collection_id: &str) -> rusqlite::Result<Vec<CollectionPermission>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {PERMISSION_COLUMNS} FROM collection_permissions
     WHERE collection_id = ?1
     ORDER BY rowid"
  ))?;
  stmt
    .query_map(params![collection_id], permission_from_row)?
    .collect()
}

/// Remove every row of a collection; only used by collection deletion.
pub fn delete_all(conn: &Connection, collection_id: &str) -> rusqlite::Result<usize> {
  conn.execute(
    "DELETE FROM collection_permissions WHERE collection_id = ?1",
    params![collection_id],
  )
}
