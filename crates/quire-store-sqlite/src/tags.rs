//! Tag rows and the reconciling title resolver.
//!
//! Titles are resolved with an optimistic insert: look the title up, insert it
//! if missing, and if the insert trips the `(collection_id, title)` unique
//! constraint because another writer got there first, read the winner's row
//! instead. That fallback runs once. A second miss means the constraint and
//! the table disagree, which is reported rather than retried.

use quire_core::tag::{Tag, TagRef};
use rand_core::{OsRng, RngCore as _};
use rusqlite::{Connection, OptionalExtension as _, ffi, params};
use uuid::Uuid;

use crate::encode::{TAG_COLUMNS, encode_uuid, tag_from_row};

/// Outcome of resolving one title.
#[derive(Debug, PartialEq, Eq)]
pub enum Reconciled {
  Found(Uuid),
  Created(Uuid),
  /// Lost the insert race and re-read the winner.
  Recovered(Uuid),
  /// Insert conflicted but the re-read found nothing.
  Missing,
}

impl Reconciled {
  pub fn tag_id(&self) -> Option<Uuid> {
    match self {
      Self::Found(id) | Self::Created(id) | Self::Recovered(id) => Some(*id),
      Self::Missing => None,
    }
  }
}

/// Outcome of resolving a whole list.
#[derive(Debug)]
pub enum Resolution {
  Resolved(Vec<Uuid>),
  Unresolvable(String),
}

/// A random display colour, `#rrggbb`.
pub fn random_color() -> String {
  let mut rgb = [0u8; 3];
  OsRng.fill_bytes(&mut rgb);
  format!("#{}", hex::encode(rgb))
}

pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
        || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

// ─── Rows ────────────────────────────────────────────────────────────────────

pub fn get(conn: &Connection, tag_id: &str) -> rusqlite::Result<Option<Tag>> {
  conn
    .query_row(
      &format!("SELECT {TAG_COLUMNS} FROM tags WHERE tag_id = ?1"),
      params![tag_id],
      tag_from_row,
    )
    .optional()
}

pub fn find_by_title(
  conn: &Connection,
  collection_id: &str,
  title: &str,
) -> rusqlite::Result<Option<Tag>> {
  conn
    .query_row(
      &format!("SELECT {TAG_COLUMNS} FROM tags WHERE collection_id = ?1 AND title = ?2"),
      params![collection_id, title],
      tag_from_row,
    )
    .optional()
}

pub fn insert(conn: &Connection, tag: &Tag) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO tags (tag_id, collection_id, title, color) VALUES (?1, ?2, ?3, ?4)",
    params![
      encode_uuid(tag.tag_id),
      encode_uuid(tag.collection_id),
      tag.title,
      tag.color,
    ],
  )?;
  Ok(())
}

pub fn list(conn: &Connection, collection_id: &str) -> rusqlite::Result<Vec<Tag>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {TAG_COLUMNS} FROM tags WHERE collection_id = ?1 ORDER BY title"
  ))?;
  stmt.query_map(params![collection_id], tag_from_row)?.collect()
}

/// Tags attached to a document, ordered by title.
pub fn for_document(conn: &Connection, document_id: &str) -> rusqlite::Result<Vec<Tag>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {TAG_COLUMNS} FROM tags
     WHERE tag_id IN (SELECT tag_id FROM document_tags WHERE document_id = ?1)
     ORDER BY title"
  ))?;
  stmt.query_map(params![document_id], tag_from_row)?.collect()
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

/// Insert `title` into the collection, or reuse the row a concurrent writer
/// inserted first.
///
/// A failed statement is rolled back by SQLite on its own, leaving the
/// surrounding transaction usable for the re-read.
pub fn insert_or_reread(
  conn: &Connection,
  collection_id: Uuid,
  title: &str,
  color: String,
) -> rusqlite::Result<Reconciled> {
  let tag = Tag {
    tag_id: Uuid::new_v4(),
    collection_id,
    title: title.to_owned(),
    color,
  };

  match insert(conn, &tag) {
    Ok(()) => Ok(Reconciled::Created(tag.tag_id)),
    Err(e) if is_unique_violation(&e) => {
      tracing::debug!(
        collection_id = %collection_id,
        title = title,
        "tag insert lost a race, re-reading"
      );
      Ok(
        find_by_title(conn, &encode_uuid(collection_id), title)?
          .map_or(Reconciled::Missing, |t| Reconciled::Recovered(t.tag_id)),
      )
    }
    Err(e) => Err(e),
  }
}

/// Look up `title`, creating it when absent.
pub fn reconcile(
  conn: &Connection,
  collection_id: Uuid,
  title: &str,
) -> rusqlite::Result<Reconciled> {
  if let Some(tag) = find_by_title(conn, &encode_uuid(collection_id), title)? {
    return Ok(Reconciled::Found(tag.tag_id));
  }
  insert_or_reread(conn, collection_id, title, random_color())
}

/// Resolve a mixed id/title list, in order, without duplicates.
pub fn resolve(
  conn: &Connection,
  collection_id: Uuid,
  items: &[String],
) -> rusqlite::Result<Resolution> {
  let mut resolved: Vec<Uuid> = Vec::with_capacity(items.len());

  for item in items {
    let tag_id = match TagRef::parse(item) {
      TagRef::Id(id) => id,
      TagRef::Title(title) => match reconcile(conn, collection_id, &title)?.tag_id() {
        Some(id) => id,
        None => return Ok(Resolution::Unresolvable(title)),
      },
    };
    if !resolved.contains(&tag_id) {
      resolved.push(tag_id);
    }
  }

  Ok(Resolution::Resolved(resolved))
}
