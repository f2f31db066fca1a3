//! [`SqliteStore`], the SQLite implementation of [`CollectionStore`].

use std::time::Duration;

use chrono::Utc;
use quire_core::{
  PermissionLevel,
  audit::{CollectionAction, CollectionAudit, DocumentAction, DocumentAudit, PermissionAudit},
  collection::{Collection, CollectionPatch, CollectionPermission, NewCollection},
  document::{Document, DocumentPatch, NewDocument},
  satisfies,
  store::CollectionStore,
  tag::{NewTag, Tag, TagPatch, TagRef},
  user::User,
};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};
use uuid::Uuid;

use crate::{
  Error, Result, StoreConfig, audit,
  encode::{
    COLLECTION_COLUMNS, DOCUMENT_COLUMNS, USER_COLUMNS, collection_from_row, document_from_row,
    encode_dt, encode_opt_uuid, encode_uuid, user_from_row,
  },
  permissions,
  schema::SCHEMA,
  tags::{self, Resolution},
};

// ─── Transaction plumbing ────────────────────────────────────────────────────

/// What a write closure decided. `Refused` rolls the transaction back and
/// surfaces the error; `Done` commits.
enum Outcome<T> {
  Done(T),
  Refused(quire_core::Error),
}

impl<T> Outcome<T> {
  fn into_result(self) -> Result<T> {
    match self {
      Self::Done(value) => Ok(value),
      Self::Refused(err) => Err(Error::Core(err)),
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Quire store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Separate
/// [`open_with`](Self::open_with) calls on the same file give independent
/// connections that coordinate through SQLite's locks.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) the store described by `config`.
  pub async fn open_with(config: &StoreConfig) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(&config.path).await?;
    let store = Self { conn };
    store.init(config.busy_timeout()).await?;
    tracing::debug!(path = ?config.path, "opened store");
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init(StoreConfig::default().busy_timeout()).await?;
    Ok(store)
  }

  async fn init(&self, busy_timeout: Duration) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection without a transaction.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
  {
    Ok(self.conn.call(move |conn| Ok(f(conn)?)).await?)
  }

  /// Run `f` inside one `BEGIN IMMEDIATE` transaction.
  ///
  /// The write lock is held from the first read, so preconditions checked by
  /// `f` still hold when its writes commit. Any error, or a `Refused`
  /// outcome, drops the transaction and rolls back everything `f` staged,
  /// audit rows included.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> rusqlite::Result<Outcome<T>> + Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = f(&tx)?;
        if matches!(outcome, Outcome::Done(_)) {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?;
    outcome.into_result()
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn collection_row(conn: &Connection, collection_id: Uuid) -> rusqlite::Result<Option<Collection>> {
  conn
    .query_row(
      &format!("SELECT {COLLECTION_COLUMNS} FROM collections WHERE collection_id = ?1"),
      params![encode_uuid(collection_id)],
      collection_from_row,
    )
    .optional()
}

fn document_row(conn: &Connection, document_id: Uuid) -> rusqlite::Result<Option<Document>> {
  conn
    .query_row(
      &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE document_id = ?1"),
      params![encode_uuid(document_id)],
      document_from_row,
    )
    .optional()
}

/// Whether taking `held` away from its holder would leave the collection
/// without an owner.
fn strips_last_owner(
  conn: &Connection,
  collection_id: &str,
  held: PermissionLevel,
  next: Option<PermissionLevel>,
) -> rusqlite::Result<bool> {
  if held != PermissionLevel::Owner || next == Some(PermissionLevel::Owner) {
    return Ok(false);
  }
  Ok(permissions::count_owners(conn, collection_id)? <= 1)
}

/// Overwrite the level of an existing row and stage the audit.
fn overwrite_in(
  conn: &Connection,
  existing: &CollectionPermission,
  level: PermissionLevel,
  actor: Uuid,
) -> rusqlite::Result<Outcome<CollectionPermission>> {
  let c = encode_uuid(existing.collection_id);
  let u = encode_uuid(existing.user_id);

  if strips_last_owner(conn, &c, existing.level, Some(level))? {
    return Ok(Outcome::Refused(quire_core::Error::LastOwner(existing.collection_id)));
  }
  let row = permissions::upsert(conn, &encode_uuid(existing.permission_id), &c, &u, level)?;
  audit::record_permission(conn, &row, actor, Some(existing.level), Some(level))?;
  Ok(Outcome::Done(row))
}

/// Set `level` for the user, inserting or overwriting, and stage the audit.
/// Returns the row and the level it held before, if any.
fn grant_in(
  conn: &Connection,
  collection_id: Uuid,
  user_id: Uuid,
  level: PermissionLevel,
  actor: Uuid,
) -> rusqlite::Result<Outcome<(CollectionPermission, Option<PermissionLevel>)>> {
  let c = encode_uuid(collection_id);
  let u = encode_uuid(user_id);

  if let Some(existing) = permissions::get(conn, &c, &u)? {
    return Ok(match overwrite_in(conn, &existing, level, actor)? {
      Outcome::Done(row) => Outcome::Done((row, Some(existing.level))),
      Outcome::Refused(err) => Outcome::Refused(err),
    });
  }
  let row = permissions::upsert(conn, &encode_uuid(Uuid::new_v4()), &c, &u, level)?;
  audit::record_permission(conn, &row, actor, None, Some(level))?;
  Ok(Outcome::Done((row, None)))
}

fn log_refusal(err: &Error, event: &str, collection_id: Uuid, user_id: Uuid, actor: Uuid) {
  if err.is_policy_violation() {
    tracing::warn!(
      target: "audit",
      event,
      collection_id = %collection_id,
      user_id = %user_id,
      actor = %actor,
      "{err}"
    );
  }
}

/// Refuse a title that conflicted on insert but could not be re-read.
fn unresolvable<T>(collection_id: Uuid, title: String) -> Outcome<T> {
  tracing::error!(
    collection_id = %collection_id,
    title = %title,
    "tag conflicted on insert but could not be re-read"
  );
  Outcome::Refused(quire_core::Error::TagUnresolvable(title))
}

/// Check that every id names a tag of `collection_id`, and return them.
fn tags_of_collection(
  conn: &Connection,
  collection_id: Option<Uuid>,
  items: &[String],
) -> rusqlite::Result<Outcome<Vec<Uuid>>> {
  let Some(collection_id) = collection_id else {
    // Without a collection there is nothing to resolve against.
    return Ok(match items.first().map(|item| TagRef::parse(item)) {
      None => Outcome::Done(Vec::new()),
      Some(TagRef::Id(id)) => Outcome::Refused(quire_core::Error::TagNotFound(id)),
      Some(TagRef::Title(title)) => Outcome::Refused(quire_core::Error::TagUnresolvable(title)),
    });
  };

  let ids = match tags::resolve(conn, collection_id, items)? {
    Resolution::Resolved(ids) => ids,
    Resolution::Unresolvable(title) => return Ok(unresolvable(collection_id, title)),
  };

  for id in &ids {
    match tags::get(conn, &encode_uuid(*id))? {
      Some(tag) if tag.collection_id == collection_id => {}
      _ => return Ok(Outcome::Refused(quire_core::Error::TagNotFound(*id))),
    }
  }
  Ok(Outcome::Done(ids))
}

// ─── CollectionStore impl ────────────────────────────────────────────────────

impl CollectionStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn register_user(&self, username: String, display: Option<String>) -> Result<User> {
    let user = User {
      user_id: Uuid::new_v4(),
      username,
      display,
      created_at: Utc::now(),
    };

    let row = user.clone();
    self
      .write(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, username, display, created_at) VALUES (?1, ?2, ?3, ?4)",
          params![
            encode_uuid(row.user_id),
            row.username,
            row.display,
            encode_dt(row.created_at),
          ],
        )?;
        Ok(Outcome::Done(()))
      })
      .await?;

    Ok(user)
  }

  async fn get_user_by_name(&self, username: String) -> Result<Option<User>> {
    self
      .read(move |conn| {
        conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            user_from_row,
          )
          .optional()
      })
      .await
  }

  // ── Collections ───────────────────────────────────────────────────────────

  async fn create_collection(&self, input: NewCollection, creator: Uuid) -> Result<Collection> {
    let collection = Collection {
      collection_id: Uuid::new_v4(),
      title:         input.title,
      description:   input.description,
      summary:       None,
    };

    let row = collection.clone();
    self
      .write(move |conn| {
        conn.execute(
          "INSERT INTO collections (collection_id, title, description, summary)
           VALUES (?1, ?2, ?3, ?4)",
          params![
            encode_uuid(row.collection_id),
            row.title,
            row.description,
            row.summary,
          ],
        )?;
        if let Outcome::Refused(err) =
          grant_in(conn, row.collection_id, creator, PermissionLevel::Owner, creator)?
        {
          return Ok(Outcome::Refused(err));
        }
        audit::record_collection(conn, row.collection_id, CollectionAction::Create, Some(creator))?;
        Ok(Outcome::Done(()))
      })
      .await?;

    tracing::info!(
      target: "audit",
      event = "collection_create",
      collection_id = %collection.collection_id,
      actor = %creator,
      "collection created"
    );
    Ok(collection)
  }

  async fn get_collection(&self, collection_id: Uuid) -> Result<Option<Collection>> {
    self.read(move |conn| collection_row(conn, collection_id)).await
  }

  async fn update_collection(
    &self,
    collection_id: Uuid,
    patch: CollectionPatch,
    actor: Uuid,
  ) -> Result<Option<Collection>> {
    let updated = self
      .write(move |conn| {
        let Some(mut collection) = collection_row(conn, collection_id)? else {
          return Ok(Outcome::Done(None));
        };
        patch.apply(&mut collection);

        conn.execute(
          "UPDATE collections SET title = ?2, description = ?3, summary = ?4
           WHERE collection_id = ?1",
          params![
            encode_uuid(collection_id),
            collection.title,
            collection.description,
            collection.summary,
          ],
        )?;
        audit::record_collection(conn, collection_id, CollectionAction::Update, Some(actor))?;
        Ok(Outcome::Done(Some(collection)))
      })
      .await?;

    if updated.is_some() {
      tracing::info!(
        target: "audit",
        event = "collection_update",
        collection_id = %collection_id,
        actor = %actor,
        "collection updated"
      );
    }
    Ok(updated)
  }

  async fn delete_collection(&self, collection_id: Uuid, actor: Uuid) -> Result<bool> {
    let deleted = self
      .write(move |conn| {
        if collection_row(conn, collection_id)?.is_none() {
          return Ok(Outcome::Done(false));
        }
        let c = encode_uuid(collection_id);

        conn.execute(
          "DELETE FROM document_tags
           WHERE document_id IN (SELECT document_id FROM documents WHERE collection_id = ?1)
              OR tag_id IN (SELECT tag_id FROM tags WHERE collection_id = ?1)",
          params![c],
        )?;
        audit::delete_for_collection(conn, &c)?;
        conn.execute("DELETE FROM documents WHERE collection_id = ?1", params![c])?;
        conn.execute("DELETE FROM tags WHERE collection_id = ?1", params![c])?;
        permissions::delete_all(conn, &c)?;
        conn.execute("DELETE FROM collections WHERE collection_id = ?1", params![c])?;
        Ok(Outcome::Done(true))
      })
      .await?;

    if deleted {
      tracing::info!(
        target: "audit",
        event = "collection_delete",
        collection_id = %collection_id,
        actor = %actor,
        "collection deleted"
      );
    }
    Ok(deleted)
  }

  async fn list_user_collections(&self, user_id: Uuid) -> Result<Vec<Collection>> {
    self
      .read(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {COLLECTION_COLUMNS} FROM collections
           WHERE collection_id IN (
             SELECT collection_id FROM collection_permissions WHERE user_id = ?1
           )
           ORDER BY title, collection_id"
        ))?;
        stmt
          .query_map(params![encode_uuid(user_id)], collection_from_row)?
          .collect()
      })
      .await
  }

  async fn collection_audits(&self, collection_id: Uuid) -> Result<Vec<CollectionAudit>> {
    self
      .read(move |conn| audit::collection_audits(conn, &encode_uuid(collection_id)))
      .await
  }

  // ── Access control ────────────────────────────────────────────────────────

  async fn has_permission(
    &self,
    collection_id: Uuid,
    user_id: Uuid,
    required: PermissionLevel,
  ) -> Result<bool> {
    let held = self.get_permission(collection_id, user_id).await?;
    Ok(held.is_some_and(|p| satisfies(p.level, required)))
  }

  async fn get_permission(
    &self,
    collection_id: Uuid,
    user_id: Uuid,
  ) -> Result<Option<CollectionPermission>> {
    self
      .read(move |conn| {
        permissions::get(conn, &encode_uuid(collection_id), &encode_uuid(user_id))
      })
      .await
  }

  async fn list_permissions(&self, collection_id: Uuid) -> Result<Vec<CollectionPermission>> {
    self
      .read(move |conn| permissions::list(conn, &encode_uuid(collection_id)))
      .await
  }

  async fn count_owners(&self, collection_id: Uuid) -> Result<u64> {
    self
      .read(move |conn| permissions::count_owners(conn, &encode_uuid(collection_id)))
      .await
  }

  async fn grant(
    &self,
    collection_id: Uuid,
    user_id: Uuid,
    level: PermissionLevel,
    actor: Uuid,
  ) -> Result<CollectionPermission> {
    let granted = self
      .write(move |conn| grant_in(conn, collection_id, user_id, level, actor))
      .await;
    let (row, old) = granted
      .inspect_err(|e| log_refusal(e, "permission_grant_refused", collection_id, user_id, actor))?;

    tracing::info!(
      target: "audit",
      event = if old.is_some() { "permission_update" } else { "permission_grant" },
      collection_id = %collection_id,
      user_id = %user_id,
      actor = %actor,
      old = ?old,
      new = %level,
      "permission granted"
    );
    Ok(row)
  }

  async fn update_permission(
    &self,
    collection_id: Uuid,
    user_id: Uuid,
    level: PermissionLevel,
    actor: Uuid,
  ) -> Result<Option<CollectionPermission>> {
    let updated = self
      .write(move |conn| {
        let Some(existing) =
          permissions::get(conn, &encode_uuid(collection_id), &encode_uuid(user_id))?
        else {
          return Ok(Outcome::Done(None));
        };
        Ok(match overwrite_in(conn, &existing, level, actor)? {
          Outcome::Done(row) => Outcome::Done(Some((row, existing.level))),
          Outcome::Refused(err) => Outcome::Refused(err),
        })
      })
      .await
      .inspect_err(|e| log_refusal(e, "permission_update_refused", collection_id, user_id, actor))?;

    let Some((row, old)) = updated else {
      return Ok(None);
    };
    tracing::info!(
      target: "audit",
      event = "permission_update",
      collection_id = %collection_id,
      user_id = %user_id,
      actor = %actor,
      old = %old,
      new = %level,
      "permission updated"
    );
    Ok(Some(row))
  }

  async fn revoke(&self, collection_id: Uuid, user_id: Uuid, actor: Uuid) -> Result<bool> {
    let revoked = self
      .write(move |conn| {
        let c = encode_uuid(collection_id);
        let u = encode_uuid(user_id);

        let Some(row) = permissions::get(conn, &c, &u)? else {
          return Ok(Outcome::Done(None));
        };
        if strips_last_owner(conn, &c, row.level, None)? {
          return Ok(Outcome::Refused(quire_core::Error::LastOwner(collection_id)));
        }

        audit::record_permission(conn, &row, actor, Some(row.level), None)?;
        permissions::delete(conn, &c, &u)?;
        Ok(Outcome::Done(Some(row.level)))
      })
      .await;

    match revoked {
      Ok(Some(old)) => {
        tracing::info!(
          target: "audit",
          event = "permission_revoke",
          collection_id = %collection_id,
          user_id = %user_id,
          actor = %actor,
          old = %old,
          "permission revoked"
        );
        Ok(true)
      }
      Ok(None) => Ok(false),
      Err(e) => {
        log_refusal(&e, "permission_revoke_refused", collection_id, user_id, actor);
        Err(e)
      }
    }
  }

  async fn permission_audits(&self, collection_id: Uuid) -> Result<Vec<PermissionAudit>> {
    self
      .read(move |conn| audit::permission_audits(conn, &encode_uuid(collection_id)))
      .await
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn create_document(&self, input: NewDocument, actor: Option<Uuid>) -> Result<Document> {
    let document = Document {
      document_id:   Uuid::new_v4(),
      collection_id: input.collection_id,
      created_by:    actor,
      title:         input.title,
      description:   input.description,
      summary:       None,
      created_at:    Utc::now(),
    };

    let row = document.clone();
    self
      .write(move |conn| {
        conn.execute(
          "INSERT INTO documents (
             document_id, collection_id, created_by, title, description, summary, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          params![
            encode_uuid(row.document_id),
            encode_opt_uuid(row.collection_id),
            encode_opt_uuid(row.created_by),
            row.title,
            row.description,
            row.summary,
            encode_dt(row.created_at),
          ],
        )?;
        audit::record_document(conn, row.document_id, DocumentAction::Create, actor, None, Some(&row))?;
        Ok(Outcome::Done(()))
      })
      .await?;

    tracing::info!(
      target: "audit",
      event = "document_create",
      document_id = %document.document_id,
      collection_id = ?document.collection_id,
      actor = ?actor,
      "document created"
    );
    Ok(document)
  }

  async fn get_document(&self, document_id: Uuid) -> Result<Option<Document>> {
    self.read(move |conn| document_row(conn, document_id)).await
  }

  async fn update_document(
    &self,
    document_id: Uuid,
    patch: DocumentPatch,
    actor: Option<Uuid>,
  ) -> Result<Option<Document>> {
    let updated = self
      .write(move |conn| {
        let Some(before) = document_row(conn, document_id)? else {
          return Ok(Outcome::Done(None));
        };
        let mut after = before.clone();
        patch.apply(&mut after);

        conn.execute(
          "UPDATE documents SET title = ?2, description = ?3, summary = ?4
           WHERE document_id = ?1",
          params![
            encode_uuid(document_id),
            after.title,
            after.description,
            after.summary,
          ],
        )?;
        audit::record_document(
          conn,
          document_id,
          DocumentAction::Update,
          actor,
          Some(&before),
          Some(&after),
        )?;
        Ok(Outcome::Done(Some(after)))
      })
      .await?;

    if updated.is_some() {
      tracing::info!(
        target: "audit",
        event = "document_update",
        document_id = %document_id,
        actor = ?actor,
        "document updated"
      );
    }
    Ok(updated)
  }

  async fn move_document(
    &self,
    document_id: Uuid,
    collection_id: Option<Uuid>,
    actor: Option<Uuid>,
  ) -> Result<Option<Document>> {
    let moved = self
      .write(move |conn| {
        let Some(before) = document_row(conn, document_id)? else {
          return Ok(Outcome::Done(None));
        };
        if let Some(target) = collection_id
          && collection_row(conn, target)?.is_none()
        {
          return Ok(Outcome::Refused(quire_core::Error::CollectionNotFound(target)));
        }
        let mut after = before.clone();
        after.collection_id = collection_id;

        let d = encode_uuid(document_id);
        let c = encode_opt_uuid(collection_id);
        conn.execute(
          "UPDATE documents SET collection_id = ?2 WHERE document_id = ?1",
          params![d, c],
        )?;
        // Tags are scoped to a collection and do not follow the document.
        conn.execute(
          "DELETE FROM document_tags
           WHERE document_id = ?1
             AND tag_id NOT IN (SELECT tag_id FROM tags WHERE collection_id IS ?2)",
          params![d, c],
        )?;
        audit::record_document(
          conn,
          document_id,
          DocumentAction::Update,
          actor,
          Some(&before),
          Some(&after),
        )?;
        Ok(Outcome::Done(Some(after)))
      })
      .await?;

    if moved.is_some() {
      tracing::info!(
        target: "audit",
        event = "document_move",
        document_id = %document_id,
        collection_id = ?collection_id,
        actor = ?actor,
        "document moved"
      );
    }
    Ok(moved)
  }

  async fn delete_document(&self, document_id: Uuid, actor: Option<Uuid>) -> Result<bool> {
    let deleted = self
      .write(move |conn| {
        let Some(before) = document_row(conn, document_id)? else {
          return Ok(Outcome::Done(false));
        };
        audit::record_document(conn, document_id, DocumentAction::Delete, actor, Some(&before), None)?;

        let d = encode_uuid(document_id);
        conn.execute("DELETE FROM document_tags WHERE document_id = ?1", params![d])?;
        conn.execute("DELETE FROM documents WHERE document_id = ?1", params![d])?;
        Ok(Outcome::Done(true))
      })
      .await?;

    if deleted {
      tracing::info!(
        target: "audit",
        event = "document_delete",
        document_id = %document_id,
        actor = ?actor,
        "document deleted"
      );
    }
    Ok(deleted)
  }

  async fn document_audits(&self, document_id: Uuid) -> Result<Vec<DocumentAudit>> {
    self
      .read(move |conn| audit::document_audits(conn, &encode_uuid(document_id)))
      .await
  }

  // ── Tags ──────────────────────────────────────────────────────────────────

  async fn create_tag(&self, input: NewTag) -> Result<Tag> {
    let tag = Tag {
      tag_id:        Uuid::new_v4(),
      collection_id: input.collection_id,
      title:         input.title,
      color:         input.color,
    };

    let row = tag.clone();
    self
      .write(move |conn| {
        tags::insert(conn, &row)?;
        Ok(Outcome::Done(()))
      })
      .await?;
    Ok(tag)
  }

  async fn get_tag_by_title(&self, collection_id: Uuid, title: String) -> Result<Option<Tag>> {
    self
      .read(move |conn| tags::find_by_title(conn, &encode_uuid(collection_id), &title))
      .await
  }

  async fn list_tags(&self, collection_id: Uuid) -> Result<Vec<Tag>> {
    self
      .read(move |conn| tags::list(conn, &encode_uuid(collection_id)))
      .await
  }

  async fn update_tag(&self, tag_id: Uuid, patch: TagPatch) -> Result<Option<Tag>> {
    self
      .write(move |conn| {
        let Some(mut tag) = tags::get(conn, &encode_uuid(tag_id))? else {
          return Ok(Outcome::Done(None));
        };
        patch.apply(&mut tag);

        conn.execute(
          "UPDATE tags SET title = ?2, color = ?3 WHERE tag_id = ?1",
          params![encode_uuid(tag_id), tag.title, tag.color],
        )?;
        Ok(Outcome::Done(Some(tag)))
      })
      .await
  }

  async fn delete_tag(&self, tag_id: Uuid) -> Result<bool> {
    self
      .write(move |conn| {
        let t = encode_uuid(tag_id);
        conn.execute("DELETE FROM document_tags WHERE tag_id = ?1", params![t])?;
        let removed = conn.execute("DELETE FROM tags WHERE tag_id = ?1", params![t])?;
        Ok(Outcome::Done(removed > 0))
      })
      .await
  }

  async fn resolve_tags(&self, collection_id: Uuid, items: Vec<String>) -> Result<Vec<Uuid>> {
    self
      .write(move |conn| {
        if collection_row(conn, collection_id)?.is_none() {
          return Ok(Outcome::Refused(quire_core::Error::CollectionNotFound(collection_id)));
        }
        Ok(match tags::resolve(conn, collection_id, &items)? {
          Resolution::Resolved(ids) => Outcome::Done(ids),
          Resolution::Unresolvable(title) => unresolvable(collection_id, title),
        })
      })
      .await
  }

  async fn set_document_tags(&self, document_id: Uuid, items: Vec<String>) -> Result<Vec<Tag>> {
    self
      .write(move |conn| {
        let Some(document) = document_row(conn, document_id)? else {
          return Ok(Outcome::Refused(quire_core::Error::DocumentNotFound(document_id)));
        };
        let ids = match tags_of_collection(conn, document.collection_id, &items)? {
          Outcome::Done(ids) => ids,
          Outcome::Refused(err) => return Ok(Outcome::Refused(err)),
        };

        let d = encode_uuid(document_id);
        conn.execute("DELETE FROM document_tags WHERE document_id = ?1", params![d])?;
        for id in ids {
          conn.execute(
            "INSERT INTO document_tags (document_id, tag_id) VALUES (?1, ?2)",
            params![d, encode_uuid(id)],
          )?;
        }
        Ok(Outcome::Done(tags::for_document(conn, &d)?))
      })
      .await
  }

  async fn add_document_tag(&self, document_id: Uuid, tag_id: Uuid) -> Result<bool> {
    self
      .write(move |conn| {
        let Some(document) = document_row(conn, document_id)? else {
          return Ok(Outcome::Refused(quire_core::Error::DocumentNotFound(document_id)));
        };
        match tags::get(conn, &encode_uuid(tag_id))? {
          Some(tag) if Some(tag.collection_id) == document.collection_id => {}
          _ => return Ok(Outcome::Refused(quire_core::Error::TagNotFound(tag_id))),
        }

        let added = conn.execute(
          "INSERT OR IGNORE INTO document_tags (document_id, tag_id) VALUES (?1, ?2)",
          params![encode_uuid(document_id), encode_uuid(tag_id)],
        )?;
        Ok(Outcome::Done(added > 0))
      })
      .await
  }

  async fn remove_document_tag(&self, document_id: Uuid, tag_id: Uuid) -> Result<bool> {
    self
      .write(move |conn| {
        let removed = conn.execute(
          "DELETE FROM document_tags WHERE document_id = ?1 AND tag_id = ?2",
          params![encode_uuid(document_id), encode_uuid(tag_id)],
        )?;
        Ok(Outcome::Done(removed > 0))
      })
      .await
  }

  async fn document_tags(&self, document_id: Uuid) -> Result<Vec<Tag>> {
    self
      .read(move |conn| tags::for_document(conn, &encode_uuid(document_id)))
      .await
  }
}
