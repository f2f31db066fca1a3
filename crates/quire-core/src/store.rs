//! The `CollectionStore` trait.
//!
//! The trait is the access-control and audit contract that storage backends
//! (e.g. `quire-store-sqlite`) implement. The surrounding request layer calls
//! [`has_permission`](CollectionStore::has_permission) before dispatching any
//! collection-scoped operation, then calls the mutation itself.
//!
//! Every mutating method is atomic: the primary change and its audit row are
//! committed together or not at all.

use std::future::Future;

use uuid::Uuid;

use crate::{
  audit::{CollectionAudit, DocumentAudit, PermissionAudit},
  collection::{Collection, CollectionPatch, CollectionPermission, NewCollection},
  document::{Document, DocumentPatch, NewDocument},
  level::PermissionLevel,
  tag::{NewTag, Tag, TagPatch},
  user::User,
};

/// Abstraction over a Quire store backend.
///
/// Absence is reported as `None`/`false`, never as an error. Refusals by the
/// last-owner rule and storage-level integrity violations are errors.
pub trait CollectionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  fn register_user(
    &self,
    username: String,
    display: Option<String>,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user_by_name(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Collections ───────────────────────────────────────────────────────

  /// Create a collection owned by `creator`. The creator's `OWNER` grant and
  /// the `CREATE` audit are part of the same commit.
  fn create_collection(
    &self,
    input: NewCollection,
    creator: Uuid,
  ) -> impl Future<Output = Result<Collection, Self::Error>> + Send + '_;

  fn get_collection(
    &self,
    collection_id: Uuid,
  ) -> impl Future<Output = Result<Option<Collection>, Self::Error>> + Send + '_;

  fn update_collection(
    &self,
    collection_id: Uuid,
    patch: CollectionPatch,
    actor: Uuid,
  ) -> impl Future<Output = Result<Option<Collection>, Self::Error>> + Send + '_;

  /// Delete a collection together with its permissions, audits, tags and
  /// documents. Returns `false` if it did not exist.
  fn delete_collection(
    &self,
    collection_id: Uuid,
    actor: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Collections on which `user_id` holds any level, ordered by title.
  fn list_user_collections(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Collection>, Self::Error>> + Send + '_;

  /// Lifecycle audits for a collection, newest first.
  fn collection_audits(
    &self,
    collection_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CollectionAudit>, Self::Error>> + Send + '_;

  // ── Access control ────────────────────────────────────────────────────

  /// Whether `user_id` holds at least `required` on the collection. A user
  /// with no permission row is denied.
  fn has_permission(
    &self,
    collection_id: Uuid,
    user_id: Uuid,
    required: PermissionLevel,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn get_permission(
    &self,
    collection_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<CollectionPermission>, Self::Error>> + Send + '_;

  fn list_permissions(
    &self,
    collection_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CollectionPermission>, Self::Error>> + Send + '_;

  fn count_owners(
    &self,
    collection_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Grant `level` to `user_id`. If the user already holds a level this
  /// behaves exactly like [`update_permission`](Self::update_permission).
  fn grant(
    &self,
    collection_id: Uuid,
    user_id: Uuid,
    level: PermissionLevel,
    actor: Uuid,
  ) -> impl Future<Output = Result<CollectionPermission, Self::Error>> + Send + '_;

  /// Overwrite an existing level in place. Returns `None` if the user holds
  /// no level. An unchanged level is still audited.
  ///
  /// Demoting the collection's only `OWNER` fails without mutating anything.
  fn update_permission(
    &self,
    collection_id: Uuid,
    user_id: Uuid,
    level: PermissionLevel,
    actor: Uuid,
  ) -> impl Future<Output = Result<Option<CollectionPermission>, Self::Error>> + Send + '_;

  /// Remove the user's permission row. Returns `false` if there was none.
  ///
  /// Fails without mutating anything if the row is the collection's only
  /// `OWNER`.
  fn revoke(
    &self,
    collection_id: Uuid,
    user_id: Uuid,
    actor: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Permission audits for a collection, oldest first, including audits of
  /// rows that have since been revoked.
  fn permission_audits(
    &self,
    collection_id: Uuid,
  ) -> impl Future<Output = Result<Vec<PermissionAudit>, Self::Error>> + Send + '_;

  // ── Documents ─────────────────────────────────────────────────────────

  fn create_document(
    &self,
    input: NewDocument,
    actor: Option<Uuid>,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + '_;

  fn get_document(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  fn update_document(
    &self,
    document_id: Uuid,
    patch: DocumentPatch,
    actor: Option<Uuid>,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  /// Move a document to another collection, or out of every collection with
  /// `None`. Tags belonging to the previous collection are detached.
  fn move_document(
    &self,
    document_id: Uuid,
    collection_id: Option<Uuid>,
    actor: Option<Uuid>,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  fn delete_document(
    &self,
    document_id: Uuid,
    actor: Option<Uuid>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Audits for a document, oldest first. Audits outlive the document.
  fn document_audits(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Vec<DocumentAudit>, Self::Error>> + Send + '_;

  // ── Tags ──────────────────────────────────────────────────────────────

  fn create_tag(
    &self,
    input: NewTag,
  ) -> impl Future<Output = Result<Tag, Self::Error>> + Send + '_;

  fn get_tag_by_title(
    &self,
    collection_id: Uuid,
    title: String,
  ) -> impl Future<Output = Result<Option<Tag>, Self::Error>> + Send + '_;

  fn list_tags(
    &self,
    collection_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;

  fn update_tag(
    &self,
    tag_id: Uuid,
    patch: TagPatch,
  ) -> impl Future<Output = Result<Option<Tag>, Self::Error>> + Send + '_;

  /// Delete a tag and detach it from every document.
  fn delete_tag(
    &self,
    tag_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Resolve a mixed list of tag ids and titles to tag ids.
  ///
  /// Ids pass through untouched. Each title maps to the collection's tag with
  /// that title, which is created (with a generated colour) when missing.
  /// Output follows input order with duplicates removed. Safe to call
  /// concurrently for the same new title: every caller gets the same id.
  fn resolve_tags(
    &self,
    collection_id: Uuid,
    items: Vec<String>,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Replace a document's tag set with the resolved `items`.
  fn set_document_tags(
    &self,
    document_id: Uuid,
    items: Vec<String>,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;

  /// Attach one tag. Returns `false` if it was already attached.
  fn add_document_tag(
    &self,
    document_id: Uuid,
    tag_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn remove_document_tag(
    &self,
    document_id: Uuid,
    tag_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn document_tags(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;
}
