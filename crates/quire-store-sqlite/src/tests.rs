//! Integration tests for `SqliteStore` against in-memory and on-disk
//! databases.

use quire_core::{
  PermissionLevel,
  audit::{CollectionAction, DocumentAction},
  collection::{CollectionPatch, NewCollection},
  document::{DocumentPatch, NewDocument},
  store::CollectionStore,
  tag::{NewTag, TagPatch},
  user::User,
};
use uuid::Uuid;

use crate::{Error, SqliteStore, StoreConfig};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, name: &str) -> User {
  s.register_user(name.into(), None).await.unwrap()
}

fn shelf() -> NewCollection {
  NewCollection {
    title:       Some("Shelf".into()),
    description: None,
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_and_find_user() {
  let s = store().await;
  let alice = s
    .register_user("alice".into(), Some("Alice Liddell".into()))
    .await
    .unwrap();

  let found = s.get_user_by_name("alice".into()).await.unwrap().unwrap();
  assert_eq!(found.user_id, alice.user_id);
  assert_eq!(found.display.as_deref(), Some("Alice Liddell"));
  assert!(s.get_user_by_name("bob".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_username_is_an_integrity_error() {
  let s = store().await;
  user(&s, "alice").await;
  let err = s.register_user("alice".into(), None).await.unwrap_err();
  assert!(err.is_integrity(), "got {err:?}");
}

// ─── Collections ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn creator_becomes_owner() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();

  let perm = s
    .get_permission(c.collection_id, alice.user_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(perm.level, PermissionLevel::Owner);
  assert_eq!(s.count_owners(c.collection_id).await.unwrap(), 1);

  let audits = s.permission_audits(c.collection_id).await.unwrap();
  assert_eq!(audits.len(), 1);
  assert!(audits[0].is_grant());
  assert_eq!(audits[0].new_level, Some(PermissionLevel::Owner));

  let lifecycle = s.collection_audits(c.collection_id).await.unwrap();
  assert_eq!(lifecycle.len(), 1);
  assert_eq!(lifecycle[0].action, CollectionAction::Create);
  assert_eq!(lifecycle[0].performed_by, Some(alice.user_id));
}

#[tokio::test]
async fn create_collection_for_unknown_user_leaves_nothing_behind() {
  let s = store().await;
  let err = s.create_collection(shelf(), Uuid::new_v4()).await.unwrap_err();
  assert!(err.is_integrity(), "got {err:?}");

  let ghost = user(&s, "ghost").await;
  assert!(s.list_user_collections(ghost.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_collection_applies_patch_and_audits() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();

  let patch = CollectionPatch {
    summary: Some("Books to read".into()),
    ..Default::default()
  };
  let updated = s
    .update_collection(c.collection_id, patch, alice.user_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.title.as_deref(), Some("Shelf"));
  assert_eq!(updated.summary.as_deref(), Some("Books to read"));

  let audits = s.collection_audits(c.collection_id).await.unwrap();
  assert_eq!(audits.len(), 2);
  assert_eq!(audits[0].action, CollectionAction::Update);

  let missing = s
    .update_collection(Uuid::new_v4(), CollectionPatch::default(), alice.user_id)
    .await
    .unwrap();
  assert!(missing.is_none());
}

#[tokio::test]
async fn list_user_collections_follows_permissions() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let mine = s.create_collection(shelf(), alice.user_id).await.unwrap();
  s.create_collection(shelf(), bob.user_id).await.unwrap();

  assert_eq!(s.list_user_collections(alice.user_id).await.unwrap().len(), 1);

  s.grant(mine.collection_id, bob.user_id, PermissionLevel::Read, alice.user_id)
    .await
    .unwrap();
  assert_eq!(s.list_user_collections(bob.user_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn delete_collection_cascades() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();
  s.grant(c.collection_id, bob.user_id, PermissionLevel::Edit, alice.user_id)
    .await
    .unwrap();
  let doc = s
    .create_document(
      NewDocument {
        collection_id: Some(c.collection_id),
        title:         Some("Notes".into()),
        description:   None,
      },
      Some(bob.user_id),
    )
    .await
    .unwrap();
  s.set_document_tags(doc.document_id, vec!["urgent".into()])
    .await
    .unwrap();

  assert!(s.delete_collection(c.collection_id, alice.user_id).await.unwrap());

  assert!(s.get_collection(c.collection_id).await.unwrap().is_none());
  assert!(s.get_document(doc.document_id).await.unwrap().is_none());
  assert!(s.list_permissions(c.collection_id).await.unwrap().is_empty());
  assert!(s.permission_audits(c.collection_id).await.unwrap().is_empty());
  assert!(s.collection_audits(c.collection_id).await.unwrap().is_empty());
  assert!(s.document_audits(doc.document_id).await.unwrap().is_empty());
  assert!(s.list_tags(c.collection_id).await.unwrap().is_empty());

  assert!(!s.delete_collection(c.collection_id, alice.user_id).await.unwrap());
}

#[tokio::test]
async fn deleting_a_collection_keeps_audits_of_documents_moved_out() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let old = s.create_collection(shelf(), alice.user_id).await.unwrap();
  let new = s.create_collection(shelf(), alice.user_id).await.unwrap();
  let in_old = || NewDocument {
    collection_id: Some(old.collection_id),
    ..Default::default()
  };

  let moved = s.create_document(in_old(), Some(alice.user_id)).await.unwrap();
  s.move_document(moved.document_id, Some(new.collection_id), Some(alice.user_id))
    .await
    .unwrap()
    .unwrap();
  let deleted = s.create_document(in_old(), Some(alice.user_id)).await.unwrap();
  assert!(s.delete_document(deleted.document_id, Some(alice.user_id)).await.unwrap());

  assert!(s.delete_collection(old.collection_id, alice.user_id).await.unwrap());

  assert!(s.get_document(moved.document_id).await.unwrap().is_some());
  let history = s.document_audits(moved.document_id).await.unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[0].action, DocumentAction::Create);
  // A document deleted while still in the collection goes with it.
  assert!(s.document_audits(deleted.document_id).await.unwrap().is_empty());
}

// ─── Access control ──────────────────────────────────────────────────────────

#[tokio::test]
async fn has_permission_follows_the_hierarchy() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();
  s.grant(c.collection_id, bob.user_id, PermissionLevel::Edit, alice.user_id)
    .await
    .unwrap();

  let id = c.collection_id;
  assert!(s.has_permission(id, bob.user_id, PermissionLevel::Read).await.unwrap());
  assert!(s.has_permission(id, bob.user_id, PermissionLevel::Edit).await.unwrap());
  assert!(!s.has_permission(id, bob.user_id, PermissionLevel::Owner).await.unwrap());
  assert!(s.has_permission(id, alice.user_id, PermissionLevel::Owner).await.unwrap());
  assert!(!s.has_permission(id, carol.user_id, PermissionLevel::Read).await.unwrap());
  assert!(
    !s.has_permission(Uuid::new_v4(), alice.user_id, PermissionLevel::Read)
      .await
      .unwrap()
  );
}

#[tokio::test]
async fn regrant_same_level_is_idempotent_but_audited() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();

  let first = s
    .grant(c.collection_id, bob.user_id, PermissionLevel::Read, alice.user_id)
    .await
    .unwrap();
  let second = s
    .grant(c.collection_id, bob.user_id, PermissionLevel::Read, alice.user_id)
    .await
    .unwrap();
  assert_eq!(first.permission_id, second.permission_id);
  assert_eq!(s.list_permissions(c.collection_id).await.unwrap().len(), 2);

  let bob_audits: Vec<_> = s
    .permission_audits(c.collection_id)
    .await
    .unwrap()
    .into_iter()
    .filter(|a| a.user_id == bob.user_id)
    .collect();
  assert_eq!(bob_audits.len(), 2);
  assert_eq!(bob_audits[0].old_level, None);
  assert_eq!(bob_audits[1].old_level, Some(PermissionLevel::Read));
  assert_eq!(bob_audits[1].new_level, Some(PermissionLevel::Read));
}

#[tokio::test]
async fn grant_to_existing_holder_overwrites() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();

  s.grant(c.collection_id, bob.user_id, PermissionLevel::Read, alice.user_id)
    .await
    .unwrap();
  let upgraded = s
    .grant(c.collection_id, bob.user_id, PermissionLevel::Owner, alice.user_id)
    .await
    .unwrap();
  assert_eq!(upgraded.level, PermissionLevel::Owner);
  assert_eq!(s.count_owners(c.collection_id).await.unwrap(), 2);
}

#[tokio::test]
async fn grant_to_unknown_user_is_an_integrity_error() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();

  let err = s
    .grant(c.collection_id, Uuid::new_v4(), PermissionLevel::Read, alice.user_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Integrity(_)), "got {err:?}");
  assert_eq!(s.permission_audits(c.collection_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_permission_requires_an_existing_row() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();

  let missing = s
    .update_permission(c.collection_id, bob.user_id, PermissionLevel::Edit, alice.user_id)
    .await
    .unwrap();
  assert!(missing.is_none());
  assert!(s.get_permission(c.collection_id, bob.user_id).await.unwrap().is_none());
  assert_eq!(s.permission_audits(c.collection_id).await.unwrap().len(), 1);

  s.grant(c.collection_id, bob.user_id, PermissionLevel::Read, alice.user_id)
    .await
    .unwrap();
  let updated = s
    .update_permission(c.collection_id, bob.user_id, PermissionLevel::Edit, alice.user_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.level, PermissionLevel::Edit);

  let last = s.permission_audits(c.collection_id).await.unwrap().pop().unwrap();
  assert_eq!(last.old_level, Some(PermissionLevel::Read));
  assert_eq!(last.new_level, Some(PermissionLevel::Edit));
  assert_eq!(last.permission_id, updated.permission_id);
}

#[tokio::test]
async fn revoke_round_trip_is_audited() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();

  let granted = s
    .grant(c.collection_id, bob.user_id, PermissionLevel::Owner, alice.user_id)
    .await
    .unwrap();
  assert!(s.revoke(c.collection_id, bob.user_id, alice.user_id).await.unwrap());
  assert!(s.get_permission(c.collection_id, bob.user_id).await.unwrap().is_none());

  let last = s.permission_audits(c.collection_id).await.unwrap().pop().unwrap();
  assert!(last.is_revoke());
  assert_eq!(last.permission_id, granted.permission_id);
  assert_eq!(last.old_level, Some(PermissionLevel::Owner));
  assert_eq!(last.new_level, None);
  assert_eq!(last.performed_by, alice.user_id);

  assert!(!s.revoke(c.collection_id, bob.user_id, alice.user_id).await.unwrap());
}

#[tokio::test]
async fn last_owner_cannot_be_revoked() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();
  s.grant(c.collection_id, bob.user_id, PermissionLevel::Edit, alice.user_id)
    .await
    .unwrap();
  let audits_before = s.permission_audits(c.collection_id).await.unwrap().len();

  let err = s
    .revoke(c.collection_id, alice.user_id, alice.user_id)
    .await
    .unwrap_err();
  assert!(err.is_policy_violation(), "got {err:?}");
  assert!(matches!(
    err,
    Error::Core(quire_core::Error::LastOwner(id)) if id == c.collection_id
  ));

  let perm = s
    .get_permission(c.collection_id, alice.user_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(perm.level, PermissionLevel::Owner);
  assert_eq!(
    s.permission_audits(c.collection_id).await.unwrap().len(),
    audits_before
  );

  assert!(s.revoke(c.collection_id, bob.user_id, alice.user_id).await.unwrap());
}

#[tokio::test]
async fn owner_may_leave_once_another_owner_exists() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();
  s.grant(c.collection_id, bob.user_id, PermissionLevel::Owner, alice.user_id)
    .await
    .unwrap();

  assert!(s.revoke(c.collection_id, alice.user_id, alice.user_id).await.unwrap());
  assert_eq!(s.count_owners(c.collection_id).await.unwrap(), 1);

  let err = s.revoke(c.collection_id, bob.user_id, bob.user_id).await.unwrap_err();
  assert!(err.is_policy_violation());
}

#[tokio::test]
async fn downgrading_the_last_owner_is_refused() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();

  let err = s
    .update_permission(c.collection_id, alice.user_id, PermissionLevel::Read, alice.user_id)
    .await
    .unwrap_err();
  assert!(err.is_policy_violation(), "got {err:?}");
  let err = s
    .grant(c.collection_id, alice.user_id, PermissionLevel::Edit, alice.user_id)
    .await
    .unwrap_err();
  assert!(err.is_policy_violation(), "got {err:?}");
  assert_eq!(s.count_owners(c.collection_id).await.unwrap(), 1);
  assert_eq!(s.permission_audits(c.collection_id).await.unwrap().len(), 1);

  // With a second owner in place the first may step down.
  s.grant(c.collection_id, bob.user_id, PermissionLevel::Owner, alice.user_id)
    .await
    .unwrap();
  let stepped_down = s
    .update_permission(c.collection_id, alice.user_id, PermissionLevel::Edit, alice.user_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(stepped_down.level, PermissionLevel::Edit);
  assert_eq!(s.count_owners(c.collection_id).await.unwrap(), 1);
}

#[tokio::test]
async fn regranting_owner_to_the_last_owner_is_allowed() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();

  s.grant(c.collection_id, alice.user_id, PermissionLevel::Owner, alice.user_id)
    .await
    .unwrap();
  assert_eq!(s.permission_audits(c.collection_id).await.unwrap().len(), 2);
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn document_lifecycle_is_audited_with_snapshots() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();

  let doc = s
    .create_document(
      NewDocument {
        collection_id: Some(c.collection_id),
        title:         Some("Draft".into()),
        description:   None,
      },
      Some(alice.user_id),
    )
    .await
    .unwrap();
  assert_eq!(doc.created_by, Some(alice.user_id));

  let patch = DocumentPatch {
    title: Some("Final".into()),
    ..Default::default()
  };
  let updated = s
    .update_document(doc.document_id, patch, Some(alice.user_id))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.title.as_deref(), Some("Final"));

  assert!(s.delete_document(doc.document_id, None).await.unwrap());
  assert!(s.get_document(doc.document_id).await.unwrap().is_none());

  let audits = s.document_audits(doc.document_id).await.unwrap();
  let actions: Vec<_> = audits.iter().map(|a| a.action).collect();
  assert_eq!(
    actions,
    [DocumentAction::Create, DocumentAction::Update, DocumentAction::Delete]
  );

  assert!(audits[0].old_values.is_none());
  assert_eq!(audits[1].old_values.as_ref().unwrap()["title"], "Draft");
  assert_eq!(audits[1].new_values.as_ref().unwrap()["title"], "Final");
  assert_eq!(
    audits[2].old_values.as_ref().unwrap()["document_id"],
    doc.document_id.to_string()
  );
  assert!(audits[2].new_values.is_none());
  assert_eq!(audits[2].performed_by, None);
}

#[tokio::test]
async fn missing_document_operations_report_absence() {
  let s = store().await;
  let id = Uuid::new_v4();
  assert!(s.update_document(id, DocumentPatch::default(), None).await.unwrap().is_none());
  assert!(s.move_document(id, None, None).await.unwrap().is_none());
  assert!(!s.delete_document(id, None).await.unwrap());
  assert!(s.document_audits(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn move_document_detaches_foreign_tags() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let from = s.create_collection(shelf(), alice.user_id).await.unwrap();
  let to = s.create_collection(shelf(), alice.user_id).await.unwrap();
  let doc = s
    .create_document(
      NewDocument {
        collection_id: Some(from.collection_id),
        ..Default::default()
      },
      None,
    )
    .await
    .unwrap();
  s.set_document_tags(doc.document_id, vec!["a".into(), "b".into()])
    .await
    .unwrap();

  let moved = s
    .move_document(doc.document_id, Some(to.collection_id), Some(alice.user_id))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(moved.collection_id, Some(to.collection_id));
  assert!(s.document_tags(doc.document_id).await.unwrap().is_empty());
  assert_eq!(s.list_tags(from.collection_id).await.unwrap().len(), 2);

  let err = s
    .move_document(doc.document_id, Some(Uuid::new_v4()), None)
    .await
    .unwrap_err();
  assert!(err.is_not_found(), "got {err:?}");
}

// ─── Tags ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_tag_title_is_an_integrity_error() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();
  let new = || NewTag {
    collection_id: c.collection_id,
    title:         "urgent".into(),
    color:         "#ff0000".into(),
  };

  s.create_tag(new()).await.unwrap();
  let err = s.create_tag(new()).await.unwrap_err();
  assert!(err.is_integrity(), "got {err:?}");
  assert_eq!(s.list_tags(c.collection_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn tag_update_and_delete() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();
  let tag = s
    .create_tag(NewTag {
      collection_id: c.collection_id,
      title:         "later".into(),
      color:         "#00ff00".into(),
    })
    .await
    .unwrap();

  let renamed = s
    .update_tag(tag.tag_id, TagPatch {
      title: Some("someday".into()),
      color: None,
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(renamed.title, "someday");
  assert_eq!(renamed.color, "#00ff00");
  assert!(
    s.get_tag_by_title(c.collection_id, "later".into())
      .await
      .unwrap()
      .is_none()
  );

  assert!(s.delete_tag(tag.tag_id).await.unwrap());
  assert!(!s.delete_tag(tag.tag_id).await.unwrap());
  assert!(s.update_tag(tag.tag_id, TagPatch::default()).await.unwrap().is_none());
}

#[tokio::test]
async fn resolve_tags_creates_missing_titles_once() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();

  let first = s
    .resolve_tags(c.collection_id, vec!["urgent".into(), "home".into()])
    .await
    .unwrap();
  let second = s
    .resolve_tags(c.collection_id, vec!["home".into(), "urgent".into()])
    .await
    .unwrap();
  assert_eq!(first.len(), 2);
  assert_eq!(second, vec![first[1], first[0]]);

  let tags = s.list_tags(c.collection_id).await.unwrap();
  assert_eq!(tags.len(), 2);
  assert!(tags.iter().all(|t| t.color.starts_with('#') && t.color.len() == 7));
}

#[tokio::test]
async fn resolve_tags_passes_ids_through() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();

  let unknown = Uuid::new_v4();
  let ids = s
    .resolve_tags(c.collection_id, vec![unknown.to_string()])
    .await
    .unwrap();
  assert_eq!(ids, vec![unknown]);
  assert!(s.list_tags(c.collection_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn resolve_tags_on_missing_collection_is_not_found() {
  let s = store().await;
  let err = s
    .resolve_tags(Uuid::new_v4(), vec!["urgent".into()])
    .await
    .unwrap_err();
  assert!(err.is_not_found(), "got {err:?}");
}

#[tokio::test]
async fn resolve_tags_rejects_blank_titles_atomically() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();

  let err = s
    .resolve_tags(c.collection_id, vec!["fresh".into(), " ".into()])
    .await
    .unwrap_err();
  assert!(err.is_integrity(), "got {err:?}");
  assert!(s.list_tags(c.collection_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn set_document_tags_replaces_the_set() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();
  let doc = s
    .create_document(
      NewDocument {
        collection_id: Some(c.collection_id),
        ..Default::default()
      },
      None,
    )
    .await
    .unwrap();

  let tags = s
    .set_document_tags(doc.document_id, vec!["b".into(), "a".into()])
    .await
    .unwrap();
  let titles: Vec<_> = tags.iter().map(|t| t.title.as_str()).collect();
  assert_eq!(titles, ["a", "b"]);

  let a = tags[0].tag_id;
  let tags = s
    .set_document_tags(doc.document_id, vec![a.to_string(), "c".into()])
    .await
    .unwrap();
  let titles: Vec<_> = tags.iter().map(|t| t.title.as_str()).collect();
  assert_eq!(titles, ["a", "c"]);

  assert!(!s.add_document_tag(doc.document_id, a).await.unwrap());
  assert!(s.remove_document_tag(doc.document_id, a).await.unwrap());
  assert!(!s.remove_document_tag(doc.document_id, a).await.unwrap());
  assert!(s.add_document_tag(doc.document_id, a).await.unwrap());
  assert_eq!(s.document_tags(doc.document_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn set_document_tags_rejects_foreign_ids() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let home = s.create_collection(shelf(), alice.user_id).await.unwrap();
  let other = s.create_collection(shelf(), alice.user_id).await.unwrap();
  let foreign = s
    .resolve_tags(other.collection_id, vec!["elsewhere".into()])
    .await
    .unwrap()[0];
  let doc = s
    .create_document(
      NewDocument {
        collection_id: Some(home.collection_id),
        ..Default::default()
      },
      None,
    )
    .await
    .unwrap();

  let err = s
    .set_document_tags(doc.document_id, vec!["mine".into(), foreign.to_string()])
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(quire_core::Error::TagNotFound(id)) if id == foreign
  ));
  // The title resolved before the failure is rolled back with it.
  assert!(s.list_tags(home.collection_id).await.unwrap().is_empty());

  let err = s.add_document_tag(doc.document_id, foreign).await.unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn loose_document_cannot_resolve_titles() {
  let s = store().await;
  let doc = s.create_document(NewDocument::default(), None).await.unwrap();

  let err = s
    .set_document_tags(doc.document_id, vec!["urgent".into()])
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(quire_core::Error::TagUnresolvable(ref t)) if t == "urgent"
  ));
  assert!(s.set_document_tags(doc.document_id, vec![]).await.unwrap().is_empty());

  let err = s
    .set_document_tags(Uuid::new_v4(), vec![])
    .await
    .unwrap_err();
  assert!(err.is_not_found());
}

/// An on-disk store whose tag titles are also unique case-insensitively, so
/// a title differing only in case conflicts on insert without an exact match.
async fn store_with_nocase_titles() -> (tempfile::TempDir, SqliteStore) {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("quire.db");
  let s = SqliteStore::open_with(&StoreConfig {
    path: path.clone(),
    ..StoreConfig::default()
  })
  .await
  .unwrap();
  rusqlite::Connection::open(&path)
    .unwrap()
    .execute_batch(
      "CREATE UNIQUE INDEX tags_title_nocase ON tags (collection_id, title COLLATE NOCASE)",
    )
    .unwrap();
  (dir, s)
}

#[tokio::test]
async fn resolve_tags_refuses_a_conflict_it_cannot_reread() {
  let (_dir, s) = store_with_nocase_titles().await;
  let alice = user(&s, "alice").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();
  s.resolve_tags(c.collection_id, vec!["urgent".into()])
    .await
    .unwrap();

  let err = s
    .resolve_tags(c.collection_id, vec!["fresh".into(), "Urgent".into()])
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(quire_core::Error::TagUnresolvable(ref t)) if t == "Urgent"
  ));
  let titles: Vec<_> = s
    .list_tags(c.collection_id)
    .await
    .unwrap()
    .into_iter()
    .map(|t| t.title)
    .collect();
  assert_eq!(titles, ["urgent"]);
}

#[tokio::test]
async fn set_document_tags_refuses_a_conflict_it_cannot_reread() {
  let (_dir, s) = store_with_nocase_titles().await;
  let alice = user(&s, "alice").await;
  let c = s.create_collection(shelf(), alice.user_id).await.unwrap();
  let doc = s
    .create_document(
      NewDocument {
        collection_id: Some(c.collection_id),
        ..Default::default()
      },
      None,
    )
    .await
    .unwrap();
  s.set_document_tags(doc.document_id, vec!["urgent".into()])
    .await
    .unwrap();

  let err = s
    .set_document_tags(doc.document_id, vec!["fresh".into(), "Urgent".into()])
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(quire_core::Error::TagUnresolvable(ref t)) if t == "Urgent"
  ));
  let attached = s.document_tags(doc.document_id).await.unwrap();
  assert_eq!(attached.len(), 1);
  assert_eq!(attached[0].title, "urgent");
  assert_eq!(s.list_tags(c.collection_id).await.unwrap().len(), 1);
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

async fn shared_stores() -> (tempfile::TempDir, SqliteStore, SqliteStore) {
  let dir = tempfile::tempdir().unwrap();
  let config = StoreConfig {
    path: dir.path().join("quire.db"),
    ..StoreConfig::default()
  };
  let a = SqliteStore::open_with(&config).await.unwrap();
  let b = SqliteStore::open_with(&config).await.unwrap();
  (dir, a, b)
}

#[tokio::test]
async fn concurrent_owner_revokes_keep_one_owner() {
  let (_dir, a, b) = shared_stores().await;
  let alice = user(&a, "alice").await;
  let bob = user(&a, "bob").await;
  let c = a.create_collection(shelf(), alice.user_id).await.unwrap();
  a.grant(c.collection_id, bob.user_id, PermissionLevel::Owner, alice.user_id)
    .await
    .unwrap();

  let (left, right) = tokio::join!(
    a.revoke(c.collection_id, alice.user_id, alice.user_id),
    b.revoke(c.collection_id, bob.user_id, bob.user_id),
  );

  let results = [left, right];
  let succeeded = results.iter().filter(|r| matches!(r, Ok(true))).count();
  let refused = results
    .iter()
    .filter(|r| matches!(r, Err(e) if e.is_policy_violation()))
    .count();
  assert_eq!((succeeded, refused), (1, 1), "got {results:?}");
  assert_eq!(a.count_owners(c.collection_id).await.unwrap(), 1);

  let revokes = a
    .permission_audits(c.collection_id)
    .await
    .unwrap()
    .into_iter()
    .filter(|audit| audit.is_revoke())
    .count();
  assert_eq!(revokes, 1);
}

#[tokio::test]
async fn concurrent_resolves_agree_on_one_tag() {
  let (_dir, a, b) = shared_stores().await;
  let alice = user(&a, "alice").await;
  let c = a.create_collection(shelf(), alice.user_id).await.unwrap();

  let (left, right) = tokio::join!(
    a.resolve_tags(c.collection_id, vec!["urgent".into()]),
    b.resolve_tags(c.collection_id, vec!["urgent".into()]),
  );

  assert_eq!(left.unwrap(), right.unwrap());
  assert_eq!(b.list_tags(c.collection_id).await.unwrap().len(), 1);
}
