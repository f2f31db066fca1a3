//! Collections and the permission rows that govern them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::level::PermissionLevel;

/// A user-shared container of documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
  pub collection_id: Uuid,
  pub title:         Option<String>,
  pub description:   Option<String>,
  pub summary:       Option<String>,
}

/// Input for [`CollectionStore::create_collection`](crate::store::CollectionStore::create_collection).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCollection {
  pub title:       Option<String>,
  pub description: Option<String>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionPatch {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub summary:     Option<String>,
}

impl CollectionPatch {
  pub fn apply(self, collection: &mut Collection) {
    if let Some(title) = self.title {
      collection.title = Some(title);
    }
    if let Some(description) = self.description {
      collection.description = Some(description);
    }
    if let Some(summary) = self.summary {
      collection.summary = Some(summary);
    }
  }
}

/// The `(collection, user) -> level` relation. At most one row exists per
/// pair; updates overwrite `level` in place and keep `permission_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionPermission {
  pub permission_id: Uuid,
  pub collection_id: Uuid,
  pub user_id:       Uuid,
  pub level:         PermissionLevel,
}
