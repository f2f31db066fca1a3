//! Documents. Their content lives in object storage; the store tracks only
//! metadata, collection membership and tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
  pub document_id:   Uuid,
  /// `None` for a document that has been removed from every collection.
  pub collection_id: Option<Uuid>,
  pub created_by:    Option<Uuid>,
  pub title:         Option<String>,
  pub description:   Option<String>,
  pub summary:       Option<String>,
  pub created_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDocument {
  pub collection_id: Option<Uuid>,
  pub title:         Option<String>,
  pub description:   Option<String>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentPatch {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub summary:     Option<String>,
}

impl DocumentPatch {
  pub fn apply(self, document: &mut Document) {
    if let Some(title) = self.title {
      document.title = Some(title);
    }
    if let Some(description) = self.description {
      document.description = Some(description);
    }
    if let Some(summary) = self.summary {
      document.summary = Some(summary);
    }
  }
}
