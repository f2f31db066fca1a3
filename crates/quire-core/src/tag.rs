//! Tags and tag references.
//!
//! A tag title is unique within its collection (exact, case-sensitive
//! match). Callers may refer to a tag either by id or by title; titles that do
//! not exist yet are created on demand by the store.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
  pub tag_id:        Uuid,
  pub collection_id: Uuid,
  pub title:         String,
  /// Display colour, `#rrggbb`.
  pub color:         String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTag {
  pub collection_id: Uuid,
  pub title:         String,
  pub color:         String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagPatch {
  pub title: Option<String>,
  pub color: Option<String>,
}

impl TagPatch {
  pub fn apply(self, tag: &mut Tag) {
    if let Some(title) = self.title {
      tag.title = title;
    }
    if let Some(color) = self.color {
      tag.color = color;
    }
  }
}

/// One item of a mixed id/title list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRef {
  Id(Uuid),
  Title(String),
}

impl TagRef {
  /// Classify `item`.
  ///
  /// Only the canonical 36-character hyphenated form (either case) counts as
  /// an id; anything else, including the braced or simple UUID forms, is a
  /// title.
  pub fn parse(item: &str) -> Self {
    if item.len() == 36
      && let Ok(id) = Uuid::try_parse(item)
    {
      return Self::Id(id);
    }
    Self::Title(item.to_owned())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hyphenated_uuid_is_an_id() {
    let id = Uuid::new_v4();
    assert_eq!(TagRef::parse(&id.to_string()), TagRef::Id(id));
    assert_eq!(
      TagRef::parse(&id.to_string().to_uppercase()),
      TagRef::Id(id)
    );
  }

  #[test]
  fn free_text_is_a_title() {
    assert_eq!(TagRef::parse("urgent"), TagRef::Title("urgent".into()));
    assert_eq!(TagRef::parse(""), TagRef::Title(String::new()));
  }

  #[test]
  fn other_uuid_forms_are_titles() {
    let id = Uuid::new_v4();
    let simple = id.simple().to_string();
    let braced = id.braced().to_string();
    assert_eq!(TagRef::parse(&simple), TagRef::Title(simple.clone()));
    assert_eq!(TagRef::parse(&braced), TagRef::Title(braced.clone()));
  }

  #[test]
  fn near_miss_of_uuid_shape_is_a_title() {
    let item = "0000000g-0000-0000-0000-000000000000";
    assert_eq!(TagRef::parse(item), TagRef::Title(item.into()));
  }

  #[test]
  fn patch_only_touches_given_fields() {
    let mut tag = Tag {
      tag_id:        Uuid::new_v4(),
      collection_id: Uuid::new_v4(),
      title:         "draft".into(),
      color:         "#aabbcc".into(),
    };
    TagPatch { title: None, color: Some("#000000".into()) }.apply(&mut tag);
    assert_eq!(tag.title, "draft");
    assert_eq!(tag.color, "#000000");
  }
}
