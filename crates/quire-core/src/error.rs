//! Error types for `quire-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("collection not found: {0}")]
  CollectionNotFound(Uuid),

  #[error("document not found: {0}")]
  DocumentNotFound(Uuid),

  #[error("tag not found: {0}")]
  TagNotFound(Uuid),

  /// Revoking the permission would leave the collection without an owner.
  #[error("cannot remove the last owner of collection {0}")]
  LastOwner(Uuid),

  /// A title could be neither found nor created, even after re-reading.
  #[error("unable to create tag '{0}'")]
  TagUnresolvable(String),
}

impl Error {
  /// The referenced row does not exist.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::CollectionNotFound(_) | Self::DocumentNotFound(_) | Self::TagNotFound(_)
    )
  }

  /// The request was refused by an access-control rule.
  pub fn is_policy_violation(&self) -> bool { matches!(self, Self::LastOwner(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
