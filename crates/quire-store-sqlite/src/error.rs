//! Error type for `quire-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] quire_core::Error),

  /// A unique, foreign-key or check constraint rejected the write. The
  /// transaction has been rolled back.
  #[error("integrity violation: {0}")]
  Integrity(String),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),
}

impl Error {
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::Core(e) if e.is_not_found())
  }

  pub fn is_policy_violation(&self) -> bool {
    matches!(self, Self::Core(e) if e.is_policy_violation())
  }

  pub fn is_integrity(&self) -> bool { matches!(self, Self::Integrity(_)) }
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(err: tokio_rusqlite::Error) -> Self {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(code, msg)) = &err
      && code.code == ErrorCode::ConstraintViolation
    {
      return Self::Integrity(msg.clone().unwrap_or_else(|| code.to_string()));
    }
    Self::Database(err)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
