//! Store configuration, deserialised by the caller and handed to
//! [`SqliteStore::open_with`](crate::SqliteStore::open_with).

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
  /// Database file; created if missing.
  pub path:            PathBuf,
  /// How long a writer waits for another connection's write lock before
  /// giving up with `SQLITE_BUSY`.
  pub busy_timeout_ms: u64,
}

impl StoreConfig {
  pub fn busy_timeout(&self) -> Duration { Duration::from_millis(self.busy_timeout_ms) }
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      path:            PathBuf::from("quire.db"),
      busy_timeout_ms: 5_000,
    }
  }
}
