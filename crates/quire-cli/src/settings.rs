//! Layered configuration: an optional TOML file, overridden by `QUIRE_*`
//! environment variables (`QUIRE_STORE__PATH`, `QUIRE_STORE__BUSY_TIMEOUT_MS`).

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use quire_store_sqlite::StoreConfig;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub store: StoreConfig,
}

impl Settings {
  pub fn load(path: &Path) -> anyhow::Result<Self> { Self::load_with(path, environment()) }

  fn load_with(path: &Path, env: config::Environment) -> anyhow::Result<Self> {
    let mut settings: Self = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(env)
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise Settings")?;

    settings.store.path = expand_tilde(&settings.store.path);
    Ok(settings)
  }
}

fn environment() -> config::Environment {
  config::Environment::with_prefix("QUIRE")
    .prefix_separator("_")
    .separator("__")
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  fn env(vars: &[(&str, &str)]) -> config::Environment {
    let map = vars
      .iter()
      .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
      .collect();
    environment().source(Some(map))
  }

  #[test]
  fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load_with(&dir.path().join("absent.toml"), env(&[])).unwrap();
    assert_eq!(settings.store.path, PathBuf::from("quire.db"));
    assert_eq!(settings.store.busy_timeout_ms, 5_000);
  }

  #[test]
  fn file_values_are_read() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[store]\npath = \"/var/lib/quire/quire.db\"\nbusy_timeout_ms = 250").unwrap();

    let settings = Settings::load_with(file.path(), env(&[])).unwrap();
    assert_eq!(settings.store.path, PathBuf::from("/var/lib/quire/quire.db"));
    assert_eq!(settings.store.busy_timeout_ms, 250);
  }

  #[test]
  fn environment_overrides_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[store]\npath = \"from-file.db\"").unwrap();

    let settings = Settings::load_with(
      file.path(),
      env(&[("QUIRE_STORE__PATH", "from-env.db")]),
    )
    .unwrap();
    assert_eq!(settings.store.path, PathBuf::from("from-env.db"));
    assert_eq!(settings.store.busy_timeout_ms, 5_000);
  }

  #[test]
  fn tilde_is_expanded() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/q.db")), PathBuf::from(home).join("q.db"));
    assert_eq!(expand_tilde(Path::new("/abs/q.db")), PathBuf::from("/abs/q.db"));
  }
}
