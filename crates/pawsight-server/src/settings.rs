//! Runtime configuration, deserialised from `config.toml` layered with
//! `PAWSIGHT_*` environment variables.

use std::path::{Path, PathBuf};

use pawsight_api::{ApiSettings, DEFAULT_MAX_BATCH};
use pawsight_insights::{NotifyPolicy, RuleConfig};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  pub store_path:            PathBuf,
  /// Argon2 PHC string from `pawsight hash-token`. Unset disables auth.
  pub api_token_hash:        Option<String>,
  /// Seconds between background insight cycles. `0` disables the loop.
  pub refresh_interval_secs: u64,
  pub max_batch:             usize,
  pub rules:                 RuleConfig,
  pub notify:                NotifyPolicy,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                  "127.0.0.1".to_owned(),
      port:                  8650,
      store_path:            PathBuf::from("~/.local/share/pawsight/pawsight.db"),
      api_token_hash:        None,
      refresh_interval_secs: 3600,
      max_batch:             DEFAULT_MAX_BATCH,
      rules:                 RuleConfig::default(),
      notify:                NotifyPolicy::default(),
    }
  }
}

impl ServerConfig {
  /// Load from `path` (optional) and the environment, rejecting rule
  /// thresholds the engine cannot run with.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    let cfg: Self = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("PAWSIGHT")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()?;
    cfg.rules.validate().map_err(|e| config::ConfigError::Message(e.to_string()))?;
    Ok(cfg)
  }

  pub fn api_settings(&self) -> ApiSettings {
    ApiSettings {
      max_batch:  self.max_batch,
      token_hash: self.api_token_hash.clone().filter(|h| !h.is_empty()),
      rules:      self.rules.clone(),
    }
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
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
  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/pawsight.toml")).unwrap();
    assert_eq!(cfg.max_batch, 200);
    assert_eq!(cfg.notify.min_score, 0.75);
    assert_eq!(cfg.rules.car_bark.window_minutes, 60);
    assert!(cfg.api_settings().token_hash.is_none());
  }

  #[test]
  fn sample_config_parses() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.toml");
    let cfg = ServerConfig::load(&path).unwrap();
    assert_eq!(cfg.port, 8650);
    assert_eq!(cfg.rules.night_whine.night_start_hour, 22);
    assert_eq!(cfg.rules.utc_offset_minutes, 60);
  }

  #[test]
  fn out_of_range_score_floor_fails_to_load() {
    let path = std::env::temp_dir().join(format!("pawsight-{}.toml", std::process::id()));
    std::fs::write(&path, "[rules.car_bark]\nmin_score = 1.5\n").unwrap();

    let result = ServerConfig::load(&path);
    std::fs::remove_file(&path).ok();

    let err = result.unwrap_err();
    assert!(err.to_string().contains("car_bark.min_score"), "{err}");
  }

  #[test]
  fn tilde_expands_against_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    let expanded = expand_tilde(Path::new("~/data/pawsight.db"));
    assert_eq!(expanded, PathBuf::from(home).join("data/pawsight.db"));
  }
}
