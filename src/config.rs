//! Configuration management module
//!
//! YAML file first, then `UILOC_*` environment overrides.

use std::env;
use std::path::{Path, PathBuf};

use action_locator::ResolverOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const ENV_LOG_LEVEL: &str = "UILOC_LOG_LEVEL";
pub const ENV_FIRST_MATCH: &str = "UILOC_FIRST_MATCH";
pub const ENV_REVERSE_ON_LAST: &str = "UILOC_REVERSE_ON_LAST";

/// Effective CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default log level when `RUST_LOG` is unset
    pub log_level: String,

    /// Return only the first match unless a command says otherwise
    pub first_match_only: bool,

    /// Reconciliation tunables handed to the resolver
    pub resolver: ResolverOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            first_match_only: false,
            resolver: ResolverOptions::default(),
        }
    }
}

impl Config {
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("Failed to parse config file")
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Unparseable flags are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|level| !level.trim().is_empty()) {
            self.log_level = level.trim().to_string();
        }
        if let Some(flag) = lookup(ENV_FIRST_MATCH).and_then(|raw| parse_flag(&raw)) {
            self.first_match_only = flag;
        }
        if let Some(flag) = lookup(ENV_REVERSE_ON_LAST).and_then(|raw| parse_flag(&raw)) {
            self.resolver.reverse_on_last = flag;
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `~/.config/uiloc/config.yaml` or the platform equivalent
pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push("uiloc");
    path.push("config.yaml");
    Ok(path)
}

/// Load `path`, falling back to defaults when it does not exist.
///
/// Returns whether the file was found alongside the config.
pub fn load_config_file(path: &Path) -> Result<(Config, bool)> {
    if !path.exists() {
        return Ok((Config::default(), false));
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = Config::from_yaml_str(&content)
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok((config, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = Config::from_yaml_str("first_match_only: true\nresolver:\n  claim_unique: false\n")
            .unwrap();
        assert!(config.first_match_only);
        assert!(!config.resolver.claim_unique);
        assert!(config.resolver.reverse_on_last);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn overrides_win_over_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_LOG_LEVEL, "debug"),
            (ENV_FIRST_MATCH, "yes"),
            (ENV_REVERSE_ON_LAST, "0"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|value| value.to_string()));
        assert_eq!(config.log_level, "debug");
        assert!(config.first_match_only);
        assert!(!config.resolver.reverse_on_last);
    }

    #[test]
    fn bad_flags_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == ENV_FIRST_MATCH).then(|| "maybe".to_string()));
        assert!(!config.first_match_only);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, found) = load_config_file(&dir.path().join("config.yaml")).unwrap();
        assert!(!found);
        assert_eq!(config, Config::default());

        let path = dir.path().join("custom.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "log_level: warn").unwrap();
        let (config, found) = load_config_file(&path).unwrap();
        assert!(found);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn round_trips_through_yaml() {
        let config = Config::default();
        let yaml = config.to_yaml_string().unwrap();
        assert_eq!(Config::from_yaml_str(&yaml).unwrap(), config);
    }
}
