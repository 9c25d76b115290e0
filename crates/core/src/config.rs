//! Configuration for dev-conventions.
//!
//! The configuration file is optional: every field has a default, and a
//! repository without `.dev-conventions.toml` behaves exactly like one with
//! an empty file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

/// Default configuration file name, looked up at the repository root.
pub const CONFIG_FILE_NAME: &str = ".dev-conventions.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConventionsConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Changelog / merge workflow settings.
    #[serde(default)]
    pub changelog: ChangelogConfig,
}

// ---------------------------------------------------------------------------
// General
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".into()
}

// ---------------------------------------------------------------------------
// Changelog
// ---------------------------------------------------------------------------

/// Settings for the changelog / merge workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogConfig {
    /// Remote used for target enumeration, commit links and pushes.
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Maximum number of `diff --stat` lines embedded in a changelog.
    #[serde(default = "default_stat_line_limit")]
    pub stat_line_limit: usize,

    /// Conventional branch names offered as merge targets.
    #[serde(default = "default_target_candidates")]
    pub target_candidates: Vec<String>,

    /// Resolve conflicts in favour of the incoming branch without asking.
    #[serde(default)]
    pub prefer_incoming: bool,
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            stat_line_limit: default_stat_line_limit(),
            target_candidates: default_target_candidates(),
            prefer_incoming: false,
        }
    }
}

fn default_remote() -> String {
    "origin".into()
}

fn default_stat_line_limit() -> usize {
    100
}

fn default_target_candidates() -> Vec<String> {
    ["main", "master", "dev", "develop", "staging"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl ConventionsConfig {
    /// Load a [`ConventionsConfig`] from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: ConventionsConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Load the config at `explicit` if given, otherwise the default file
    /// under `repo_root`, falling back to built-in defaults when that file
    /// does not exist.
    pub fn discover(repo_root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let candidate = repo_root.join(CONFIG_FILE_NAME);
                if candidate.exists() {
                    Self::load_from_file(&candidate)?
                } else {
                    debug!("no configuration file, using defaults");
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate that all fields are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.changelog.remote.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "changelog.remote".into(),
                detail: "remote name must not be empty".into(),
            });
        }
        if self.changelog.stat_line_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "changelog.stat_line_limit".into(),
                detail: "stat line limit must be > 0".into(),
            });
        }
        if self.changelog.target_candidates.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "changelog.target_candidates".into(),
                detail: "at least one target candidate is required".into(),
            });
        }
        if self
            .changelog
            .target_candidates
            .iter()
            .any(|c| c.trim().is_empty())
        {
            return Err(ConfigError::InvalidValue {
                field: "changelog.target_candidates".into(),
                detail: "target candidates must not be blank".into(),
            });
        }
        Ok(())
    }

    /// Generate a default TOML config template string.
    pub fn default_template() -> &'static str {
        r#"# dev-conventions configuration
# Every key is optional; the values below are the built-in defaults.

[general]
# Minimum log level: trace, debug, info, warn, error.
log_level = "warn"

[changelog]
# Remote used for target branch discovery, commit links and pushes.
remote = "origin"

# Maximum number of `git diff --stat` lines embedded in a changelog.
stat_line_limit = 100

# Branch names offered when no --target is given.
target_candidates = ["main", "master", "dev", "develop", "staging"]

# Resolve merge conflicts in favour of the incoming branch (-X theirs).
# Leave off unless you accept that local-side changes may be discarded.
prefer_incoming = false
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: ConventionsConfig = toml::from_str("").unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.changelog.remote, "origin");
        assert_eq!(config.changelog.stat_line_limit, 100);
        assert_eq!(
            config.changelog.target_candidates,
            vec!["main", "master", "dev", "develop", "staging"]
        );
        assert!(!config.changelog.prefer_incoming);
    }

    #[test]
    fn test_parse_overrides() {
        let config: ConventionsConfig = toml::from_str(
            r#"
[general]
log_level = "debug"

[changelog]
remote = "upstream"
stat_line_limit = 20
target_candidates = ["trunk"]
prefer_incoming = true
"#,
        )
        .unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.changelog.remote, "upstream");
        assert_eq!(config.changelog.stat_line_limit, 20);
        assert_eq!(config.changelog.target_candidates, vec!["trunk"]);
        assert!(config.changelog.prefer_incoming);
    }

    #[test]
    fn test_file_not_found() {
        let result = ConventionsConfig::load_from_file("/nonexistent/.dev-conventions.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_discover_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConventionsConfig::discover(dir.path(), None).unwrap();
        assert_eq!(config.changelog.remote, "origin");
    }

    #[test]
    fn test_discover_reads_repo_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[changelog]\nremote = \"fork\"\n",
        )
        .unwrap();
        let config = ConventionsConfig::discover(dir.path(), None).unwrap();
        assert_eq!(config.changelog.remote, "fork");
    }

    #[test]
    fn test_discover_explicit_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let result = ConventionsConfig::discover(dir.path(), Some(&missing));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[changelog\nremote=").unwrap();
        let result = ConventionsConfig::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validate_rejects_zero_stat_limit() {
        let mut config = ConventionsConfig::default();
        config.changelog.stat_line_limit = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "changelog.stat_line_limit"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_remote_and_candidates() {
        let mut config = ConventionsConfig::default();
        config.changelog.remote = "  ".into();
        assert!(config.validate().is_err());

        let mut config = ConventionsConfig::default();
        config.changelog.target_candidates.clear();
        assert!(config.validate().is_err());

        let mut config = ConventionsConfig::default();
        config.changelog.target_candidates.push(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_template_is_valid() {
        let config: ConventionsConfig = toml::from_str(ConventionsConfig::default_template())
            .expect("default template should be valid TOML");
        config.validate().unwrap();
        assert_eq!(config.changelog.stat_line_limit, 100);
    }
}
