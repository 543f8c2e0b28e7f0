//! Reset configuration and per-call options.

use rewind_merge::SubmodulePolicy;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable overriding [`ResetConfig::reflog_action`].
pub const REFLOG_ACTION_ENV: &str = "REWIND_REFLOG_ACTION";

/// Shortest and longest accepted abbreviation lengths.
const ABBREV_RANGE: std::ops::RangeInclusive<usize> = 4..=64;

/// Persistent reset settings.
///
/// ```
/// use rewind_reset::ResetConfig;
///
/// let config = ResetConfig::from_toml_str("abbrev = 10\nrecurse_submodules = true").unwrap();
/// assert_eq!(config.abbrev, 10);
/// assert!(!config.quiet);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    /// Label for journal messages, e.g. `"rebase"`. When set, pointer
    /// updates are journaled as `"<label>: updating HEAD"`.
    pub reflog_action: Option<String>,
    /// Hex digits shown for commit ids in reports.
    pub abbrev: usize,
    /// Check out submodules recorded in the target tree.
    pub recurse_submodules: bool,
    /// Suppress report lines.
    pub quiet: bool,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            reflog_action: None,
            abbrev: 7,
            recurse_submodules: false,
            quiet: false,
        }
    }
}

impl ResetConfig {
    /// Parse from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !ABBREV_RANGE.contains(&self.abbrev) {
            return Err(ConfigError::Invalid {
                key: "abbrev",
                reason: format!(
                    "{} is outside {}..={}",
                    self.abbrev,
                    ABBREV_RANGE.start(),
                    ABBREV_RANGE.end()
                ),
            });
        }
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(action) = lookup(REFLOG_ACTION_ENV).filter(|a| !a.is_empty()) {
            self.reflog_action = Some(action);
        }
        self
    }

    /// Per-call options seeded from this configuration.
    pub fn options(&self) -> ResetOptions {
        ResetOptions {
            quiet: self.quiet,
            intent_to_add: false,
            submodules: if self.recurse_submodules {
                SubmodulePolicy::Recurse
            } else {
                SubmodulePolicy::Skip
            },
            reflog_action: self.reflog_action.clone(),
            abbrev: self.abbrev,
        }
    }
}

/// Options for a single reset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResetOptions {
    pub quiet: bool,
    /// Keep paths the target lacks as intent-to-add placeholders instead of
    /// unstaging them. Mixed resets only.
    pub intent_to_add: bool,
    pub submodules: SubmodulePolicy,
    pub reflog_action: Option<String>,
    pub abbrev: usize,
}

impl Default for ResetOptions {
    fn default() -> Self {
        ResetConfig::default().options()
    }
}

impl From<&ResetConfig> for ResetOptions {
    fn from(config: &ResetConfig) -> Self {
        config.options()
    }
}
