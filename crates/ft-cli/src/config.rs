//! Configuration loading and management.

use std::path::{Path, PathBuf};

use chrono::{Local, Offset};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use ft_core::AggregateConfig;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Offset from UTC, in minutes, for hour-of-day and calendar-day
    /// bucketing. Unset means "use the machine's current local offset".
    pub utc_offset_minutes: Option<i64>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("ft.db"),
            utc_offset_minutes: None,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (FT_*)
        figment = figment.merge(Env::prefixed("FT_"));

        figment.extract()
    }

    /// The aggregation config derived from this configuration.
    ///
    /// Falls back to the machine's current local offset when none is set,
    /// so "hour of day" means the user's wall clock by default.
    #[must_use]
    pub fn aggregate(&self) -> AggregateConfig {
        let utc_offset_minutes = self.utc_offset_minutes.unwrap_or_else(|| {
            i64::from(Local::now().offset().fix().local_minus_utc()) / 60
        });
        AggregateConfig { utc_offset_minutes }
    }
}

/// Returns the platform-specific config directory for ft.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ft"))
}

/// Returns the platform-specific data directory for ft.
///
/// On Linux: `~/.local/share/ft`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ft"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_returns_some() {
        assert!(dirs_data_path().is_some());
    }

    #[test]
    fn test_dirs_data_path_ends_with_ft() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "ft");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("ft.db"));
    }

    #[test]
    fn explicit_offset_wins_over_local_detection() {
        let config = Config {
            database_path: PathBuf::from("ft.db"),
            utc_offset_minutes: Some(120),
        };
        assert_eq!(config.aggregate().utc_offset_minutes, 120);
    }
}
