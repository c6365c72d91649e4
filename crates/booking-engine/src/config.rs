//! Engine configuration.
//!
//! Loaded from a TOML file; every field has a default so an empty file (or
//! no file at all) is a valid configuration.
//!
//! ```toml
//! database_path = "salon.db"
//! slot_step_minutes = 15
//! match_rule = "substring"
//! busy_timeout_ms = 5000
//!
//! [seed]
//! days_ahead = 14
//! weekdays_only = true
//! day_start = "10:00"
//! day_end = "19:00"
//!
//! [[seed.services]]
//! name = "Manicure"
//! duration_minutes = 90
//! price = 2000
//! ```
//!
//! The `SALON_DB_PATH` environment variable overrides `database_path`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::availability::DEFAULT_STEP_MINUTES;
use crate::catalog::MatchRule;
use crate::clock::hhmm;
use crate::error::{BookingError, Result};

pub const DB_PATH_ENV: &str = "SALON_DB_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub database_path: PathBuf,
    /// Grid step between candidate start times.
    pub slot_step_minutes: u32,
    /// How free-text service/provider names are matched against the catalog.
    pub match_rule: MatchRule,
    /// How long a writer waits for a locked database before failing.
    pub busy_timeout_ms: u64,
    pub seed: SeedConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("salon.db"),
            slot_step_minutes: DEFAULT_STEP_MINUTES,
            match_rule: MatchRule::default(),
            busy_timeout_ms: 5_000,
            seed: SeedConfig::default(),
        }
    }
}

/// Catalog and schedule written by `seed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedConfig {
    pub services: Vec<SeedService>,
    pub providers: Vec<SeedProvider>,
    /// Number of days, starting today, that receive working hours.
    pub days_ahead: u32,
    /// Skip Saturdays and Sundays.
    pub weekdays_only: bool,
    #[serde(with = "hhmm")]
    pub day_start: NaiveTime,
    #[serde(with = "hhmm")]
    pub day_end: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedService {
    pub name: String,
    pub duration_minutes: u32,
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedProvider {
    pub name: String,
    #[serde(default)]
    pub specialization: Option<String>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        let service = |name: &str, duration_minutes, price| SeedService {
            name: name.to_string(),
            duration_minutes,
            price,
        };
        let provider = |name: &str, specialization: &str| SeedProvider {
            name: name.to_string(),
            specialization: Some(specialization.to_string()),
        };

        Self {
            services: vec![
                service("Women's haircut", 60, 1500),
                service("Men's haircut", 30, 800),
                service("Colouring", 120, 3000),
                service("Manicure", 90, 2000),
                service("Pedicure", 90, 2500),
            ],
            providers: vec![
                provider("Anna", "Hairdresser"),
                provider("Elena", "Colourist"),
                provider("Maria", "Manicurist"),
                provider("Irina", "Pedicurist"),
            ],
            days_ahead: 14,
            weekdays_only: true,
            day_start: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN),
            day_end: NaiveTime::from_hms_opt(19, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `path` (or defaults when `None`), apply the
    /// environment override and validate the result.
    ///
    /// # Errors
    /// Returns `BookingError::Config` if the file cannot be read, is not
    /// valid TOML for this schema, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    BookingError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                let config = Self::from_toml_str(&raw)?;
                info!(path = %path.display(), "configuration loaded from file");
                config
            }
            None => Self::default(),
        };

        if let Ok(db_path) = std::env::var(DB_PATH_ENV) {
            if !db_path.trim().is_empty() {
                config.database_path = PathBuf::from(db_path);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| BookingError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.slot_step_minutes == 0 {
            return Err(BookingError::Config(
                "slot_step_minutes must be positive".to_string(),
            ));
        }
        if self.seed.day_start >= self.seed.day_end {
            return Err(BookingError::Config(format!(
                "seed.day_start {} must be before seed.day_end {}",
                self.seed.day_start, self.seed.day_end
            )));
        }
        if let Some(bad) = self.seed.services.iter().find(|s| s.duration_minutes == 0) {
            return Err(BookingError::Config(format!(
                "service '{}' has zero duration",
                bad.name
            )));
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.slot_step_minutes, 15);
        assert_eq!(config.seed.services.len(), 5);
        assert_eq!(config.seed.providers.len(), 4);
    }

    #[test]
    fn overrides_are_applied() {
        let config = EngineConfig::from_toml_str(
            r#"
            slot_step_minutes = 30
            match_rule = "exact"

            [seed]
            day_start = "09:00"
            day_end = "18:00"
            services = [{ name = "Brow shaping", duration_minutes = 20, price = 600 }]
            "#,
        )
        .unwrap();
        assert_eq!(config.slot_step_minutes, 30);
        assert_eq!(config.match_rule, MatchRule::Exact);
        assert_eq!(config.seed.services[0].name, "Brow shaping");
        assert_eq!(config.seed.day_start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert!(config.seed.providers.len() == 4, "unset lists keep defaults");
    }

    #[test]
    fn zero_step_is_rejected() {
        let err = EngineConfig::from_toml_str("slot_step_minutes = 0").unwrap_err();
        assert!(matches!(err, BookingError::Config(_)));
    }

    #[test]
    fn inverted_day_is_rejected() {
        let raw = "[seed]\nday_start = \"19:00\"\nday_end = \"10:00\"\n";
        assert!(EngineConfig::from_toml_str(raw).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(EngineConfig::from_toml_str("slot_step = 5").is_err());
    }
}
