//! Lap engine settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LapSettings {
    /// Gaps longer than this mean the rider left the track and came back
    pub max_acceptable_lap_secs: f64,
    /// Riders unseen for this long are dropped from the active set
    pub inactivity_window_secs: u64,
    /// Lap records older than this are dropped from history
    pub history_retention_secs: u64,
    /// Repeat sightings of a tag inside this window are ignored; 0 disables
    pub dedup_window_secs: u64,
    pub purge_interval_ms: u64,
    /// Hard cap on history length
    pub max_history_entries: usize,
}

impl Default for LapSettings {
    fn default() -> Self {
        Self {
            max_acceptable_lap_secs: 120.0,
            inactivity_window_secs: 600,
            history_retention_secs: 3600,
            dedup_window_secs: 5,
            purge_interval_ms: 1000,
            max_history_entries: 10_000,
        }
    }
}

impl LapSettings {
    pub fn builder() -> LapSettingsBuilder {
        LapSettingsBuilder {
            settings: Self::default(),
        }
    }

    pub fn inactivity_window(&self) -> Duration {
        Duration::from_secs(self.inactivity_window_secs)
    }

    pub fn history_retention(&self) -> Duration {
        Duration::from_secs(self.history_retention_secs)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs(self.dedup_window_secs)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_millis(self.purge_interval_ms)
    }

    /// Validate the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the lap threshold is not a positive number or a
    /// window, interval or cap is zero.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.max_acceptable_lap_secs.is_finite() || self.max_acceptable_lap_secs <= 0.0 {
            return Err(ConfigError::invalid(format!(
                "max_acceptable_lap_secs must be a positive number, got {}",
                self.max_acceptable_lap_secs
            )));
        }
        for (name, value) in [
            ("inactivity_window_secs", self.inactivity_window_secs),
            ("history_retention_secs", self.history_retention_secs),
            ("purge_interval_ms", self.purge_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(format!("{name} must be greater than zero")));
            }
        }
        if self.max_history_entries == 0 {
            return Err(ConfigError::invalid("max_history_entries must be greater than zero"));
        }
        Ok(())
    }
}

/// Builder for [`LapSettings`].
#[derive(Debug, Clone)]
pub struct LapSettingsBuilder {
    settings: LapSettings,
}

impl LapSettingsBuilder {
    #[must_use]
    pub fn max_acceptable_lap_secs(mut self, secs: f64) -> Self {
        self.settings.max_acceptable_lap_secs = secs;
        self
    }

    #[must_use]
    pub fn inactivity_window_secs(mut self, secs: u64) -> Self {
        self.settings.inactivity_window_secs = secs;
        self
    }

    #[must_use]
    pub fn history_retention_secs(mut self, secs: u64) -> Self {
        self.settings.history_retention_secs = secs;
        self
    }

    #[must_use]
    pub fn dedup_window_secs(mut self, secs: u64) -> Self {
        self.settings.dedup_window_secs = secs;
        self
    }

    #[must_use]
    pub fn purge_interval_ms(mut self, ms: u64) -> Self {
        self.settings.purge_interval_ms = ms;
        self
    }

    #[must_use]
    pub fn max_history_entries(mut self, entries: usize) -> Self {
        self.settings.max_history_entries = entries;
        self
    }

    /// Build the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid.
    pub fn build(self) -> ConfigResult<LapSettings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}
