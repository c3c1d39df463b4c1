//! Trackside configuration.
//!
//! A configuration file lists the readers to drive, the lap engine windows
//! and a table of rider names keyed by tag id. YAML and JSON are accepted;
//! the format is picked from the file extension.
//!
//! ```yaml
//! readers:
//!   - reader_id: finish-line
//!     address: 192.168.1.50
//!     transmit_power_index: 40
//! laps:
//!   max_acceptable_lap_secs: 90
//! riders:
//!   "201600000007": Alice
//! ```

pub mod error;
pub mod laps;
pub mod reader;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use error::{ConfigError, ConfigResult};
pub use laps::{LapSettings, LapSettingsBuilder};
pub use reader::{DEFAULT_READER_PORT, ReaderSettings, ReaderSettingsBuilder, SimulationSettings};

/// Complete configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TracksideConfig {
    pub readers: Vec<ReaderSettings>,
    pub laps: LapSettings,
    /// Tag id (hex) to display name
    pub riders: BTreeMap<String, String>,
}

/// On-disk configuration formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Pick a format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormat`] for anything other than
    /// `.yaml`, `.yml` or `.json`.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

impl TracksideConfig {
    /// Parse configuration text without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid for `format`.
    pub fn parse(content: &str, format: ConfigFormat, origin: &Path) -> ConfigResult<Self> {
        let parsed = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| ConfigError::Parse {
            path: origin.to_path_buf(),
            message,
        })
    }

    /// Read, parse and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, has an unsupported
    /// extension, does not parse, or fails validation.
    pub async fn load_from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::parse(&content, format, path)?;
        config.validate()?;
        debug!(
            path = %path.display(),
            readers = config.readers.len(),
            riders = config.riders.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Validate every reader, the lap settings and reader id uniqueness.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure found.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.readers.is_empty() {
            return Err(ConfigError::invalid("no readers configured"));
        }
        let mut seen = HashSet::new();
        for reader in &self.readers {
            reader.validate()?;
            if !seen.insert(reader.reader_id.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate reader_id: {}",
                    reader.reader_id
                )));
            }
        }
        self.laps.validate()
    }

    /// Run every reader on synthetic traffic.
    pub fn force_simulation(&mut self) {
        for reader in &mut self.readers {
            reader.force_simulation();
        }
    }

    /// Render the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if serialization fails.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::invalid(e.to_string()))
    }
}
