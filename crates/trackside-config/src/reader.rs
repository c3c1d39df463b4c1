//! Per-reader settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default reader-control TCP port.
pub const DEFAULT_READER_PORT: u16 = 5084;

/// Smallest frame that can hold a message header.
const MIN_FRAME_BYTES: usize = 10;

/// Synthetic tag traffic for a reader running without hardware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Seed for the pseudo-random generator; random when absent
    pub seed: Option<u64>,
    /// Number of distinct simulated tags
    pub tag_count: u8,
    /// Antennas to spread sightings over, numbered from 1
    pub antenna_count: u16,
    /// Upper bound of the gap between two sightings
    pub max_interval_ms: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: None,
            tag_count: 25,
            antenna_count: 3,
            max_interval_ms: 1000,
        }
    }
}

/// Settings for one reader session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    pub reader_id: String,
    /// `host` or `host:port`; must be absent in simulate mode
    pub address: Option<String>,
    /// Generate synthetic sightings instead of connecting
    pub simulate: bool,
    /// Transmit power table index; lowest power when absent
    pub transmit_power_index: Option<u16>,
    /// Refuse readers whose manufacturer PEN differs
    pub required_manufacturer: Option<u32>,
    pub ro_spec_id: u32,
    pub connect_timeout_ms: u64,
    pub connection_notice_timeout_ms: u64,
    pub transact_timeout_ms: u64,
    pub receive_timeout_ms: u64,
    pub max_frame_bytes: usize,
    pub simulation: SimulationSettings,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            reader_id: "reader-1".to_string(),
            address: None,
            simulate: false,
            transmit_power_index: None,
            required_manufacturer: None,
            ro_spec_id: 123,
            connect_timeout_ms: 5000,
            connection_notice_timeout_ms: 10_000,
            transact_timeout_ms: 3000,
            receive_timeout_ms: 500,
            max_frame_bytes: 32 * 1024,
            simulation: SimulationSettings::default(),
        }
    }
}

impl ReaderSettings {
    pub fn builder(reader_id: impl Into<String>) -> ReaderSettingsBuilder {
        ReaderSettingsBuilder {
            settings: Self {
                reader_id: reader_id.into(),
                ..Self::default()
            },
        }
    }

    /// Socket address to dial, with the default port filled in.
    pub fn endpoint(&self) -> Option<String> {
        let address = self.address.as_deref()?.trim();
        if address.is_empty() {
            return None;
        }
        if address.parse::<std::net::SocketAddr>().is_ok() {
            return Some(address.to_string());
        }
        if address.parse::<std::net::Ipv6Addr>().is_ok() {
            return Some(format!("[{address}]:{DEFAULT_READER_PORT}"));
        }
        match address.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Some(address.to_string())
            }
            _ => Some(format!("{address}:{DEFAULT_READER_PORT}")),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn connection_notice_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_notice_timeout_ms)
    }

    pub fn transact_timeout(&self) -> Duration {
        Duration::from_millis(self.transact_timeout_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    /// Switch this reader to synthetic traffic.
    pub fn force_simulation(&mut self) {
        self.simulate = true;
        self.address = None;
    }

    /// Validate the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has no id, if simulate mode and an
    /// address are not mutually exclusive, or if a timeout or limit is zero.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.reader_id.trim().is_empty() {
            return Err(ConfigError::invalid("reader_id must not be empty"));
        }
        let has_address = self.endpoint().is_some();
        match (self.simulate, has_address) {
            (true, true) => {
                return Err(ConfigError::invalid(format!(
                    "reader {}: simulate is set but an address is also configured",
                    self.reader_id
                )));
            }
            (false, false) => {
                return Err(ConfigError::invalid(format!(
                    "reader {}: no address configured (set simulate: true to run without hardware)",
                    self.reader_id
                )));
            }
            _ => {}
        }
        for (name, value) in [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("connection_notice_timeout_ms", self.connection_notice_timeout_ms),
            ("transact_timeout_ms", self.transact_timeout_ms),
            ("receive_timeout_ms", self.receive_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(format!(
                    "reader {}: {name} must be greater than zero",
                    self.reader_id
                )));
            }
        }
        if self.max_frame_bytes < MIN_FRAME_BYTES {
            return Err(ConfigError::invalid(format!(
                "reader {}: max_frame_bytes must be at least {MIN_FRAME_BYTES}",
                self.reader_id
            )));
        }
        if self.simulate {
            let sim = &self.simulation;
            if sim.tag_count == 0 || sim.antenna_count == 0 || sim.max_interval_ms == 0 {
                return Err(ConfigError::invalid(format!(
                    "reader {}: simulation tag_count, antenna_count and max_interval_ms must be non-zero",
                    self.reader_id
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`ReaderSettings`].
#[derive(Debug, Clone)]
pub struct ReaderSettingsBuilder {
    settings: ReaderSettings,
}

impl ReaderSettingsBuilder {
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.settings.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn simulate(mut self, simulate: bool) -> Self {
        self.settings.simulate = simulate;
        self
    }

    #[must_use]
    pub fn transmit_power_index(mut self, index: u16) -> Self {
        self.settings.transmit_power_index = Some(index);
        self
    }

    #[must_use]
    pub fn required_manufacturer(mut self, pen: u32) -> Self {
        self.settings.required_manufacturer = Some(pen);
        self
    }

    #[must_use]
    pub fn ro_spec_id(mut self, id: u32) -> Self {
        self.settings.ro_spec_id = id;
        self
    }

    #[must_use]
    pub fn connection_notice_timeout(mut self, timeout: Duration) -> Self {
        self.settings.connection_notice_timeout_ms = duration_ms(timeout);
        self
    }

    #[must_use]
    pub fn transact_timeout(mut self, timeout: Duration) -> Self {
        self.settings.transact_timeout_ms = duration_ms(timeout);
        self
    }

    #[must_use]
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.settings.receive_timeout_ms = duration_ms(timeout);
        self
    }

    #[must_use]
    pub fn simulation(mut self, simulation: SimulationSettings) -> Self {
        self.settings.simulation = simulation;
        self
    }

    /// Build the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid.
    pub fn build(self) -> ConfigResult<ReaderSettings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
