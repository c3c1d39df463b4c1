//! Command implementations for tracksidectl

pub mod decode;
pub mod run;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use trackside_config::{ConfigFormat, TracksideConfig};

use crate::error::CliError;

/// Read and validate a configuration file, optionally switching every reader
/// to simulate mode first.
pub async fn load_config(path: &Path, simulate: bool) -> Result<TracksideConfig> {
    let format = ConfigFormat::from_path(path).map_err(CliError::from)?;
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut config = TracksideConfig::parse(&content, format, path).map_err(CliError::from)?;
    if simulate {
        config.force_simulation();
    }
    config.validate().map_err(CliError::from)?;
    Ok(config)
}
