//! Configuration check

use std::path::Path;

use anyhow::Result;
use colored::*;

use crate::commands::load_config;
use crate::error::CliError;

/// Load the configuration and print it with defaults filled in.
pub async fn execute(config: &Path, simulate: bool, json: bool) -> Result<()> {
    let config = load_config(config, simulate).await?;

    if json {
        let config = serde_json::to_value(&config).map_err(CliError::from)?;
        let output = serde_json::json!({
            "success": true,
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&output).map_err(CliError::from)?);
        return Ok(());
    }

    print!("{}", config.to_yaml().map_err(CliError::from)?);
    let simulated = config.readers.iter().filter(|r| r.simulate).count();
    println!(
        "{} {} reader(s), {} simulated, {} named rider(s)",
        "Configuration OK:".green().bold(),
        config.readers.len(),
        simulated,
        config.riders.len()
    );
    Ok(())
}
