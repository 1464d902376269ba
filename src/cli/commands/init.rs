//! Init and Config commands.

use anyhow::anyhow;
use console::style;

use crate::config::{API_KEY_ENV, Settings};

/// Run init command - create configuration file.
pub fn run_init(force: bool) -> anyhow::Result<()> {
    let path = Settings::init_config_file(force).map_err(|e| anyhow!("{e}"))?;
    println!("Created configuration file at: {}", path.display());
    println!("Edit this file to customize your settings.");
    println!("Set {API_KEY_ENV} in the environment or a .env file; it is never stored there.");
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings) -> anyhow::Result<()> {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    println!("{}", toml::to_string_pretty(config)?);

    let credential = if config.require_api_key().is_ok() {
        style("set").green()
    } else {
        style("not set").red()
    };
    println!("# {API_KEY_ENV}: {credential}");
    Ok(())
}
