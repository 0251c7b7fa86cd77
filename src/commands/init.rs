use crate::config::{SynthesisConfig, CONFIG_FILE_NAME};
use crate::io;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const HEADER: &str = "# archsynth configuration\n#\n# Every section is optional; omitted values use the defaults shown here.\n\n";

/// Render the default configuration as TOML.
pub fn default_config_toml() -> Result<String> {
    let body = toml::to_string_pretty(&SynthesisConfig::default())
        .context("Failed to render default configuration")?;
    Ok(format!("{HEADER}{body}"))
}

pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!("Configuration file already exists. Use --force to overwrite.");
    }

    io::write_file(&config_path, &default_config_toml()?)?;
    println!("Created {CONFIG_FILE_NAME} configuration file");

    Ok(config_path)
}
