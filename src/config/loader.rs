use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::core::SynthesisConfig;
use crate::errors::SynthesisError;

pub const CONFIG_FILE_NAME: &str = ".archsynth.toml";

/// Pure function to parse and validate config from TOML string
pub fn parse_and_validate_config(contents: &str) -> Result<SynthesisConfig, String> {
    let config = toml::from_str::<SynthesisConfig>(contents)
        .map_err(|e| format!("Failed to parse {CONFIG_FILE_NAME}: {e}"))?;
    config.validate()?;
    Ok(config)
}

/// Try a candidate config path; absent files are skipped silently, broken
/// ones are reported and skipped.
pub(crate) fn try_load_config_from_path(config_path: &Path) -> Option<SynthesisConfig> {
    let contents = match fs::read_to_string(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(config_path, &e);
            return None;
        }
    };

    match parse_and_validate_config(&contents) {
        Ok(config) => {
            debug!("Loaded config from {}", config_path.display());
            Some(config)
        }
        Err(e) => {
            warn!("{}. Using defaults.", e);
            None
        }
    }
}

fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    // Only log actual errors, not "file not found"
    if error.kind() != std::io::ErrorKind::NotFound {
        warn!(
            "Failed to read config file {}: {}",
            config_path.display(),
            error
        );
    }
}

/// Candidate locations, most specific first.
pub fn config_candidates(output_root: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![output_root.join(CONFIG_FILE_NAME)];
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(CONFIG_FILE_NAME));
    }
    candidates
}

/// Load configuration for a run.
///
/// An explicitly requested file must be readable and valid. Otherwise the
/// output root and then the working directory are searched, falling back to
/// defaults.
pub fn load_config(
    explicit: Option<&Path>,
    output_root: &Path,
) -> Result<SynthesisConfig, SynthesisError> {
    if let Some(path) = explicit {
        let contents = fs::read_to_string(path).map_err(|e| {
            SynthesisError::config(
                format!("cannot read {}: {}", path.display(), e),
                Some(path.to_path_buf()),
            )
        })?;
        return parse_and_validate_config(&contents)
            .map_err(|e| SynthesisError::config(e, Some(path.to_path_buf())));
    }

    Ok(config_candidates(output_root)
        .iter()
        .find_map(|path| try_load_config_from_path(path))
        .unwrap_or_else(|| {
            debug!("No {} found. Using default config.", CONFIG_FILE_NAME);
            SynthesisConfig::default()
        }))
}
