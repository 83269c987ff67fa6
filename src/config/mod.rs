//! Configuration module for cas-typer
//!
//! Handles loading and validating settings from YAML files and environment variables.

mod settings;

pub use settings::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable naming a settings file
pub const SETTINGS_PATH_ENV: &str = "CAS_TYPER_SETTINGS_PATH";

/// Load settings from an explicit file, the environment, the default
/// locations, or built-in defaults, in that order
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    let mut settings = match locate(explicit)? {
        Some(path) => {
            info!("Loading settings from: {}", path.display());
            Settings::from_file(&path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?
        }
        None => {
            info!("No settings file found, using defaults");
            Settings::default()
        }
    };

    settings.merge_env();
    settings.validate()?;
    Ok(settings)
}

fn locate(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("settings file does not exist: {}", path.display());
        }
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(path) = std::env::var(SETTINGS_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    let paths = [
        Some(PathBuf::from("cas-typer.yml")),
        Some(PathBuf::from("config/cas-typer.yml")),
        dirs::config_dir().map(|p| p.join("cas-typer/settings.yml")),
    ];

    Ok(paths.into_iter().flatten().find(|p| p.exists()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yml");
        std::fs::write(&path, "sequences:\n  min_length: 120\n").unwrap();

        let settings = load(Some(&path)).unwrap();
        assert_eq!(settings.sequences.min_length, 120);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        assert!(load(Some(Path::new("/no/such/settings.yml"))).is_err());
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yml");
        std::fs::write(&path, "monitor:\n  warning_threshold: 95\n").unwrap();
        assert!(load(Some(&path)).is_err());
    }
}
