//! Persisted operator settings and profile files
//!
//! Settings live in the platform configuration folder:
//! - Linux: `~/.config/pmsheet/settings.toml`
//! - macOS: `~/Library/Application Support/org.pmsheet.pmsheet/settings.toml`
//! - Windows: `%APPDATA%\pmsheet\pmsheet\config\settings.toml`
//!
//! A missing or malformed file is never fatal; the run falls back to
//! defaults and logs a warning.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use pmsheet_core::ProfileFile;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_QUALIFIER: &str = "org";
const APP_ORG: &str = "pmsheet";
const APP_NAME: &str = "pmsheet";
const SETTINGS_FILENAME: &str = "settings.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Could not determine the settings directory")]
    NoConfigDir,

    #[error("Cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Values remembered between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm_engineer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bess_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_hold_enabled: Option<bool>,
}

/// Default settings file location
pub fn default_settings_path() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(SETTINGS_FILENAME))
}

/// Load settings, falling back to defaults on any problem
pub fn load_settings(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                tracing::debug!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse settings file {}: {}, using defaults",
                    path.display(),
                    e
                );
                Settings::default()
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("No settings file at {}, using defaults", path.display());
            Settings::default()
        }
        Err(e) => {
            tracing::warn!(
                "Failed to read settings file {}: {}, using defaults",
                path.display(),
                e
            );
            Settings::default()
        }
    }
}

/// Save settings, creating the parent directory when needed
pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(settings)?;
    fs::write(path, content).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Saved settings to {}", path.display());
    Ok(())
}

/// Remove the settings file; a missing file is not an error
pub fn clear_settings(path: &Path) -> Result<bool, SettingsError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(SettingsError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read a TOML template profile
pub fn read_profile_file(path: &Path) -> Result<ProfileFile, SettingsError> {
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILENAME);
        let settings = Settings {
            pm_engineer: Some("Alex Wong".into()),
            pm_phone: Some("5555 0199".into()),
            template_path: Some(PathBuf::from("/data/template.xlsx")),
            source_path: None,
            bess_enabled: Some(false),
            on_hold_enabled: Some(true),
        };
        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(&path), settings);
    }

    #[test]
    fn missing_and_malformed_files_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.toml");
        assert_eq!(load_settings(&missing), Settings::default());

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "pm_engineer = [").unwrap();
        assert_eq!(load_settings(&broken), Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "pm_engineer = \"Sam\"\n").unwrap();
        let settings = load_settings(&path);
        assert_eq!(settings.pm_engineer.as_deref(), Some("Sam"));
        assert_eq!(settings.bess_enabled, None);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        save_settings(&path, &Settings::default()).unwrap();
        assert!(clear_settings(&path).unwrap());
        assert!(!clear_settings(&path).unwrap());
    }

    #[test]
    fn profile_file_parse_errors_name_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile.toml");
        fs::write(&path, "band_start = \"six\"").unwrap();
        let err = read_profile_file(&path).unwrap_err();
        assert!(err.to_string().contains("profile.toml"));
    }
}
