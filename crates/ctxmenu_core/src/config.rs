//! Application configuration and data directory handling.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CtxMenuError;

/// File name of the configuration inside the data directory.
pub const CONFIG_FILE_NAME: &str = "ctxmenu.json";

/// Get the default data directory path.
///
/// Debug builds keep everything next to the working directory.
pub fn default_data_dir() -> PathBuf {
    #[cfg(debug_assertions)]
    {
        PathBuf::from("./ctxmenu_data")
    }

    #[cfg(not(debug_assertions))]
    {
        dirs::data_dir()
            .map(|d| {
                #[cfg(target_os = "macos")]
                {
                    d.join("dev.ctxmenu.Ctxmenu")
                }
                #[cfg(not(target_os = "macos"))]
                {
                    d.join("ctxmenu")
                }
            })
            .unwrap_or_else(|| PathBuf::from("./ctxmenu_data"))
    }
}

/// Ensure the data directory exists.
pub fn init_data_dir(path: &Path) -> Result<(), CtxMenuError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(CtxMenuError::config_with_hint(
                format!("Data path exists but is not a directory: {}", path.display()),
                "Select a different location or remove the existing file",
            ));
        }
        return Ok(());
    }

    std::fs::create_dir_all(path).map_err(|e| CtxMenuError::Io {
        message: format!("Failed to create data directory '{}': {}", path.display(), e),
        source: Some(Box::new(e)),
    })?;

    tracing::info!(path = %path.display(), "Created data directory");
    Ok(())
}

/// Persisted application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Locale id such as `de` or `pt_BR`.
    pub locale: String,
    /// Directory holding `transmission_<locale>.ts` catalogs.
    pub catalog_dir: Option<PathBuf>,
    /// Custom tracing filter.
    pub log_filter: Option<String>,
    /// Whether desktop notifications were switched on last time.
    pub notifications_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            locale: "en".to_string(),
            catalog_dir: None,
            log_filter: None,
            notifications_enabled: false,
        }
    }
}

impl AppConfig {
    /// Load the configuration, or return defaults when the file is missing.
    ///
    /// A present but unreadable file is an error rather than a silent reset.
    pub fn load_or_default(path: &Path) -> Result<Self, CtxMenuError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            CtxMenuError::config_with_hint(
                format!("Invalid config file '{}': {e}", path.display()),
                "Fix or delete the file to restore defaults",
            )
        })?;

        tracing::debug!(path = %path.display(), locale = %config.locale, "Loaded config");
        Ok(config)
    }

    /// Save the configuration as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), CtxMenuError> {
        if let Some(parent) = path.parent() {
            init_data_dir(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Default config file location.
    pub fn default_path() -> PathBuf {
        default_data_dir().join(CONFIG_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.locale, "en");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let config = AppConfig {
            locale: "pt_BR".to_string(),
            notifications_enabled: true,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = AppConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded.locale, "pt_BR");
        assert!(loaded.notifications_enabled);
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{"locale": "de"}"#).unwrap();

        let loaded = AppConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded.locale, "de");
        assert!(loaded.catalog_dir.is_none());
    }

    #[test]
    fn test_garbage_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "not json").unwrap();

        let err = AppConfig::load_or_default(&path).unwrap_err();
        assert_eq!(err.category(), "Config");
    }

    #[test]
    fn test_init_data_dir_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, "x").unwrap();
        assert!(init_data_dir(&file).is_err());
        assert!(init_data_dir(&dir.path().join("fresh")).is_ok());
    }
}
