//! Configuration loading for the DRM layer.
//!
//! [`ConfigLoader`] reads a TOML file (or string), applies environment
//! overrides and validates the result.
//!
//! ```rust,ignore
//! use novade_drm::config::ConfigLoader;
//!
//! let config = ConfigLoader::load_from_path("/etc/novade/drm.toml")?;
//! println!("reading device metadata from {}", config.device.sysfs_root.display());
//! ```
//!
//! ## Environment overrides
//!
//! - `NOVADE_DRM_SYSFS_ROOT` replaces `device.sysfs_root`.
//! - `NOVADE_DRM_FORCE_GENERIC` set to `1`/`true`/`yes` enables `backends.force_generic`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::dumb;
use crate::config::DrmConfig;
use crate::error::{ConfigError, DrmError};

/// Environment variable overriding `device.sysfs_root`.
pub const ENV_SYSFS_ROOT: &str = "NOVADE_DRM_SYSFS_ROOT";
/// Environment variable forcing the fallback backend.
pub const ENV_FORCE_GENERIC: &str = "NOVADE_DRM_FORCE_GENERIC";

/// Namespace for configuration loading.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads, overrides and validates the configuration stored at `path`.
    ///
    /// A missing file yields the default configuration. Other read failures
    /// are reported as [`ConfigError::ReadError`].
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<DrmConfig, DrmError> {
        let path = path.as_ref();
        let mut config = match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No DRM config at {:?}, using defaults", path);
                DrmConfig::default()
            }
            Err(e) => {
                return Err(ConfigError::ReadError {
                    path: path.to_path_buf(),
                    source: e,
                }
                .into());
            }
        };

        Self::apply_overrides(&mut config, |key| std::env::var(key).ok());
        Self::validate_config(&mut config)?;
        Ok(config)
    }

    /// Parses and validates configuration from a TOML string. Environment
    /// overrides are not consulted.
    pub fn load_from_str(content: &str) -> Result<DrmConfig, DrmError> {
        let mut config = Self::parse(content)?;
        Self::validate_config(&mut config)?;
        Ok(config)
    }

    fn parse(content: &str) -> Result<DrmConfig, ConfigError> {
        if content.trim().is_empty() {
            return Ok(DrmConfig::default());
        }
        Ok(toml::from_str(content)?)
    }

    /// Applies overrides looked up through `lookup`, which is `std::env::var`
    /// outside of tests.
    pub fn apply_overrides<F>(config: &mut DrmConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_SYSFS_ROOT).filter(|v| !v.is_empty()) {
            tracing::debug!("{} overrides sysfs root with {}", ENV_SYSFS_ROOT, root);
            config.device.sysfs_root = PathBuf::from(root);
        }
        if let Some(value) = lookup(ENV_FORCE_GENERIC) {
            config.backends.force_generic =
                matches!(value.to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Normalizes and validates a parsed configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ValidationError`] if the log level or format is unknown,
    /// the sysfs root is relative, or a disabled entry is empty or names the
    /// fallback backend.
    pub fn validate_config(config: &mut DrmConfig) -> Result<(), ConfigError> {
        let level_lower = config.logging.level.to_lowercase();
        match level_lower.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {
                config.logging.level = level_lower;
            }
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: '{}'. Must be one of trace, debug, info, warn, error.",
                    config.logging.level
                )));
            }
        }

        let format_lower = config.logging.format.to_lowercase();
        match format_lower.as_str() {
            "text" | "json" => {
                config.logging.format = format_lower;
            }
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: '{}'. Must be one of text, json.",
                    config.logging.format
                )));
            }
        }

        if !config.device.sysfs_root.is_absolute() {
            return Err(ConfigError::ValidationError(format!(
                "sysfs_root must be an absolute path, got {:?}",
                config.device.sysfs_root
            )));
        }

        for name in &config.backends.disabled {
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "Empty backend name in backends.disabled".to_string(),
                ));
            }
            if name == dumb::NAME {
                return Err(ConfigError::ValidationError(format!(
                    "The fallback backend '{}' cannot be disabled",
                    dumb::NAME
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_missing_path_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_from_path(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(config.backends.disabled.is_empty());
    }

    #[test]
    fn test_load_from_path_reads_and_normalizes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("drm.toml");
        fs::write(
            &path,
            "[logging]\nlevel = \"DEBUG\"\nformat = \"JSON\"\n[backends]\ndisabled = [\"intel\"]\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert!(config.backends.is_disabled("intel"));
    }

    #[test]
    fn test_load_from_path_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[device\nsysfs_root = 3").unwrap();

        match ConfigLoader::load_from_path(&path) {
            Err(DrmError::Config(ConfigError::ParseError(_))) => {}
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_from_directory_is_read_error() {
        let dir = TempDir::new().unwrap();
        match ConfigLoader::load_from_path(dir.path()) {
            Err(DrmError::Config(ConfigError::ReadError { path, .. })) => {
                assert_eq!(path, dir.path());
            }
            other => panic!("Expected read error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_invalid_level() {
        let err = ConfigLoader::load_from_str("[logging]\nlevel = \"verbose\"\n").unwrap_err();
        assert!(format!("{}", err).contains("Invalid log level: 'verbose'"));
    }

    #[test]
    fn test_validate_rejects_relative_sysfs_root() {
        let err = ConfigLoader::load_from_str("[device]\nsysfs_root = \"sys/dev/char\"\n").unwrap_err();
        assert!(matches!(err, DrmError::Config(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_rejects_disabling_fallback() {
        let err = ConfigLoader::load_from_str("[backends]\ndisabled = [\"dumb\"]\n").unwrap_err();
        assert!(format!("{}", err).contains("cannot be disabled"));
    }

    #[test]
    fn test_apply_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_SYSFS_ROOT, "/tmp/sysfs"),
            (ENV_FORCE_GENERIC, "TRUE"),
        ]
        .into_iter()
        .collect();
        let mut config = DrmConfig::default();

        ConfigLoader::apply_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.device.sysfs_root, PathBuf::from("/tmp/sysfs"));
        assert!(config.backends.force_generic);
    }

    #[test]
    fn test_apply_overrides_ignores_empty_root() {
        let mut config = DrmConfig::default();
        ConfigLoader::apply_overrides(&mut config, |key| {
            (key == ENV_SYSFS_ROOT).then(String::new)
        });
        assert_eq!(config, DrmConfig::default());
    }
}
