//! Configuration data structures for the DRM layer.
//!
//! These structs are populated by deserializing TOML. Missing sections and
//! fields take their values from [`super::defaults`], and unknown fields are
//! rejected via `#[serde(deny_unknown_fields)]`.

use serde::Deserialize;
use std::path::PathBuf;
use super::defaults;

/// Where device metadata is read from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Directory holding one `major:minor` entry per character device.
    /// Must be absolute. Defaults to `/sys/dev/char`.
    #[serde(default = "defaults::default_sysfs_root")]
    pub sysfs_root: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        defaults::default_device_config()
    }
}

/// Adjustments applied to backend selection.
///
/// # Examples
///
/// ```
/// use novade_drm::config::BackendsConfig;
///
/// let config: BackendsConfig = toml::from_str(r#"disabled = ["intel"]"#).unwrap();
/// assert_eq!(config.disabled, vec!["intel".to_string()]);
/// assert!(!config.force_generic);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendsConfig {
    /// Names of backends skipped during selection. The fallback backend can
    /// never be disabled.
    #[serde(default = "defaults::default_disabled_backends")]
    pub disabled: Vec<String>,
    /// Always select the fallback backend, ignoring hardware identity.
    #[serde(default = "defaults::default_bool_false")]
    pub force_generic: bool,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        defaults::default_backends_config()
    }
}

impl BackendsConfig {
    /// Returns `true` if `name` appears in the disabled list.
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.iter().any(|d| d == name)
    }
}

/// Configuration settings for the logging subsystem.
///
/// Used by [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level: "trace", "debug", "info", "warn" or "error" (case-insensitive).
    #[serde(default = "defaults::default_log_level")]
    pub level: String,
    /// Optional log file. `None` disables file logging.
    #[serde(default = "defaults::default_log_file_path")]
    pub file_path: Option<PathBuf>,
    /// "text" or "json".
    #[serde(default = "defaults::default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        defaults::default_logging_config()
    }
}

/// Root configuration structure for the DRM layer.
///
/// # Examples
///
/// ```
/// use novade_drm::config::DrmConfig;
///
/// let toml_str = r#"
/// [backends]
/// force_generic = true
///
/// [logging]
/// level = "debug"
/// "#;
/// let config: DrmConfig = toml::from_str(toml_str).unwrap();
/// assert!(config.backends.force_generic);
/// assert_eq!(config.logging.level, "debug");
/// assert_eq!(config.device.sysfs_root.to_str(), Some("/sys/dev/char"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DrmConfig {
    #[serde(default = "defaults::default_device_config")]
    pub device: DeviceConfig,
    #[serde(default = "defaults::default_backends_config")]
    pub backends: BackendsConfig,
    #[serde(default = "defaults::default_logging_config")]
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_drm_config_default_matches_sections() {
        let config = DrmConfig::default();
        assert_eq!(config.device, DeviceConfig::default());
        assert_eq!(config.backends, BackendsConfig::default());
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_drm_config_deserialize_empty() {
        let config: DrmConfig = toml::from_str("").unwrap();
        assert_eq!(config, DrmConfig::default());
    }

    #[test]
    fn test_drm_config_deserialize_full() {
        let toml_str = r#"
            [device]
            sysfs_root = "/tmp/fake-sysfs"

            [backends]
            disabled = ["intel"]
            force_generic = false

            [logging]
            level = "trace"
            file_path = "/var/log/drm.log"
            format = "json"
        "#;
        let config: DrmConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.device.sysfs_root, PathBuf::from("/tmp/fake-sysfs"));
        assert!(config.backends.is_disabled("intel"));
        assert!(!config.backends.is_disabled("dumb"));
        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.logging.file_path, Some(PathBuf::from("/var/log/drm.log")));
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_drm_config_rejects_unknown_fields() {
        let result: Result<DrmConfig, _> = toml::from_str("[device]\nmajor = 226\n");
        assert!(result.is_err());
    }
}
