//! Default configuration values for the DRM layer.
//!
//! These functions are referenced by `serde`'s `default` attribute in the
//! configuration structures.

use crate::config::{BackendsConfig, DeviceConfig, LoggingConfig};
use std::path::PathBuf;

/// Root of the `major:minor` keyed character-device metadata tree.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/dev/char";

pub(super) fn default_device_config() -> DeviceConfig {
    DeviceConfig {
        sysfs_root: default_sysfs_root(),
    }
}

pub(super) fn default_sysfs_root() -> PathBuf {
    PathBuf::from(DEFAULT_SYSFS_ROOT)
}

pub(super) fn default_backends_config() -> BackendsConfig {
    BackendsConfig {
        disabled: default_disabled_backends(),
        force_generic: default_bool_false(),
    }
}

/// No backend is disabled by default.
pub(super) fn default_disabled_backends() -> Vec<String> {
    Vec::new()
}

pub(super) fn default_bool_false() -> bool {
    false
}

pub(super) fn default_logging_config() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        file_path: default_log_file_path(),
        format: default_log_format(),
    }
}

/// Returns the default log level string (`"info"`).
pub(super) fn default_log_level() -> String {
    "info".to_string()
}

/// Returns the default log file path (`None`, console only).
pub(super) fn default_log_file_path() -> Option<PathBuf> {
    None
}

/// Returns the default log format string (`"text"`).
pub(super) fn default_log_format() -> String {
    "text".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sysfs_root() {
        assert_eq!(default_sysfs_root(), PathBuf::from("/sys/dev/char"));
    }

    #[test]
    fn test_default_backends_config_values() {
        let bc = default_backends_config();
        assert!(bc.disabled.is_empty());
        assert!(!bc.force_generic);
    }

    #[test]
    fn test_default_logging_config_values() {
        let lc = default_logging_config();
        assert_eq!(lc.level, "info");
        assert_eq!(lc.file_path, None);
        assert_eq!(lc.format, "text");
    }
}
