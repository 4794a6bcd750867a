//! Configuration management for the DRM layer.
//!
//! - [`types`]: the configuration schema ([`DrmConfig`] and its sections).
//! - [`defaults`]: default values used when sections or fields are missing.
//! - [`loader`]: [`ConfigLoader`], which reads TOML, applies environment
//!   overrides and validates the result.
//!
//! ```toml
//! [device]
//! sysfs_root = "/sys/dev/char"
//!
//! [backends]
//! disabled = []
//! force_generic = false
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

pub mod defaults;
pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{BackendsConfig, DeviceConfig, DrmConfig, LoggingConfig};
