//! Error handling for the NovaDE DRM layer.
//!
//! Every public operation of this crate reports failure through [`DrmError`].
//! The variants follow the three failure classes of backend selection and
//! dispatch:
//!
//! - the device could not be identified ([`DrmError::DeviceUnidentifiable`]),
//! - no registered backend claims the device ([`DrmError::UnsupportedDevice`]),
//! - the selected backend failed to construct, import or export something
//!   ([`DrmError::Backend`] and the backend-side validation variants).
//!
//! None of these are retried internally. Configuration and logging setup errors
//! are kept in their own enums ([`ConfigError`], [`LoggingError`]) and wrapped
//! by [`DrmError`].
//!
//! # Examples
//!
//! ```rust,ignore
//! use novade_drm::{DrmContext, DrmError};
//!
//! match DrmContext::create(fd.as_fd()) {
//!     Ok(context) => println!("using backend {}", context.backend_name()),
//!     Err(DrmError::UnsupportedDevice { vendor_id, device_id }) => {
//!         eprintln!("no backend for {:04x}:{:04x}", vendor_id, device_id);
//!     }
//!     Err(e) => eprintln!("DRM setup failed: {}", e),
//! }
//! ```

use std::io;
use std::path::PathBuf;
use nix::errno::Errno;
use thiserror::Error;

/// Why a device file descriptor could not be mapped to a vendor/device pair.
#[derive(Debug, Error)]
pub enum IdentifyError {
    /// `fstat` on the supplied descriptor failed.
    #[error("fstat on device descriptor failed: {0}")]
    Stat(#[source] Errno),

    /// A device attribute file could not be opened or read.
    #[error("failed to read device attribute {path:?}")]
    AttributeRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A device attribute file did not contain an unsigned 32-bit number.
    #[error("device attribute {path:?} holds no valid identifier: {value:?}")]
    AttributeParse { path: PathBuf, value: String },
}

/// Crate-wide error type for backend selection, context lifecycle and drawable dispatch.
#[derive(Debug, Error)]
pub enum DrmError {
    /// The device behind the descriptor could not be identified.
    #[error("DRM device could not be identified: {0}")]
    DeviceUnidentifiable(#[from] IdentifyError),

    /// Identification succeeded but no registered backend accepts the device.
    #[error("No DRM backend supports device {vendor_id:#06x}:{device_id:#06x}")]
    UnsupportedDevice { vendor_id: u32, device_id: u32 },

    /// A backend operation was rejected by the kernel.
    #[error("DRM backend '{backend}' failed during {operation}: {source}")]
    Backend {
        backend: &'static str,
        operation: &'static str,
        #[source]
        source: Errno,
    },

    /// The pixel format is not one the backend recognises.
    #[error("Unsupported pixel format {0:#010x}")]
    InvalidFormat(u32),

    /// The requested dimensions are zero or overflow the buffer layout.
    #[error("Invalid drawable dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Errors related to configuration loading, parsing, or validation.
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),

    /// Errors raised while installing the logging subscriber.
    #[error("Logging Error: {0}")]
    Logging(#[from] LoggingError),
}

impl DrmError {
    /// Shorthand for a kernel-side failure of `operation` inside `backend`.
    pub fn backend(backend: &'static str, operation: &'static str, source: Errno) -> Self {
        DrmError::Backend {
            backend,
            operation,
            source,
        }
    }
}

/// Error type for configuration-related operations.
///
/// Typically wrapped by [`DrmError::Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An error occurred while attempting to read a configuration file.
    #[error("Failed to read configuration file from {path:?}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid TOML or does not match the schema.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Parsed values failed validation.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Error type for logging-related operations.
#[derive(Error, Debug)]
pub enum LoggingError {
    /// Failed to initialize the logging system.
    #[error("Failed to initialize logging: {0}")]
    InitializationFailure(String),

    /// Failed to set or parse a log filter.
    #[error("Failed to set log filter: {0}")]
    FilterError(String),

    /// An I/O error occurred while preparing a log file.
    #[error("Logging I/O error: {0}")]
    IoError(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io::ErrorKind;

    #[test]
    fn test_unsupported_device_display() {
        let err = DrmError::UnsupportedDevice {
            vendor_id: 0x10de,
            device_id: 0x1b80,
        };
        assert_eq!(
            format!("{}", err),
            "No DRM backend supports device 0x10de:0x1b80"
        );
        assert!(err.source().is_none());
    }

    #[test]
    fn test_identify_error_is_wrapped_with_source() {
        let err: DrmError = IdentifyError::AttributeRead {
            path: PathBuf::from("/sys/dev/char/226:0/device/vendor"),
            source: io::Error::new(ErrorKind::NotFound, "missing"),
        }
        .into();

        assert!(matches!(
            err,
            DrmError::DeviceUnidentifiable(IdentifyError::AttributeRead { .. })
        ));
        let inner = err.source().unwrap();
        assert_eq!(
            inner.source().unwrap().downcast_ref::<io::Error>().unwrap().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_backend_error_helper() {
        let err = DrmError::backend("dumb", "create_drawable", Errno::ENOTTY);
        match &err {
            DrmError::Backend {
                backend,
                operation,
                source,
            } => {
                assert_eq!(*backend, "dumb");
                assert_eq!(*operation, "create_drawable");
                assert_eq!(*source, Errno::ENOTTY);
            }
            other => panic!("Unexpected error variant: {:?}", other),
        }
        assert!(format!("{}", err).starts_with("DRM backend 'dumb' failed during create_drawable"));
    }

    #[test]
    fn test_config_error_validation_display() {
        let err: DrmError = ConfigError::ValidationError("bad level".to_string()).into();
        assert_eq!(
            format!("{}", err),
            "Configuration Error: Configuration validation failed: bad level"
        );
    }

    #[test]
    fn test_logging_error_io_variant() {
        let err = LoggingError::from(io::Error::new(ErrorKind::PermissionDenied, "denied"));
        assert_eq!(format!("{}", err), "Logging I/O error: denied");
    }
}
