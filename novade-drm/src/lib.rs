//! # NovaDE DRM Backend Layer (`novade-drm`)
//!
//! `novade-drm` chooses, at runtime, the driver backend that manages graphics
//! buffers for an open DRM device, and routes every buffer operation to that
//! backend.
//!
//! ## Overview
//!
//! - **Device Identification**: [`device::DeviceProbe`] maps a device descriptor to its
//!   PCI vendor/device pair through `fstat` and the sysfs attributes under
//!   `/sys/dev/char/<major>:<minor>/device/`.
//! - **Backend Registry**: [`Registry`] holds the backends in priority order, the generic
//!   dumb-buffer backend always last. The first backend whose capability test accepts the
//!   device wins.
//! - **Context Lifecycle**: [`DrmContext`] binds a descriptor to its selected backend and
//!   owns the backend's private context until it is destroyed.
//! - **Drawable Dispatch**: drawables are created or imported through the context, and
//!   exported or queried through the operation table they carry, so they outlive the
//!   context that produced them.
//! - **Configuration and Logging**: TOML configuration ([`config::ConfigLoader`]) and
//!   `tracing` based logging ([`logging::init_logging`]).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::fs::OpenOptions;
//! use std::os::fd::AsFd;
//! use novade_drm::{DrmContext, DrmFourcc};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let card = OpenOptions::new().read(true).write(true).open("/dev/dri/card0")?;
//!     let context = DrmContext::create(card.as_fd())?;
//!     tracing::info!("Using backend {}", context.backend_name());
//!
//!     let drawable = context.create_drawable(1920, 1080, DrmFourcc::Xrgb8888 as u32)?;
//!     let dmabuf = drawable.export()?;
//!     tracing::info!("Exported handle {} as {:?}", drawable.handle(), dmabuf);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod context;
pub mod device;
pub mod drawable;
pub mod error;
pub mod format;
pub mod logging;
pub mod registry;

mod ioctl;

pub use backend::{Backend, BackendContext};
pub use config::{ConfigLoader, DrmConfig};
pub use context::DrmContext;
pub use device::{DeviceId, DeviceProbe};
pub use drawable::{BufferOrigin, Drawable, DrawableInfo, DrawableOps};
pub use error::{ConfigError, DrmError, IdentifyError, LoggingError};
pub use format::DrmFourcc;
pub use logging::{init_logging, init_minimal_logging};
pub use registry::Registry;
