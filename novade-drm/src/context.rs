//! Context lifecycle and drawable dispatch.
//!
//! A [`DrmContext`] binds one device descriptor to the backend selected for
//! it. Creation identifies the device, selects a backend and lets that
//! backend build its private context; the drawable operations are forwarded
//! to that private context.

use std::fmt;
use std::os::fd::BorrowedFd;
use std::sync::Arc;

use crate::backend::{Backend, BackendContext};
use crate::config::DrmConfig;
use crate::device::{DeviceId, DeviceProbe};
use crate::drawable::Drawable;
use crate::error::DrmError;
use crate::registry::Registry;

/// A DRM device bound to its backend.
pub struct DrmContext {
    backend: Arc<dyn Backend>,
    // `None` only while dropping.
    inner: Option<Box<dyn BackendContext>>,
    device_id: DeviceId,
    generic: bool,
}

impl DrmContext {
    /// Creates a context for `fd` using the bundled backends and default settings.
    ///
    /// The caller keeps ownership of `fd`.
    ///
    /// # Errors
    ///
    /// - [`DrmError::DeviceUnidentifiable`] if the device identity cannot be read.
    /// - [`DrmError::UnsupportedDevice`] if no backend accepts the device.
    /// - Any error returned by the selected backend's constructor.
    pub fn create(fd: BorrowedFd<'_>) -> Result<Self, DrmError> {
        Self::create_with(fd, Registry::builtin(), &DrmConfig::default())
    }

    /// Creates a context for `fd`, selecting from `registry` under `config`.
    ///
    /// No backend constructor runs unless identification and selection succeed.
    pub fn create_with(fd: BorrowedFd<'_>, registry: &Registry, config: &DrmConfig) -> Result<Self, DrmError> {
        let probe = DeviceProbe::new(&config.device.sysfs_root);
        let device_id = probe.identify(fd)?;
        let backend = registry.select_with(device_id, &config.backends)?;

        let inner = backend.create_context(fd).map_err(|e| {
            tracing::warn!("Backend '{}' failed to create a context for {}: {}", backend.name(), device_id, e);
            e
        })?;

        let generic = registry.is_fallback(backend);
        tracing::info!(
            "DRM context created for device {} using backend '{}'{}",
            device_id,
            backend.name(),
            if generic { " (generic)" } else { "" }
        );
        Ok(Self {
            backend: Arc::clone(backend),
            inner: Some(inner),
            device_id,
            generic,
        })
    }

    /// Destroys the context, handing the backend context back to its backend.
    ///
    /// Equivalent to dropping the value. Drawables created from this context
    /// stay valid.
    pub fn destroy(self) {
        drop(self);
    }

    /// Returns `true` if the selected backend is the generic fallback.
    pub fn is_generic_backend(&self) -> bool {
        self.generic
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Allocates a new drawable on the selected backend.
    ///
    /// `format` is a DRM fourcc code; validation is up to the backend.
    pub fn create_drawable(&self, width: u32, height: u32, format: u32) -> Result<Drawable, DrmError> {
        self.backend_context().create_drawable(width, height, format)
    }

    /// Imports a drawable from a dma-buf descriptor.
    ///
    /// `prime_fd` is only borrowed and may be closed by the caller afterwards.
    pub fn import(
        &self,
        width: u32,
        height: u32,
        format: u32,
        prime_fd: BorrowedFd<'_>,
        pitch: u32,
    ) -> Result<Drawable, DrmError> {
        self.backend_context().import(width, height, format, prime_fd, pitch)
    }

    /// Imports a drawable from a global (flink) buffer name.
    pub fn import_gem(
        &self,
        width: u32,
        height: u32,
        format: u32,
        gem_name: u32,
        pitch: u32,
    ) -> Result<Drawable, DrmError> {
        self.backend_context().import_gem(width, height, format, gem_name, pitch)
    }

    fn backend_context(&self) -> &dyn BackendContext {
        match &self.inner {
            Some(inner) => inner.as_ref(),
            None => unreachable!("backend context is only taken in Drop"),
        }
    }
}

impl fmt::Debug for DrmContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrmContext")
            .field("backend", &self.backend.name())
            .field("device_id", &self.device_id)
            .field("generic", &self.generic)
            .finish()
    }
}

impl Drop for DrmContext {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            tracing::info!("Destroying '{}' context for device {}", self.backend.name(), self.device_id);
            self.backend.destroy_context(inner);
        }
    }
}
