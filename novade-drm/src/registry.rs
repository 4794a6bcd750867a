//! Backend registry and selection.
//!
//! The registry is an ordered list of backend descriptors ending with the
//! generic fallback. Selection walks the list in order and returns the first
//! backend whose capability test accepts the device; specialized backends
//! therefore win over the fallback, and among specialized backends the one
//! registered first wins.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::backend::dumb::DumbBackend;
use crate::backend::Backend;
use crate::config::BackendsConfig;
use crate::device::DeviceId;
use crate::error::DrmError;

static BUILTIN: Lazy<Registry> = Lazy::new(|| {
    #[allow(unused_mut)]
    let mut specialized: Vec<Arc<dyn Backend>> = Vec::new();
    #[cfg(feature = "intel")]
    specialized.push(Arc::new(crate::backend::intel::IntelBackend::new()));
    Registry::new(specialized, Arc::new(DumbBackend::new()))
});

/// Ordered, immutable set of backends.
pub struct Registry {
    backends: Vec<Arc<dyn Backend>>,
}

impl Registry {
    /// Builds a registry from `specialized` backends, in priority order,
    /// followed by `fallback`.
    pub fn new(specialized: Vec<Arc<dyn Backend>>, fallback: Arc<dyn Backend>) -> Self {
        let mut backends = specialized;
        backends.push(fallback);
        Self { backends }
    }

    /// Returns the process-wide registry of bundled backends.
    ///
    /// It holds the backends enabled at build time followed by the dumb
    /// fallback, and is never modified after first use.
    pub fn builtin() -> &'static Registry {
        &BUILTIN
    }

    /// All backends in selection order; the last one is the fallback.
    pub fn backends(&self) -> &[Arc<dyn Backend>] {
        &self.backends
    }

    /// The generic backend at the end of the list.
    pub fn fallback(&self) -> &Arc<dyn Backend> {
        // `new` always appends one.
        &self.backends[self.backends.len() - 1]
    }

    /// Returns `true` if `backend` is this registry's fallback.
    pub fn is_fallback(&self, backend: &Arc<dyn Backend>) -> bool {
        Arc::ptr_eq(self.fallback(), backend)
    }

    /// Backend names in selection order.
    pub fn names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Looks a backend up by name.
    pub fn find(&self, name: &str) -> Option<&Arc<dyn Backend>> {
        self.backends.iter().find(|b| b.name() == name)
    }

    /// Selects the first backend that supports `id`.
    ///
    /// # Errors
    ///
    /// [`DrmError::UnsupportedDevice`] if no backend, fallback included, accepts the device.
    pub fn select(&self, id: DeviceId) -> Result<&Arc<dyn Backend>, DrmError> {
        self.select_with(id, &BackendsConfig::default())
    }

    /// Like [`Registry::select`], honouring the selection adjustments in `config`.
    ///
    /// With `force_generic` the fallback is returned without consulting any
    /// capability test. Backends listed in `disabled` are skipped, except the
    /// fallback.
    pub fn select_with(&self, id: DeviceId, config: &BackendsConfig) -> Result<&Arc<dyn Backend>, DrmError> {
        if config.force_generic {
            let fallback = self.fallback();
            tracing::debug!("Generic backend '{}' forced for device {}", fallback.name(), id);
            return Ok(fallback);
        }

        for backend in &self.backends {
            if !self.is_fallback(backend) && config.is_disabled(backend.name()) {
                tracing::debug!("Skipping disabled backend '{}'", backend.name());
                continue;
            }
            if backend.device_supported(id) {
                tracing::debug!("Backend '{}' selected for device {}", backend.name(), id);
                return Ok(backend);
            }
        }

        tracing::warn!("No backend supports device {}", id);
        Err(DrmError::UnsupportedDevice {
            vendor_id: id.vendor_id,
            device_id: id.device_id,
        })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("backends", &self.names()).finish()
    }
}
