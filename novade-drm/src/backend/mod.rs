//! Backend contract and the bundled backends.
//!
//! A backend is described by a [`Backend`] implementation, registered once per
//! process in a [`crate::registry::Registry`]. It decides whether it can drive a
//! device ([`Backend::device_supported`]) and constructs an opaque
//! [`BackendContext`] for a device descriptor. The context builds drawables,
//! and every drawable carries the backend's [`DrawableOps`] table.
//!
//! Bundled backends:
//! - [`dumb`]: generic fallback using KMS dumb buffers, accepts every device.
//! - [`intel`]: i915 GEM with X tiling, accepts Intel devices (feature `intel`).

use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::sync::Arc;

use crate::device::DeviceId;
use crate::drawable::{BufferOrigin, Drawable, DrawableInfo, DrawableOps};
use crate::error::DrmError;
use crate::ioctl;

pub mod dumb;
#[cfg(feature = "intel")]
pub mod intel;

/// Process-wide descriptor of one backend family.
///
/// Implementations are immutable and shared by every context that selects them.
pub trait Backend: Send + Sync {
    /// Short, unique name ("intel", "dumb", ...).
    fn name(&self) -> &'static str;

    /// Capability test: can this backend drive the identified device?
    fn device_supported(&self, id: DeviceId) -> bool;

    /// Builds the backend's context for the device behind `fd`.
    ///
    /// The caller keeps ownership of `fd`; backends that need it beyond this
    /// call must duplicate it.
    fn create_context(&self, fd: BorrowedFd<'_>) -> Result<Box<dyn BackendContext>, DrmError>;

    /// Destroys a context created by [`Backend::create_context`].
    fn destroy_context(&self, context: Box<dyn BackendContext>) {
        drop(context);
    }
}

/// Opaque, backend-private context owned by a [`crate::DrmContext`].
pub trait BackendContext: Send {
    /// Allocates a new drawable. Dimension and format checks are backend-defined.
    fn create_drawable(&self, width: u32, height: u32, format: u32) -> Result<Drawable, DrmError>;

    /// Imports a drawable from a dma-buf descriptor. `prime_fd` stays owned by the caller.
    fn import(
        &self,
        width: u32,
        height: u32,
        format: u32,
        prime_fd: BorrowedFd<'_>,
        pitch: u32,
    ) -> Result<Drawable, DrmError>;

    /// Imports a drawable from a global (flink) buffer name.
    fn import_gem(
        &self,
        width: u32,
        height: u32,
        format: u32,
        gem_name: u32,
        pitch: u32,
    ) -> Result<Drawable, DrmError>;
}

/// Flags used for every PRIME export: close-on-exec, mappable read/write.
pub const PRIME_EXPORT_FLAGS: u32 = ioctl::DRM_CLOEXEC | ioctl::DRM_RDWR;

/// Exports a GEM-backed drawable through PRIME.
pub(crate) fn prime_export(backend: &'static str, drawable: &Drawable) -> Result<OwnedFd, DrmError> {
    ioctl::prime_handle_to_fd(drawable.device(), drawable.raw_handle(), PRIME_EXPORT_FLAGS)
        .map_err(|e| DrmError::backend(backend, "export", e))
}

/// Imports a dma-buf as a GEM handle on `device`.
pub(crate) fn import_prime(
    backend: &'static str,
    device: &Arc<OwnedFd>,
    info: DrawableInfo,
    prime_fd: BorrowedFd<'_>,
    ops: Arc<dyn DrawableOps>,
) -> Result<Drawable, DrmError> {
    let handle = ioctl::prime_fd_to_handle(device.as_fd(), prime_fd)
        .map_err(|e| DrmError::backend(backend, "import", e))?;
    Ok(Drawable::new(info, Arc::clone(device), handle, BufferOrigin::PrimeImport, ops))
}

/// Opens a flink name as a GEM handle on `device`. The kernel reports the size.
pub(crate) fn import_name(
    backend: &'static str,
    device: &Arc<OwnedFd>,
    mut info: DrawableInfo,
    gem_name: u32,
    ops: Arc<dyn DrawableOps>,
) -> Result<Drawable, DrmError> {
    let (handle, size) = ioctl::gem_open(device.as_fd(), gem_name)
        .map_err(|e| DrmError::backend(backend, "import_gem", e))?;
    info.size = size;
    Ok(Drawable::new(info, Arc::clone(device), handle, BufferOrigin::NameImport, ops))
}

/// Closes the GEM handle of a drawable, logging failures.
pub(crate) fn close_handle(backend: &'static str, drawable: &Drawable) {
    if let Err(e) = ioctl::gem_close(drawable.device(), drawable.raw_handle()) {
        tracing::warn!(
            "{}: failed to close GEM handle {}: {}",
            backend,
            drawable.raw_handle(),
            e
        );
    }
}

/// Duplicates the caller's descriptor so the backend owns its own reference.
pub(crate) fn duplicate_device(backend: &'static str, fd: BorrowedFd<'_>) -> Result<Arc<OwnedFd>, DrmError> {
    fd.try_clone_to_owned().map(Arc::new).map_err(|e| {
        let errno = e
            .raw_os_error()
            .map(nix::errno::Errno::from_i32)
            .unwrap_or(nix::errno::Errno::EBADF);
        DrmError::backend(backend, "create_context", errno)
    })
}

/// Rejects zero-sized drawables before they reach the kernel.
pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<(), DrmError> {
    if width == 0 || height == 0 {
        return Err(DrmError::InvalidDimensions { width, height });
    }
    Ok(())
}
