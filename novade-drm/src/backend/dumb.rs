//! Generic fallback backend built on KMS dumb buffers.
//!
//! Dumb buffers are supported by every modesetting driver, so this backend
//! accepts any device. It provides unaccelerated, linear buffers only.
//!
//! Import ownership: [`BackendContext::import`] borrows the dma-buf descriptor;
//! the kernel keeps its own reference, so the caller may close it afterwards.

use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::sync::Arc;

use crate::backend::{self, Backend, BackendContext};
use crate::device::DeviceId;
use crate::drawable::{BufferOrigin, Drawable, DrawableInfo, DrawableOps};
use crate::error::DrmError;
use crate::format;
use crate::ioctl;

/// Registry name of the dumb backend.
pub const NAME: &str = "dumb";

/// Descriptor of the dumb-buffer backend.
#[derive(Debug)]
pub struct DumbBackend {
    name: &'static str,
}

impl DumbBackend {
    pub fn new() -> Self {
        Self { name: NAME }
    }
}

impl Default for DumbBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for DumbBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn device_supported(&self, _id: DeviceId) -> bool {
        true
    }

    fn create_context(&self, fd: BorrowedFd<'_>) -> Result<Box<dyn BackendContext>, DrmError> {
        let device = backend::duplicate_device(NAME, fd)?;
        tracing::debug!("dumb: context created");
        Ok(Box::new(DumbContext {
            device,
            ops: Arc::new(DumbDrawableOps),
        }))
    }
}

struct DumbContext {
    device: Arc<OwnedFd>,
    ops: Arc<DumbDrawableOps>,
}

impl DumbContext {
    fn ops(&self) -> Arc<dyn DrawableOps> {
        self.ops.clone()
    }
}

impl BackendContext for DumbContext {
    fn create_drawable(&self, width: u32, height: u32, format: u32) -> Result<Drawable, DrmError> {
        backend::check_dimensions(width, height)?;
        let bpp = format::raw_bytes_per_pixel(format)? * 8;

        let dumb = ioctl::create_dumb(self.device.as_fd(), width, height, bpp)
            .map_err(|e| DrmError::backend(NAME, "create_drawable", e))?;

        let info = DrawableInfo {
            width,
            height,
            format,
            pitch: dumb.pitch,
            size: dumb.size,
        };
        Ok(Drawable::new(
            info,
            Arc::clone(&self.device),
            dumb.handle,
            BufferOrigin::Created,
            self.ops(),
        ))
    }

    fn import(
        &self,
        width: u32,
        height: u32,
        format: u32,
        prime_fd: BorrowedFd<'_>,
        pitch: u32,
    ) -> Result<Drawable, DrmError> {
        let info = DrawableInfo {
            width,
            height,
            format,
            pitch,
            size: u64::from(pitch) * u64::from(height),
        };
        backend::import_prime(NAME, &self.device, info, prime_fd, self.ops())
    }

    fn import_gem(
        &self,
        width: u32,
        height: u32,
        format: u32,
        gem_name: u32,
        pitch: u32,
    ) -> Result<Drawable, DrmError> {
        let info = DrawableInfo {
            width,
            height,
            format,
            pitch,
            size: 0,
        };
        backend::import_name(NAME, &self.device, info, gem_name, self.ops())
    }
}

/// Drawable operations for dumb-backend drawables.
struct DumbDrawableOps;

impl DrawableOps for DumbDrawableOps {
    fn backend_name(&self) -> &'static str {
        NAME
    }

    fn export(&self, drawable: &Drawable) -> Result<OwnedFd, DrmError> {
        backend::prime_export(NAME, drawable)
    }

    fn handle(&self, drawable: &Drawable) -> u32 {
        drawable.raw_handle()
    }

    fn release(&self, drawable: &Drawable) {
        match drawable.origin() {
            BufferOrigin::Created => {
                if let Err(e) = ioctl::destroy_dumb(drawable.device(), drawable.raw_handle()) {
                    tracing::warn!(
                        "dumb: failed to destroy dumb buffer {}: {}",
                        drawable.raw_handle(),
                        e
                    );
                }
            }
            BufferOrigin::PrimeImport | BufferOrigin::NameImport => {
                backend::close_handle(NAME, drawable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::DrmFourcc;
    use nix::errno::Errno;
    use std::fs::File;

    fn null_context() -> Box<dyn BackendContext> {
        let null = File::open("/dev/null").unwrap();
        DumbBackend::new().create_context(null.as_fd()).unwrap()
    }

    #[test]
    fn test_accepts_every_device() {
        let backend = DumbBackend::new();
        assert!(backend.device_supported(DeviceId::new(0x8086, 0x5917)));
        assert!(backend.device_supported(DeviceId::new(0, 0)));
        assert_eq!(backend.name(), "dumb");
    }

    #[test]
    fn test_context_outlives_callers_descriptor() {
        let context = null_context();
        // The caller's File is already closed; the context still owns its duplicate.
        let err = context
            .create_drawable(64, 64, DrmFourcc::Xrgb8888 as u32)
            .unwrap_err();
        assert!(matches!(
            err,
            DrmError::Backend { backend: "dumb", operation: "create_drawable", source: Errno::ENOTTY }
        ));
    }

    #[test]
    fn test_create_drawable_rejects_zero_size() {
        let context = null_context();
        assert!(matches!(
            context.create_drawable(0, 64, DrmFourcc::Xrgb8888 as u32),
            Err(DrmError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_create_drawable_rejects_unknown_format() {
        let context = null_context();
        assert!(matches!(
            context.create_drawable(64, 64, 0x1234_5678),
            Err(DrmError::InvalidFormat(0x1234_5678))
        ));
    }

    #[test]
    fn test_imports_surface_kernel_errors() {
        let context = null_context();
        let prime = File::open("/dev/null").unwrap();

        let err = context
            .import(64, 64, DrmFourcc::Argb8888 as u32, prime.as_fd(), 256)
            .unwrap_err();
        assert!(matches!(err, DrmError::Backend { operation: "import", .. }));

        let err = context
            .import_gem(64, 64, DrmFourcc::Argb8888 as u32, 42, 256)
            .unwrap_err();
        assert!(matches!(err, DrmError::Backend { operation: "import_gem", .. }));
    }
}
