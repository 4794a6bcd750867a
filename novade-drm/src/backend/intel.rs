//! Intel (i915) backend.
//!
//! Buffers are allocated as GEM objects and X-tiled when they are wide enough
//! for tiling to pay off, matching the layout the blitter expects. Context
//! construction verifies that the device really speaks the i915 ioctl set by
//! querying the chipset id.

use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::sync::Arc;

use crate::backend::{self, Backend, BackendContext};
use crate::device::DeviceId;
use crate::drawable::{BufferOrigin, Drawable, DrawableInfo, DrawableOps};
use crate::error::DrmError;
use crate::format;
use crate::ioctl;

/// Registry name of the Intel backend.
pub const NAME: &str = "intel";

/// PCI vendor id of Intel.
pub const INTEL_VENDOR_ID: u32 = 0x8086;

/// Narrower buffers are left linear.
const MIN_TILED_WIDTH: u32 = 128;
const PAGE_SIZE: u64 = 4096;

/// Tiling and memory layout chosen for a drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub tiling: u32,
    pub pitch: u32,
    pub size: u64,
}

/// Computes the i915 layout for a `width`x`height` buffer of `cpp` bytes per pixel.
///
/// X tiles are 512 bytes by 8 rows; linear buffers use a 64-byte pitch and
/// 2-row alignment. The size is rounded up to whole pages.
pub fn layout_for(width: u32, height: u32, cpp: u32) -> Result<Layout, DrmError> {
    let invalid = || DrmError::InvalidDimensions { width, height };
    backend::check_dimensions(width, height)?;

    let (tiling, pitch_align, height_align) = if width >= MIN_TILED_WIDTH {
        (ioctl::I915_TILING_X, 512u32, 8u32)
    } else {
        (ioctl::I915_TILING_NONE, 64u32, 2u32)
    };

    let row_bytes = width.checked_mul(cpp).ok_or_else(invalid)?;
    let pitch = align_u32(row_bytes, pitch_align).ok_or_else(invalid)?;
    let rows = align_u32(height, height_align).ok_or_else(invalid)?;
    let size = align_u64(u64::from(pitch) * u64::from(rows), PAGE_SIZE).ok_or_else(invalid)?;

    Ok(Layout {
        tiling,
        pitch,
        size,
    })
}

fn align_u32(value: u32, align: u32) -> Option<u32> {
    value.checked_add(align - 1).map(|v| v & !(align - 1))
}

fn align_u64(value: u64, align: u64) -> Option<u64> {
    value.checked_add(align - 1).map(|v| v & !(align - 1))
}

/// Descriptor of the Intel backend.
#[derive(Debug)]
pub struct IntelBackend {
    name: &'static str,
}

impl IntelBackend {
    pub fn new() -> Self {
        Self { name: NAME }
    }
}

impl Default for IntelBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for IntelBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn device_supported(&self, id: DeviceId) -> bool {
        id.vendor_id == INTEL_VENDOR_ID
    }

    fn create_context(&self, fd: BorrowedFd<'_>) -> Result<Box<dyn BackendContext>, DrmError> {
        let device = backend::duplicate_device(NAME, fd)?;
        let chipset_id = ioctl::i915_getparam(device.as_fd(), ioctl::I915_PARAM_CHIPSET_ID)
            .map_err(|e| DrmError::backend(NAME, "create_context", e))?;
        tracing::debug!("intel: context created for chipset {:#06x}", chipset_id);
        Ok(Box::new(IntelContext {
            device,
            chipset_id,
            ops: Arc::new(IntelDrawableOps),
        }))
    }
}

struct IntelContext {
    device: Arc<OwnedFd>,
    chipset_id: i32,
    ops: Arc<IntelDrawableOps>,
}

impl IntelContext {
    fn ops(&self) -> Arc<dyn DrawableOps> {
        self.ops.clone()
    }
}

impl BackendContext for IntelContext {
    fn create_drawable(&self, width: u32, height: u32, format: u32) -> Result<Drawable, DrmError> {
        let cpp = format::raw_bytes_per_pixel(format)?;
        let layout = layout_for(width, height, cpp)?;
        let fd = self.device.as_fd();

        let handle = ioctl::i915_gem_create(fd, layout.size)
            .map_err(|e| DrmError::backend(NAME, "create_drawable", e))?;

        let tiling = if layout.tiling == ioctl::I915_TILING_NONE {
            layout.tiling
        } else {
            match ioctl::i915_gem_set_tiling(fd, handle, layout.tiling, layout.pitch) {
                Ok(applied) => applied,
                Err(e) => {
                    if let Err(close_err) = ioctl::gem_close(fd, handle) {
                        tracing::warn!("intel: failed to close GEM handle {}: {}", handle, close_err);
                    }
                    return Err(DrmError::backend(NAME, "create_drawable", e));
                }
            }
        };
        tracing::trace!(
            "intel: chipset {:#06x} buffer {} tiling {} pitch {}",
            self.chipset_id,
            handle,
            tiling,
            layout.pitch
        );

        let info = DrawableInfo {
            width,
            height,
            format,
            pitch: layout.pitch,
            size: layout.size,
        };
        Ok(Drawable::new(
            info,
            Arc::clone(&self.device),
            handle,
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

struct IntelDrawableOps;

impl DrawableOps for IntelDrawableOps {
    fn backend_name(&self) -> &'static str {
        NAME
    }

    fn export(&self, drawable: &Drawable) -> Result<OwnedFd, DrmError> {
        backend::prime_export(NAME, drawable)
    }

    fn handle(&self, drawable: &Drawable) -> u32 {
        drawable.raw_handle()
    }

    // Every i915 buffer, created or imported, is a plain GEM handle.
    fn release(&self, drawable: &Drawable) {
        backend::close_handle(NAME, drawable);
    }
}
