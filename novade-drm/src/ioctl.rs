//! Typed wrappers around the DRM ioctls used by the bundled backends.
//!
//! Layouts follow `drm.h`, `drm_mode.h` and `i915_drm.h`. Calls interrupted
//! by a signal are restarted a bounded number of times.

use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd};

use nix::errno::Errno;
use nix::{ioctl_readwrite, ioctl_write_ptr};

const DRM_IOCTL_BASE: u8 = b'd';
const DRM_COMMAND_BASE: u8 = 0x40;

/// `DRM_CLOEXEC` flag for PRIME export.
pub const DRM_CLOEXEC: u32 = libc::O_CLOEXEC as u32;
/// `DRM_RDWR` flag for PRIME export.
pub const DRM_RDWR: u32 = libc::O_RDWR as u32;

pub const I915_PARAM_CHIPSET_ID: i32 = 4;
pub const I915_TILING_NONE: u32 = 0;
pub const I915_TILING_X: u32 = 1;

#[repr(C)]
#[derive(Debug, Default)]
pub struct GemClose {
    handle: u32,
    pad: u32,
}

#[repr(C)]
#[derive(Debug, Default)]
pub struct GemOpen {
    name: u32,
    handle: u32,
    size: u64,
}

#[repr(C)]
#[derive(Debug, Default)]
pub struct PrimeHandle {
    handle: u32,
    flags: u32,
    fd: i32,
}

#[repr(C)]
#[derive(Debug, Default)]
pub struct ModeCreateDumb {
    height: u32,
    width: u32,
    bpp: u32,
    flags: u32,
    handle: u32,
    pitch: u32,
    size: u64,
}

#[repr(C)]
#[derive(Debug, Default)]
pub struct ModeDestroyDumb {
    handle: u32,
}

#[repr(C)]
#[derive(Debug)]
pub struct I915GetParam {
    param: i32,
    value: *mut i32,
}

#[repr(C)]
#[derive(Debug, Default)]
pub struct I915GemCreate {
    size: u64,
    handle: u32,
    pad: u32,
}

#[repr(C)]
#[derive(Debug, Default)]
pub struct I915GemSetTiling {
    handle: u32,
    tiling_mode: u32,
    stride: u32,
    swizzle_mode: u32,
}

ioctl_write_ptr!(drm_gem_close, DRM_IOCTL_BASE, 0x09, GemClose);
ioctl_readwrite!(drm_gem_open, DRM_IOCTL_BASE, 0x0b, GemOpen);
ioctl_readwrite!(drm_prime_handle_to_fd, DRM_IOCTL_BASE, 0x2d, PrimeHandle);
ioctl_readwrite!(drm_prime_fd_to_handle, DRM_IOCTL_BASE, 0x2e, PrimeHandle);
ioctl_readwrite!(drm_mode_create_dumb, DRM_IOCTL_BASE, 0xb2, ModeCreateDumb);
ioctl_readwrite!(drm_mode_destroy_dumb, DRM_IOCTL_BASE, 0xb4, ModeDestroyDumb);
ioctl_readwrite!(drm_i915_getparam, DRM_IOCTL_BASE, DRM_COMMAND_BASE + 0x06, I915GetParam);
ioctl_readwrite!(drm_i915_gem_create, DRM_IOCTL_BASE, DRM_COMMAND_BASE + 0x1b, I915GemCreate);
ioctl_readwrite!(drm_i915_gem_set_tiling, DRM_IOCTL_BASE, DRM_COMMAND_BASE + 0x21, I915GemSetTiling);

/// Upper bound on restarts of one interrupted ioctl.
const MAX_INTERRUPTED_RETRIES: u32 = 16;

/// Restarts a call interrupted by a signal (`EINTR`), as libdrm's `drmIoctl`
/// does, at most [`MAX_INTERRUPTED_RETRIES`] times. Every other error,
/// `EAGAIN` included, is returned to the caller.
fn retry<F>(mut call: F) -> nix::Result<()>
where
    F: FnMut() -> nix::Result<libc::c_int>,
{
    let mut restarts = 0;
    loop {
        match call() {
            Err(Errno::EINTR) if restarts < MAX_INTERRUPTED_RETRIES => restarts += 1,
            Err(e) => return Err(e),
            Ok(_) => return Ok(()),
        }
    }
}

/// Result of `DRM_IOCTL_MODE_CREATE_DUMB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumbBuffer {
    pub handle: u32,
    pub pitch: u32,
    pub size: u64,
}

pub fn create_dumb(fd: BorrowedFd<'_>, width: u32, height: u32, bpp: u32) -> nix::Result<DumbBuffer> {
    let mut arg = ModeCreateDumb {
        height,
        width,
        bpp,
        ..Default::default()
    };
    retry(|| unsafe { drm_mode_create_dumb(fd.as_raw_fd(), &mut arg) })?;
    Ok(DumbBuffer {
        handle: arg.handle,
        pitch: arg.pitch,
        size: arg.size,
    })
}

pub fn destroy_dumb(fd: BorrowedFd<'_>, handle: u32) -> nix::Result<()> {
    let mut arg = ModeDestroyDumb { handle };
    retry(|| unsafe { drm_mode_destroy_dumb(fd.as_raw_fd(), &mut arg) })
}

pub fn gem_close(fd: BorrowedFd<'_>, handle: u32) -> nix::Result<()> {
    let arg = GemClose { handle, pad: 0 };
    retry(|| unsafe { drm_gem_close(fd.as_raw_fd(), &arg) })
}

/// Opens a buffer by its global (flink) name. Returns the handle and size.
pub fn gem_open(fd: BorrowedFd<'_>, name: u32) -> nix::Result<(u32, u64)> {
    let mut arg = GemOpen {
        name,
        ..Default::default()
    };
    retry(|| unsafe { drm_gem_open(fd.as_raw_fd(), &mut arg) })?;
    Ok((arg.handle, arg.size))
}

/// Exports `handle` as a dma-buf descriptor owned by the caller.
pub fn prime_handle_to_fd(fd: BorrowedFd<'_>, handle: u32, flags: u32) -> nix::Result<OwnedFd> {
    let mut arg = PrimeHandle {
        handle,
        flags,
        fd: -1,
    };
    retry(|| unsafe { drm_prime_handle_to_fd(fd.as_raw_fd(), &mut arg) })?;
    if arg.fd < 0 {
        return Err(Errno::EBADF);
    }
    // The kernel installed a new descriptor that nothing else refers to.
    Ok(unsafe { OwnedFd::from_raw_fd(arg.fd) })
}

/// Imports a dma-buf. `prime_fd` stays owned by the caller.
pub fn prime_fd_to_handle(fd: BorrowedFd<'_>, prime_fd: BorrowedFd<'_>) -> nix::Result<u32> {
    let mut arg = PrimeHandle {
        fd: prime_fd.as_raw_fd(),
        ..Default::default()
    };
    retry(|| unsafe { drm_prime_fd_to_handle(fd.as_raw_fd(), &mut arg) })?;
    Ok(arg.handle)
}

pub fn i915_getparam(fd: BorrowedFd<'_>, param: i32) -> nix::Result<i32> {
    let mut value: i32 = 0;
    let mut arg = I915GetParam {
        param,
        value: &mut value,
    };
    retry(|| unsafe { drm_i915_getparam(fd.as_raw_fd(), &mut arg) })?;
    Ok(value)
}

pub fn i915_gem_create(fd: BorrowedFd<'_>, size: u64) -> nix::Result<u32> {
    let mut arg = I915GemCreate {
        size,
        ..Default::default()
    };
    retry(|| unsafe { drm_i915_gem_create(fd.as_raw_fd(), &mut arg) })?;
    Ok(arg.handle)
}

/// Requests `tiling_mode` for `handle`. Returns the mode the kernel applied.
pub fn i915_gem_set_tiling(fd: BorrowedFd<'_>, handle: u32, tiling_mode: u32, stride: u32) -> nix::Result<u32> {
    let mut arg = I915GemSetTiling {
        handle,
        tiling_mode,
        stride,
        swizzle_mode: 0,
    };
    retry(|| unsafe { drm_i915_gem_set_tiling(fd.as_raw_fd(), &mut arg) })?;
    Ok(arg.tiling_mode)
}
