//! Drawables: backend-produced buffer objects.
//!
//! A [`Drawable`] carries its own reference to the operation table of the
//! backend that produced it ([`DrawableOps`]) together with a shared reference
//! to that backend's device descriptor. Export, handle retrieval and release
//! are dispatched through that table, never through a context, so a drawable
//! stays usable after the context that created it is destroyed.

use std::fmt;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::sync::Arc;

use crate::error::DrmError;

/// How the buffer object behind a drawable came into existence.
///
/// Backends use this to pick the right release path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferOrigin {
    /// Allocated by the backend's drawable constructor.
    Created,
    /// Imported from a dma-buf descriptor.
    PrimeImport,
    /// Opened through a global (flink) name.
    NameImport,
}

/// Geometry and format of a drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawableInfo {
    pub width: u32,
    pub height: u32,
    /// DRM fourcc code.
    pub format: u32,
    /// Row pitch in bytes.
    pub pitch: u32,
    /// Total size in bytes, `0` when the kernel did not report one.
    pub size: u64,
}

/// Drawable-level operation table of one backend family.
///
/// Implementations must only be handed drawables produced by their own
/// backend; [`Drawable`] enforces that by storing the table it was built with.
pub trait DrawableOps: Send + Sync {
    /// Name of the backend family this table belongs to.
    fn backend_name(&self) -> &'static str;

    /// Returns a new shareable descriptor (dma-buf) for the drawable.
    fn export(&self, drawable: &Drawable) -> Result<OwnedFd, DrmError>;

    /// Returns the backend-specific numeric handle of the drawable.
    fn handle(&self, drawable: &Drawable) -> u32;

    /// Frees the buffer object. Called exactly once, when the drawable is dropped.
    fn release(&self, drawable: &Drawable);
}

/// A buffer surface produced by a backend.
pub struct Drawable {
    info: DrawableInfo,
    device: Arc<OwnedFd>,
    raw_handle: u32,
    origin: BufferOrigin,
    ops: Arc<dyn DrawableOps>,
}

impl Drawable {
    /// Wraps a backend buffer object.
    ///
    /// # Arguments
    /// * `info`: geometry and format of the buffer.
    /// * `device`: the backend's device descriptor, shared with its context.
    /// * `raw_handle`: the backend's own handle for the buffer (a GEM handle for the bundled backends).
    /// * `origin`: whether the buffer was created or imported.
    /// * `ops`: the producing backend's drawable operation table.
    pub fn new(
        info: DrawableInfo,
        device: Arc<OwnedFd>,
        raw_handle: u32,
        origin: BufferOrigin,
        ops: Arc<dyn DrawableOps>,
    ) -> Self {
        tracing::trace!(
            "{} drawable {}x{} pitch {} handle {} ({:?})",
            ops.backend_name(),
            info.width,
            info.height,
            info.pitch,
            raw_handle,
            origin
        );
        Self {
            info,
            device,
            raw_handle,
            origin,
            ops,
        }
    }

    /// Exports the drawable as a shareable descriptor owned by the caller.
    ///
    /// Dispatched through the drawable's own operation table.
    pub fn export(&self) -> Result<OwnedFd, DrmError> {
        self.ops.export(self)
    }

    /// Returns the backend-specific handle of the drawable.
    ///
    /// Dispatched through the drawable's own operation table.
    pub fn handle(&self) -> u32 {
        self.ops.handle(self)
    }

    pub fn info(&self) -> &DrawableInfo {
        &self.info
    }

    pub fn width(&self) -> u32 {
        self.info.width
    }

    pub fn height(&self) -> u32 {
        self.info.height
    }

    pub fn format(&self) -> u32 {
        self.info.format
    }

    pub fn pitch(&self) -> u32 {
        self.info.pitch
    }

    pub fn origin(&self) -> BufferOrigin {
        self.origin
    }

    /// Name of the backend that produced this drawable.
    pub fn backend_name(&self) -> &'static str {
        self.ops.backend_name()
    }

    /// Handle as stored at construction, for use by operation tables.
    pub fn raw_handle(&self) -> u32 {
        self.raw_handle
    }

    /// Device descriptor the buffer object lives on.
    pub fn device(&self) -> BorrowedFd<'_> {
        self.device.as_fd()
    }
}

impl fmt::Debug for Drawable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drawable")
            .field("backend", &self.ops.backend_name())
            .field("info", &self.info)
            .field("raw_handle", &self.raw_handle)
            .field("origin", &self.origin)
            .finish()
    }
}

impl Drop for Drawable {
    fn drop(&mut self) {
        let ops = Arc::clone(&self.ops);
        ops.release(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingOps {
        released: AtomicUsize,
    }

    impl DrawableOps for CountingOps {
        fn backend_name(&self) -> &'static str {
            "counting"
        }

        fn export(&self, drawable: &Drawable) -> Result<OwnedFd, DrmError> {
            drawable
                .device()
                .try_clone_to_owned()
                .map_err(|_| DrmError::InvalidFormat(drawable.format()))
        }

        fn handle(&self, drawable: &Drawable) -> u32 {
            drawable.raw_handle() * 10
        }

        fn release(&self, _drawable: &Drawable) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn device() -> Arc<OwnedFd> {
        Arc::new(OwnedFd::from(File::open("/dev/null").unwrap()))
    }

    fn info() -> DrawableInfo {
        DrawableInfo {
            width: 64,
            height: 32,
            format: 0x3432_5258,
            pitch: 256,
            size: 8192,
        }
    }

    #[test]
    fn test_operations_dispatch_through_own_table() {
        let drawable = Drawable::new(info(), device(), 7, BufferOrigin::Created, Arc::new(CountingOps::default()));

        assert_eq!(drawable.handle(), 70);
        assert!(drawable.export().is_ok());
        assert_eq!(drawable.backend_name(), "counting");
        assert_eq!(drawable.pitch(), 256);
    }

    #[test]
    fn test_release_runs_once_on_drop() {
        let ops = Arc::new(CountingOps::default());
        let drawable = Drawable::new(info(), device(), 1, BufferOrigin::PrimeImport, ops.clone());
        assert_eq!(ops.released.load(Ordering::SeqCst), 0);

        drop(drawable);
        assert_eq!(ops.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_debug_names_backend() {
        let drawable = Drawable::new(info(), device(), 3, BufferOrigin::NameImport, Arc::new(CountingOps::default()));
        let text = format!("{:?}", drawable);
        assert!(text.contains("counting"));
        assert!(text.contains("NameImport"));
    }
}
