//! Pixel formats understood by the bundled backends.
//!
//! Formats travel through the dispatcher as raw DRM fourcc codes (`u32`).
//! Backends turn them into [`DrmFourcc`] with [`parse_format`] and size their
//! buffers with [`bytes_per_pixel`].

pub use drm::buffer::DrmFourcc;

use crate::error::DrmError;

/// Converts a raw fourcc into a known [`DrmFourcc`].
pub fn parse_format(raw: u32) -> Result<DrmFourcc, DrmError> {
    DrmFourcc::try_from(raw).map_err(|_| DrmError::InvalidFormat(raw))
}

/// Bytes occupied by one pixel of `format`.
///
/// Only single-plane RGB formats are supported; anything else is rejected
/// with [`DrmError::InvalidFormat`].
pub fn bytes_per_pixel(format: DrmFourcc) -> Result<u32, DrmError> {
    match format {
        DrmFourcc::Xrgb8888
        | DrmFourcc::Argb8888
        | DrmFourcc::Xbgr8888
        | DrmFourcc::Abgr8888
        | DrmFourcc::Rgbx8888
        | DrmFourcc::Rgba8888
        | DrmFourcc::Bgrx8888
        | DrmFourcc::Bgra8888 => Ok(4),
        DrmFourcc::Rgb888 | DrmFourcc::Bgr888 => Ok(3),
        DrmFourcc::Rgb565 | DrmFourcc::Bgr565 => Ok(2),
        DrmFourcc::C8 => Ok(1),
        other => Err(DrmError::InvalidFormat(other as u32)),
    }
}

/// Convenience wrapper: raw fourcc to bytes per pixel.
pub fn raw_bytes_per_pixel(raw: u32) -> Result<u32, DrmError> {
    bytes_per_pixel(parse_format(raw)?)
}
