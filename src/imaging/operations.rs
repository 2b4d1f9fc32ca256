//! High-level image operations.
//!
//! These functions combine calculations with codec execution.
//! They take configuration, compute parameters, and call the codec.

use super::backend::{BackendError, DecodedImage, ImageCodec};
use super::calculations::calculate_thumbnail_dimensions;
use super::params::{Quality, ThumbnailParams};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Configuration for thumbnail generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailConfig {
    /// Bound on the longer edge in pixels. `0` disables thumbnails.
    pub max_dimension: u32,
    pub quality: Quality,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_dimension: 80,
            quality: Quality::default(),
        }
    }
}

/// Plan a thumbnail operation without executing it.
///
/// Returns `None` when thumbnails are disabled.
pub fn plan_thumbnail(source: (u32, u32), config: &ThumbnailConfig) -> Option<ThumbnailParams> {
    if config.max_dimension == 0 {
        return None;
    }
    let (width, height) = calculate_thumbnail_dimensions(source, config.max_dimension);
    Some(ThumbnailParams {
        width,
        height,
        quality: config.quality,
    })
}

/// Create a thumbnail for a decoded image.
///
/// `Ok(None)` means thumbnails are disabled for this run.
pub fn create_thumbnail(
    codec: &(impl ImageCodec + ?Sized),
    image: &DecodedImage,
    config: &ThumbnailConfig,
) -> Result<Option<Vec<u8>>> {
    let source = (image.probe.width, image.probe.height);
    match plan_thumbnail(source, config) {
        Some(params) => codec.thumbnail(image, &params).map(Some),
        None => Ok(None),
    }
}
