//! Image decoding and thumbnails. Pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (JPEG, PNG, TIFF, WebP, GIF, BMP) |
//! | **EXIF** | `kamadak-exif`: `DateTimeOriginal`, `Model` |
//! | **Thumbnail** | `resize_exact` (Lanczos3) + JPEG encode |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for thumbnail geometry (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageCodec`] trait + [`RustCodec`]
//! - **Operations**: High-level functions combining calculations + codec

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, DecodedImage, ExifTags, ImageCodec, ImageProbe};
pub use calculations::calculate_thumbnail_dimensions;
pub use operations::{ThumbnailConfig, create_thumbnail, plan_thumbnail};
pub use params::{Quality, ThumbnailParams};
pub use rust_backend::RustCodec;
