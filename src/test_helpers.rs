//! Shared test utilities for the mailbatch test suite.
//!
//! Provides synthetic image encoders and metadata record builders so unit
//! tests can exercise sorting, grouping and rendering without touching the
//! filesystem.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let records = vec![record("a.jpg", 4 * MIB), record("b.jpg", 3 * MIB)];
//! let photo = with_image(record("c.jpg", 10), Some("2020:01:02 15:04:05"));
//! let jpeg = jpeg_with_exif(64, 48, "2020:01:02 15:04:05", "TestCam");
//! ```

use crate::metadata::{FileDates, FileInfo, FileMetadata, Hashes, ImageInfo};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;
use std::path::PathBuf;

pub const MIB: u64 = 1024 * 1024;

// =========================================================================
// Synthetic images
// =========================================================================

/// Encode a small gradient JPEG with the given dimensions.
pub fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Encode a small half-transparent PNG with the given dimensions.
pub fn create_test_png_rgba(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 64, 128])
    });
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
    buf
}

/// Encode an opaque RGBA gradient in any format the `image` crate writes.
pub fn encode_test_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 200, 255])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, format)
        .unwrap();
    buf.into_inner()
}

/// A JPEG carrying an EXIF APP1 segment with `Model` and `DateTimeOriginal`.
///
/// Layout (big-endian TIFF): IFD0 holds `Model` and the Exif IFD pointer,
/// the Exif IFD holds `DateTimeOriginal`.
pub fn jpeg_with_exif(width: u32, height: u32, date: &str, model: &str) -> Vec<u8> {
    const ASCII: u16 = 2;
    const LONG: u16 = 4;

    let ascii = |s: &str| {
        let mut v = s.as_bytes().to_vec();
        v.push(0);
        v
    };
    let model_value = ascii(model);
    let date_value = ascii(date);

    // Offsets are relative to the start of the TIFF header.
    let ifd0_offset: u32 = 8;
    let ifd0_len: u32 = 2 + 2 * 12 + 4;
    let model_offset = ifd0_offset + ifd0_len;
    let exif_ifd_offset = model_offset + model_value.len() as u32;
    let exif_ifd_len: u32 = 2 + 12 + 4;
    let date_offset = exif_ifd_offset + exif_ifd_len;

    let mut tiff = Vec::new();
    let entry = |tiff: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: u32| {
        tiff.extend_from_slice(&tag.to_be_bytes());
        tiff.extend_from_slice(&kind.to_be_bytes());
        tiff.extend_from_slice(&count.to_be_bytes());
        tiff.extend_from_slice(&value.to_be_bytes());
    };

    tiff.extend_from_slice(b"MM\x00\x2A");
    tiff.extend_from_slice(&ifd0_offset.to_be_bytes());

    tiff.extend_from_slice(&2u16.to_be_bytes());
    entry(&mut tiff, 0x0110, ASCII, model_value.len() as u32, model_offset);
    entry(&mut tiff, 0x8769, LONG, 1, exif_ifd_offset);
    tiff.extend_from_slice(&0u32.to_be_bytes());
    tiff.extend_from_slice(&model_value);

    tiff.extend_from_slice(&1u16.to_be_bytes());
    entry(&mut tiff, 0x9003, ASCII, date_value.len() as u32, date_offset);
    tiff.extend_from_slice(&0u32.to_be_bytes());
    tiff.extend_from_slice(&date_value);

    let mut app1 = vec![0xFF, 0xE1];
    let segment_len = (2 + 6 + tiff.len()) as u16;
    app1.extend_from_slice(&segment_len.to_be_bytes());
    app1.extend_from_slice(b"Exif\x00\x00");
    app1.extend_from_slice(&tiff);

    let jpeg = create_test_jpeg(width, height);
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}

// =========================================================================
// Metadata records
// =========================================================================

/// A non-image record with the given name and size.
pub fn record(name: &str, size: u64) -> FileMetadata {
    FileMetadata {
        file: FileInfo {
            name: name.to_string(),
            path: PathBuf::from("/photos").join(name),
            size,
            date: FileDates {
                created: 1_577_977_445.0,
                modified: 1_577_977_445.0,
            },
            hash: Hashes::of(name.as_bytes()),
        },
        type_description: None,
        image: None,
    }
}

/// Attach image facts (800x600 RGB JPEG) with an optional capture date.
pub fn with_image(mut meta: FileMetadata, date: Option<&str>) -> FileMetadata {
    meta.image = Some(ImageInfo {
        format: "JPEG".to_string(),
        size: (800, 600),
        mode: "RGB".to_string(),
        date: date.map(String::from),
        device: None,
        thumbnail: None,
    });
    meta
}

/// Names of `records`, in order.
pub fn names(records: &[FileMetadata]) -> Vec<&str> {
    records.iter().map(|r| r.file.name.as_str()).collect()
}
