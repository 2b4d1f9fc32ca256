//! Pure Rust codec, no system libraries.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF, BMP) | `image::ImageReader` with guessed format |
//! | EXIF tags | `kamadak-exif` (`exif::Reader::read_from_container`) |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, DecodedImage, ExifTags, ImageCodec, ImageProbe};
use super::params::ThumbnailParams;
use exif::{In, Tag};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader};
use std::io::Cursor;

/// Pure Rust codec using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Short format name, upper case.
fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::Tiff => "TIFF".to_string(),
        ImageFormat::WebP => "WEBP".to_string(),
        ImageFormat::Gif => "GIF".to_string(),
        ImageFormat::Bmp => "BMP".to_string(),
        other => format!("{other:?}").to_uppercase(),
    }
}

/// Pixel mode name for a color type.
fn mode_name(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 => "L",
        ColorType::La8 => "LA",
        ColorType::Rgb8 => "RGB",
        ColorType::Rgba8 => "RGBA",
        ColorType::L16 => "I;16",
        ColorType::La16 => "LA;16",
        ColorType::Rgb16 => "RGB;16",
        ColorType::Rgba16 => "RGBA;16",
        ColorType::Rgb32F => "RGB;F",
        ColorType::Rgba32F => "RGBA;F",
        _ => "UNKNOWN",
    }
}

/// Read the EXIF tags we care about. Missing or malformed EXIF yields defaults.
fn read_exif(bytes: &[u8]) -> ExifTags {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(e) => {
            tracing::trace!("no readable EXIF: {e}");
            return ExifTags::default();
        }
    };
    ExifTags {
        date_time_original: ascii_field(&exif, Tag::DateTimeOriginal),
        model: ascii_field(&exif, Tag::Model),
    }
}

/// First ASCII value of a tag, with trailing NULs and padding removed.
fn ascii_field(exif: &exif::Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        exif::Value::Ascii(values) => values
            .first()
            .map(|raw| {
                String::from_utf8_lossy(raw)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string()
            })
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

impl ImageCodec for RustCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        let format = reader
            .format()
            .ok_or_else(|| BackendError::Decode("unrecognised image format".to_string()))?;
        let pixels = reader
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        Ok(DecodedImage {
            probe: ImageProbe {
                format: format_name(format),
                width: pixels.width(),
                height: pixels.height(),
                mode: mode_name(pixels.color()).to_string(),
            },
            exif: read_exif(bytes),
            pixels,
        })
    }

    fn thumbnail(
        &self,
        image: &DecodedImage,
        params: &ThumbnailParams,
    ) -> Result<Vec<u8>, BackendError> {
        let source = &image.pixels;
        let rgb = if (source.width(), source.height()) == (params.width, params.height) {
            source.to_rgb8()
        } else {
            source
                .resize_exact(params.width, params.height, FilterType::Lanczos3)
                .to_rgb8()
        };

        // JPEG has no alpha channel, so everything is flattened to RGB8 first.
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, params.quality.value() as u8)
            .write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| BackendError::Encode(e.to_string()))?;
        Ok(buf)
    }
}
