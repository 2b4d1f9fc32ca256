//! Image codec trait and shared types.
//!
//! The [`ImageCodec`] trait defines the two operations extraction needs:
//! decode raw bytes into pixels plus facts, and encode a scaled thumbnail.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec), built on the `image` and
//! `kamadak-exif` crates.

use super::params::ThumbnailParams;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Basic facts about a decoded image.
///
/// `format` and `mode` use the conventional short names (`JPEG`, `PNG`,
/// `RGB`, `RGBA`, `L`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageProbe {
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub mode: String,
}

/// The EXIF tags extraction cares about, kept as their raw string values.
///
/// - `date_time_original`: `DateTimeOriginal` (`0x9003`), e.g. `"2020:01:02 15:04:05"`
/// - `model`: `Model` (`0x0110`), the camera or device name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifTags {
    pub date_time_original: Option<String>,
    pub model: Option<String>,
}

/// A successfully decoded image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub probe: ImageProbe,
    pub exif: ExifTags,
    pub pixels: DynamicImage,
}

/// Trait for image codecs.
///
/// `Sync` so a single codec can be shared across rayon workers.
pub trait ImageCodec: Sync {
    /// Decode `bytes`. Anything that is not a supported image is an error.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError>;

    /// Scale to `params.width` x `params.height` and re-encode as a compressed raster.
    fn thumbnail(
        &self,
        image: &DecodedImage,
        params: &ThumbnailParams,
    ) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::Quality;
    use std::sync::{Arc, Mutex};

    /// Mock codec that records operations without touching pixels.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockCodec {
        /// Returned by every `decode` call; `None` makes decoding fail.
        pub probe: Option<ImageProbe>,
        pub exif: ExifTags,
        pub fail_thumbnail: bool,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(usize),
        Thumbnail {
            width: u32,
            height: u32,
            quality: u32,
        },
    }

    impl MockCodec {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_image(width: u32, height: u32) -> Self {
            Self {
                probe: Some(ImageProbe {
                    format: "JPEG".to_string(),
                    width,
                    height,
                    mode: "RGB".to_string(),
                }),
                ..Self::default()
            }
        }

        pub fn with_exif(mut self, date: Option<&str>, model: Option<&str>) -> Self {
            self.exif = ExifTags {
                date_time_original: date.map(String::from),
                model: model.map(String::from),
            };
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageCodec for MockCodec {
        fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(bytes.len()));

            let probe = self
                .probe
                .clone()
                .ok_or_else(|| BackendError::Decode("No mock image".to_string()))?;
            Ok(DecodedImage {
                pixels: DynamicImage::new_rgb8(1, 1),
                probe,
                exif: self.exif.clone(),
            })
        }

        fn thumbnail(
            &self,
            _image: &DecodedImage,
            params: &ThumbnailParams,
        ) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Thumbnail {
                width: params.width,
                height: params.height,
                quality: params.quality.value(),
            });
            if self.fail_thumbnail {
                return Err(BackendError::Encode("mock failure".to_string()));
            }
            Ok(vec![0xFF, 0xD8, 0xFF, 0xD9])
        }
    }

    /// Lets a test keep a handle on the mock after boxing it into an extractor.
    impl ImageCodec for Arc<MockCodec> {
        fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError> {
            self.as_ref().decode(bytes)
        }

        fn thumbnail(
            &self,
            image: &DecodedImage,
            params: &ThumbnailParams,
        ) -> Result<Vec<u8>, BackendError> {
            self.as_ref().thumbnail(image, params)
        }
    }

    #[test]
    fn mock_records_decode() {
        let codec = MockCodec::with_image(800, 600);
        let decoded = codec.decode(&[1, 2, 3]).unwrap();
        assert_eq!(decoded.probe.width, 800);
        assert_eq!(decoded.probe.height, 600);
        assert_eq!(codec.get_operations(), vec![RecordedOp::Decode(3)]);
    }

    #[test]
    fn mock_without_image_fails_decode() {
        let codec = MockCodec::new();
        assert!(matches!(codec.decode(&[]), Err(BackendError::Decode(_))));
    }

    #[test]
    fn mock_records_thumbnail() {
        let codec = MockCodec::with_image(10, 10);
        let decoded = codec.decode(&[0]).unwrap();
        codec
            .thumbnail(
                &decoded,
                &ThumbnailParams {
                    width: 8,
                    height: 6,
                    quality: Quality::new(70),
                },
            )
            .unwrap();
        assert!(matches!(
            codec.get_operations()[1],
            RecordedOp::Thumbnail {
                width: 8,
                height: 6,
                quality: 70
            }
        ));
    }
}
