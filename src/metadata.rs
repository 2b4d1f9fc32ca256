//! File metadata records and their extraction.
//!
//! One [`FileMetadata`] is produced per input file and never mutated after.
//! Its serialized shape is the text report schema, and its field names are
//! the segments [`crate::sort`] key paths walk:
//!
//! ```text
//! file.name            file.path            file.size
//! file.date.created    file.date.modified
//! file.hash.md5        file.hash.sha256
//! type_description
//! image.format  image.size  image.mode  image.date  image.device
//! ```
//!
//! ## Capabilities
//!
//! The [`Extractor`] always reads through a [`FileSource`]. Type sniffing and
//! image decoding are optional capabilities, resolved once when the extractor
//! is built. A missing capability, or content the codec cannot decode, only
//! leaves the corresponding optional fields empty; it is never an error.
//! Unreadable files are.

use crate::fs::{FileSource, LocalFs};
use crate::imaging::{DecodedImage, ImageCodec, Quality, RustCodec, ThumbnailConfig};
use crate::sniff::{InferSniffer, TypeSniffer};
use md5::Md5;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExtractError {
    pub fn path(&self) -> &Path {
        match self {
            ExtractError::Io { path, .. } => path,
        }
    }
}

/// Everything extracted from one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMetadata {
    pub file: FileInfo,
    /// Sniffed type, `None` when no sniffer is configured or nothing matched.
    pub type_description: Option<String>,
    /// Present iff the content decoded as an image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageInfo>,
}

impl FileMetadata {
    pub fn name(&self) -> &str {
        &self.file.name
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    pub fn size(&self) -> u64 {
        self.file.size
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    /// Final path component.
    pub name: String,
    /// Absolute, lexically normalized path.
    #[serde(serialize_with = "serialize_lossy")]
    pub path: PathBuf,
    pub size: u64,
    pub date: FileDates,
    pub hash: Hashes,
}

// Non-UTF-8 paths would otherwise fail serialization.
fn serialize_lossy<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

/// Filesystem timestamps in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FileDates {
    pub created: f64,
    pub modified: f64,
}

/// Hex digests of the full file content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hashes {
    pub md5: String,
    pub sha256: String,
}

impl Hashes {
    pub fn of(data: &[u8]) -> Self {
        Self {
            md5: format!("{:x}", Md5::digest(data)),
            sha256: format!("{:x}", Sha256::digest(data)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    pub format: String,
    /// `(width, height)` in pixels.
    pub size: (u32, u32),
    pub mode: String,
    /// EXIF `DateTimeOriginal`, verbatim (`YYYY:MM:DD HH:MM:SS`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// EXIF `Model`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// JPEG thumbnail bytes. Left out of the text schema; the HTML report inlines it.
    #[serde(skip)]
    pub thumbnail: Option<Vec<u8>>,
}

impl ImageInfo {
    fn from_decoded(decoded: &DecodedImage, thumbnail: Option<Vec<u8>>) -> Self {
        Self {
            format: decoded.probe.format.clone(),
            size: (decoded.probe.width, decoded.probe.height),
            mode: decoded.probe.mode.clone(),
            date: decoded.exif.date_time_original.clone(),
            device: decoded.exif.model.clone(),
            thumbnail,
        }
    }
}

/// Make `path` absolute and resolve `.` and `..` lexically (symlinks are not followed).
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Metadata extractor with injected capabilities.
pub struct Extractor {
    source: Box<dyn FileSource>,
    sniffer: Option<Box<dyn TypeSniffer>>,
    codec: Option<Box<dyn ImageCodec>>,
    quality: Quality,
}

impl Extractor {
    /// An extractor with no optional capabilities: hashes and file facts only.
    pub fn new(source: impl FileSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            sniffer: None,
            codec: None,
            quality: Quality::default(),
        }
    }

    /// Local filesystem, `infer` sniffing and the pure Rust codec.
    pub fn with_defaults() -> Self {
        Self::new(LocalFs)
            .with_sniffer(InferSniffer)
            .with_codec(RustCodec::new())
    }

    pub fn with_sniffer(mut self, sniffer: impl TypeSniffer + 'static) -> Self {
        self.sniffer = Some(Box::new(sniffer));
        self
    }

    pub fn with_codec(mut self, codec: impl ImageCodec + 'static) -> Self {
        self.codec = Some(Box::new(codec));
        self
    }

    /// JPEG quality used for thumbnails.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Extract metadata for one file.
    ///
    /// `thumbnail_bound` limits the longer thumbnail edge in pixels; `0`
    /// disables thumbnails. Only I/O failures are errors.
    pub fn extract(&self, path: &Path, thumbnail_bound: u32) -> Result<FileMetadata, ExtractError> {
        let io_err = |source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        };
        let stat = self.source.stat(path).map_err(io_err)?;
        let data = self.source.read_all(path).map_err(io_err)?;

        let path = normalize_path(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let type_description = self.sniffer.as_ref().and_then(|s| s.sniff(&data));
        let image = self
            .codec
            .as_deref()
            .and_then(|codec| self.describe_image(codec, &data, &path, thumbnail_bound));
        debug!(
            path = %path.display(),
            size = stat.size,
            image = image.is_some(),
            "extracted metadata"
        );

        Ok(FileMetadata {
            file: FileInfo {
                name,
                size: stat.size,
                date: FileDates {
                    created: stat.created,
                    modified: stat.modified,
                },
                hash: Hashes::of(&data),
                path,
            },
            type_description,
            image,
        })
    }

    fn describe_image(
        &self,
        codec: &dyn ImageCodec,
        data: &[u8],
        path: &Path,
        thumbnail_bound: u32,
    ) -> Option<ImageInfo> {
        let decoded = match codec.decode(data) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!(path = %path.display(), "not an image: {e}");
                return None;
            }
        };

        let config = ThumbnailConfig {
            max_dimension: thumbnail_bound,
            quality: self.quality,
        };
        let thumbnail = crate::imaging::create_thumbnail(codec, &decoded, &config)
            .unwrap_or_else(|e| {
                warn!(path = %path.display(), "thumbnail failed: {e}");
                None
            });
        Some(ImageInfo::from_decoded(&decoded, thumbnail))
    }
}
