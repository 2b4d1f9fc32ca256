//! Thumbnail encode settings.
//!
//! [`operations`](super::operations) fills these in from the source size and
//! the configured bound; a [`backend`](super::backend) only ever sees the
//! final numbers.

/// JPEG quality, always within 1..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    /// Out-of-range values are clamped rather than rejected.
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Final thumbnail size in pixels plus encode quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailParams {
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}
