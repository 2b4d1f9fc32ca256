//! Pure calculation functions for thumbnail geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate thumbnail dimensions bounded by `max_dimension` on the longer edge.
///
/// The source is scaled uniformly so its longer edge equals `max_dimension`.
/// Images already within the bound keep their original size (no upscaling).
/// Neither edge is ever rounded down to zero.
///
/// # Examples
/// ```
/// # use mailbatch::imaging::calculate_thumbnail_dimensions;
/// // 4000x3000 landscape bounded at 80 → 80x60
/// assert_eq!(calculate_thumbnail_dimensions((4000, 3000), 80), (80, 60));
///
/// // 50x40 is already smaller than the bound → unchanged
/// assert_eq!(calculate_thumbnail_dimensions((50, 40), 80), (50, 40));
/// ```
pub fn calculate_thumbnail_dimensions(source: (u32, u32), max_dimension: u32) -> (u32, u32) {
    let (w, h) = source;
    let longer_edge = w.max(h);

    if longer_edge <= max_dimension {
        return source;
    }

    let scale = |edge: u32| {
        ((edge as f64 * max_dimension as f64 / longer_edge as f64).round() as u32).max(1)
    };
    (scale(w), scale(h))
}
