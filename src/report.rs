//! Per-group reports: an HTML document and a structured text fallback.
//!
//! Both are pure functions of a [`Group`]. The HTML report shows one table
//! per record in group order, with a second table for image facts and an
//! inlined thumbnail when present, and ends with a file count and total size.
//! The text report is a versioned JSON document of the same records.
//!
//! ## Text schema
//!
//! ```text
//! { "version": 1, "files": [ <FileMetadata>, ... ] }
//! ```
//!
//! Thumbnail bytes are not part of the schema. A record that cannot be
//! represented becomes `null` instead of failing the report.

use crate::group::Group;
use crate::metadata::{FileMetadata, ImageInfo};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use serde_json::{Value, json};
use std::fmt::Display;
use tracing::warn;

const CSS: &str = include_str!("../static/report.css");

/// Bumped whenever the text report layout changes.
pub const TEXT_SCHEMA_VERSION: u32 = 1;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const EXIF_TIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

const PREFIXES: [&str; 8] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi"];

/// Human-readable binary size: `0B`, `1023B`, `1.0KiB`, `45.3MiB`.
pub fn format_size(bytes: u64) -> String {
    format_magnitude(bytes as f64)
}

fn format_magnitude(mut num: f64) -> String {
    for prefix in PREFIXES {
        if num.abs() < 1024.0 {
            return if prefix.is_empty() {
                format!("{}B", num as i64)
            } else {
                format!("{num:.1}{prefix}B")
            };
        }
        num /= 1024.0;
    }
    format!("{num:.1}YiB")
}

/// A point in time as found in metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeSource<'a> {
    /// Seconds since the Unix epoch (filesystem timestamps).
    Unix(f64),
    /// EXIF `YYYY:MM:DD HH:MM:SS`, already local to the camera.
    Exif(&'a str),
}

/// Format as `YYYY-MM-DD HH:MM:SS` in local time. `None` when unparseable.
pub fn format_time(source: TimeSource<'_>) -> Option<String> {
    format_time_in(source, &Local)
}

/// [`format_time`] with an explicit zone for Unix timestamps.
pub fn format_time_in<Tz>(source: TimeSource<'_>, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match source {
        TimeSource::Unix(secs) => {
            if !secs.is_finite() {
                return None;
            }
            let utc = DateTime::from_timestamp(secs.floor() as i64, 0)?;
            Some(utc.with_timezone(tz).format(TIME_FORMAT).to_string())
        }
        TimeSource::Exif(text) => {
            let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
            NaiveDateTime::parse_from_str(text, EXIF_TIME_FORMAT)
                .ok()
                .map(|t| t.format(TIME_FORMAT).to_string())
        }
    }
}

fn size_cell(bytes: u64) -> String {
    if bytes > 1024 {
        format!("{bytes} ({})", format_size(bytes))
    } else {
        bytes.to_string()
    }
}

fn unix_cell(secs: f64) -> String {
    format_time(TimeSource::Unix(secs)).unwrap_or_else(|| "N/A".to_string())
}

fn data_uri(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg))
}

fn summary_line(group: &Group<'_>) -> String {
    format!("{} files, {}.", group.len(), format_size(group.total_size()))
}

fn image_table(image: &ImageInfo) -> Markup {
    // Unparseable EXIF dates are shown verbatim.
    let date = image.date.as_deref().map(|d| {
        format_time(TimeSource::Exif(d)).unwrap_or_else(|| d.to_string())
    });
    html! {
        table.image {
            tr {
                @if let Some(thumb) = &image.thumbnail {
                    td rowspan="4" { img src=(data_uri(thumb)); }
                }
                th colspan="4" { "Image" }
            }
            tr {
                th { "Date" } td { (date.as_deref().unwrap_or("N/A")) }
                th { "Size" } td { (image.size.0) "x" (image.size.1) }
            }
            tr {
                th { "Format" } td { (image.format) }
                th { "Mode" } td { (image.mode) }
            }
            tr {
                th { "Device" } td { (image.device.as_deref().unwrap_or("N/A")) }
            }
        }
    }
}

fn record_table(index: usize, record: &FileMetadata) -> Markup {
    let file = &record.file;
    html! {
        table.record cellspacing="0" cellpadding="0" {
            caption { "# " (index) }
            tr {
                td {
                    table.file width="1" {
                        tr { th colspan="4" { "File" } }
                        tr {
                            th { "Name" } td { (file.name) }
                            th { "Size" } td { (size_cell(file.size)) }
                        }
                        tr {
                            th { "Created" } td { (unix_cell(file.date.created)) }
                            th { "Modified" } td { (unix_cell(file.date.modified)) }
                        }
                        tr { th { "md5" } td colspan="3" { (file.hash.md5) } }
                        tr { th { "sha256" } td colspan="3" { (file.hash.sha256) } }
                        tr {
                            th { "Type" }
                            td colspan="3" {
                                label {
                                    input type="checkbox";
                                    div.detail { (record.type_description.as_deref().unwrap_or("N/A")) }
                                }
                            }
                        }
                    }
                }
                @if let Some(image) = &record.image {
                    td valign="top" { (image_table(image)) }
                }
            }
        }
    }
}

/// Render the HTML report for `group`.
pub fn render_html(group: &Group<'_>) -> String {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                style { (PreEscaped(CSS)) }
            }
            body {
                @for (i, record) in group.members().iter().enumerate() {
                    (record_table(i, record))
                    br;
                }
                hr;
                p.summary { (summary_line(group)) }
            }
        }
    }
    .into_string()
}

/// Render the JSON text report for `group`.
pub fn render_text(group: &Group<'_>) -> String {
    let files: Vec<Value> = group
        .members()
        .iter()
        .map(|record| {
            serde_json::to_value(record).unwrap_or_else(|e| {
                warn!(file = record.name(), "record not representable as JSON: {e}");
                Value::Null
            })
        })
        .collect();
    let report = json!({
        "version": TEXT_SCHEMA_VERSION,
        "files": files,
    });
    format!("{report:#}")
}
