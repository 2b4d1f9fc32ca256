//! CLI output formatting.
//!
//! Output is message-centric: each planned message is a header line (its
//! position and subject) with its attachments indented below.
//!
//! # Output Format
//!
//! ## Extraction progress
//!
//! ```text
//! [ 1/12] IMG_0001.JPG 4.2MiB image
//! [ 2/12] notes.txt 812B
//! [ 3/12] broken.jpg failed: cannot read broken.jpg: permission denied
//! ```
//!
//! ## Plan
//!
//! ```text
//! 001 batch mailer #1 (1-2/3) 7.0MiB
//!     IMG_0001.JPG
//!     IMG_0002.JPG
//! 002 batch mailer #2 (3-3/3) 5.0MiB
//!     IMG_0003.JPG
//!
//! 2 messages, 3 files, 12.0MiB
//! ```
//!
//! ## Build
//!
//! ```text
//! 001 batch mailer #1 (1-2/3) 7.0MiB → outbox/001.json
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::metadata::ExtractError;
use crate::pipeline::{ExtractEvent, PlannedMessage};
use crate::report::format_size;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `[ 3/12]`, padded so the column stays aligned.
fn counter(index: usize, total: usize) -> String {
    let width = total.to_string().len();
    format!("[{:>width$}/{}]", index + 1, total)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Extraction
// ============================================================================

pub fn format_extract_event(event: &ExtractEvent) -> Vec<String> {
    match event {
        ExtractEvent::Extracted {
            index,
            total,
            path,
            size,
            image,
        } => {
            let mut line = format!(
                "{} {} {}",
                counter(*index, *total),
                file_name(path),
                format_size(*size)
            );
            if *image {
                line.push_str(" image");
            }
            vec![line]
        }
        ExtractEvent::Failed {
            index,
            total,
            path,
            reason,
        } => vec![format!(
            "{} {} failed: {}",
            counter(*index, *total),
            file_name(path),
            reason
        )],
    }
}

pub fn format_skipped(skipped: &[ExtractError]) -> Vec<String> {
    if skipped.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![format!("Skipped {}", plural(skipped.len(), "unreadable file"))];
    for err in skipped {
        lines.push(format!("{}{}", indent(1), err));
    }
    lines
}

pub fn print_skipped(skipped: &[ExtractError]) {
    for line in format_skipped(skipped) {
        println!("{}", line);
    }
}

// ============================================================================
// Plan
// ============================================================================

pub fn format_plan(planned: &[PlannedMessage]) -> Vec<String> {
    if planned.is_empty() {
        return vec!["Nothing to send".to_string()];
    }

    let mut lines = Vec::new();
    for (i, item) in planned.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), item.message.subject));
        for path in &item.message.attachments {
            lines.push(format!("{}{}", indent(1), file_name(path)));
        }
    }

    let files: usize = planned.iter().map(|p| p.file_count).sum();
    let bytes: u64 = planned.iter().map(|p| p.total_size).sum();
    lines.push(String::new());
    lines.push(format!(
        "{}, {}, {}",
        plural(planned.len(), "message"),
        plural(files, "file"),
        format_size(bytes)
    ));
    lines
}

pub fn print_plan(planned: &[PlannedMessage]) {
    for line in format_plan(planned) {
        println!("{}", line);
    }
}

/// Each message's JSON summary, separated by blank lines.
pub fn format_message_summaries(planned: &[PlannedMessage]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, item) in planned.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(format!("{} {}", format_index(i + 1), item.message.subject));
        lines.extend(item.message.summary().lines().map(String::from));
    }
    lines
}

pub fn print_message_summaries(planned: &[PlannedMessage]) {
    for line in format_message_summaries(planned) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_output(sent: &[(String, PathBuf)]) -> Vec<String> {
    let mut lines: Vec<String> = sent
        .iter()
        .enumerate()
        .map(|(i, (subject, path))| {
            format!("{} {} → {}", format_index(i + 1), subject, path.display())
        })
        .collect();
    lines.push(format!("Queued {}", plural(sent.len(), "message")));
    lines
}

pub fn print_build_output(sent: &[(String, PathBuf)]) {
    for line in format_build_output(sent) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageDescriptor;
    use crate::test_helpers::MIB;
    use std::io;

    fn planned(subject: &str, files: &[&str], total_size: u64) -> PlannedMessage {
        PlannedMessage {
            message: MessageDescriptor {
                subject: subject.to_string(),
                attachments: files.iter().map(|f| PathBuf::from("/photos").join(f)).collect(),
                ..Default::default()
            },
            file_count: files.len(),
            total_size,
        }
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn counter_aligns_to_total() {
        assert_eq!(counter(0, 12), "[ 1/12]");
        assert_eq!(counter(11, 12), "[12/12]");
        assert_eq!(counter(0, 1), "[1/1]");
    }

    #[test]
    fn plural_words() {
        assert_eq!(plural(1, "file"), "1 file");
        assert_eq!(plural(0, "file"), "0 files");
        assert_eq!(plural(3, "message"), "3 messages");
    }

    // =========================================================================
    // Extraction
    // =========================================================================

    #[test]
    fn extracted_event_line() {
        let event = ExtractEvent::Extracted {
            index: 0,
            total: 12,
            path: PathBuf::from("/photos/IMG_0001.JPG"),
            size: 4 * MIB,
            image: true,
        };
        assert_eq!(
            format_extract_event(&event),
            vec!["[ 1/12] IMG_0001.JPG 4.0MiB image"]
        );
    }

    #[test]
    fn failed_event_line() {
        let event = ExtractEvent::Failed {
            index: 2,
            total: 3,
            path: PathBuf::from("/photos/broken.jpg"),
            reason: "permission denied".to_string(),
        };
        assert_eq!(
            format_extract_event(&event),
            vec!["[3/3] broken.jpg failed: permission denied"]
        );
    }

    #[test]
    fn skipped_lists_each_error() {
        let skipped = vec![ExtractError::Io {
            path: PathBuf::from("/photos/gone.jpg"),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        }];
        assert_eq!(
            format_skipped(&skipped),
            vec![
                "Skipped 1 unreadable file".to_string(),
                "    cannot read /photos/gone.jpg: not found".to_string(),
            ]
        );
        assert!(format_skipped(&[]).is_empty());
    }

    // =========================================================================
    // Plan and build
    // =========================================================================

    #[test]
    fn plan_lists_messages_and_attachments() {
        let plan = vec![
            planned("T #1 (1-2/3) 7.0MiB", &["a.jpg", "b.jpg"], 7 * MIB),
            planned("T #2 (3-3/3) 5.0MiB", &["c.jpg"], 5 * MIB),
        ];
        assert_eq!(
            format_plan(&plan),
            vec![
                "001 T #1 (1-2/3) 7.0MiB",
                "    a.jpg",
                "    b.jpg",
                "002 T #2 (3-3/3) 5.0MiB",
                "    c.jpg",
                "",
                "2 messages, 3 files, 12.0MiB",
            ]
        );
    }

    #[test]
    fn empty_plan() {
        assert_eq!(format_plan(&[]), vec!["Nothing to send"]);
    }

    #[test]
    fn message_summaries_are_json() {
        let plan = vec![planned("S", &["a.jpg"], 1)];
        let lines = format_message_summaries(&plan);
        assert_eq!(lines[0], "001 S");
        let json: serde_json::Value = serde_json::from_str(&lines[1..].join("\n")).unwrap();
        assert_eq!(json["subject"], "S");
        assert_eq!(json["attachments"], serde_json::json!(["/photos/a.jpg"]));
    }

    #[test]
    fn build_output_shows_destinations() {
        let sent = vec![
            ("A".to_string(), PathBuf::from("out/001.json")),
            ("B".to_string(), PathBuf::from("out/002.json")),
        ];
        assert_eq!(
            format_build_output(&sent),
            vec![
                "001 A → out/001.json",
                "002 B → out/002.json",
                "Queued 2 messages",
            ]
        );
    }
}
