//! # mailbatch
//!
//! Turns a list of files, typically photos, into a sequence of mail-ready
//! messages. Each message carries a bounded total attachment size, an HTML
//! report with inline thumbnails, and a machine-readable text report.
//!
//! # Pipeline
//!
//! ```text
//! paths ─▶ extract ─▶ (sort) ─▶ partition ─▶ subjects ─▶ assemble ─▶ transport
//!          metadata    sort      group       subject     message     message
//! ```
//!
//! Extraction is the only expensive stage and runs on the rayon pool. Every
//! later stage is a pure function over the extracted records, so the grouping
//! and labelling logic is tested without touching the filesystem.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`fs`] | File access seam: whole-file reads and timestamps |
//! | [`sniff`] | Content type detection from leading bytes |
//! | [`imaging`] | Decode, EXIF tags, JPEG thumbnails |
//! | [`metadata`] | Per-file record: name, path, size, dates, hashes, image facts |
//! | [`sort`] | Dotted key paths into records and a stable sort on them |
//! | [`group`] | Greedy in-order partition under a size bound |
//! | [`subject`] | Subject templates with cumulative progress |
//! | [`report`] | HTML and JSON text reports, human-readable sizes and times |
//! | [`message`] | Message descriptors, addressing, the transport seam and a file outbox |
//! | [`pipeline`] | Parallel extraction and the plan from records to messages |
//! | [`config`] | `mailbatch.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Size Bound
//!
//! A group's total stays strictly below `max_size`, with one exception: a
//! single file exactly as large as the bound travels alone. A file larger
//! than the bound fails the whole batch, before anything is sent.

pub mod config;
pub mod fs;
pub mod group;
pub mod imaging;
pub mod message;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod sniff;
pub mod sort;
pub mod subject;

#[cfg(test)]
pub(crate) mod test_helpers;
