//! End-to-end flow from file paths to message descriptors.
//!
//! ```text
//! paths ──extract_all──▶ records ──plan──▶ sort ▶ partition ▶ subjects ▶ assemble
//! ```
//!
//! Extraction runs on the rayon pool; results are collected by input
//! position so sorting and grouping always see the caller's order. What
//! happens to a file that cannot be read is the caller's [`ErrorPolicy`].
//! Progress is reported through an optional channel as files finish, which
//! may be out of order.

use crate::group::{GroupError, partition};
use crate::message::{Addressing, MessageDescriptor, assemble};
use crate::metadata::{ExtractError, Extractor, FileMetadata};
use crate::sort::{KeyPath, sort_records};
use crate::subject::{DEFAULT_TITLE, SubjectTemplate, subjects};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

/// 45 MiB, comfortably below common 50 MB attachment limits after encoding.
pub const DEFAULT_MAX_SIZE: u64 = 45 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Group(#[from] GroupError),
}

/// What to do with a file that fails extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Fail the batch with the first failure in input order.
    #[default]
    Abort,
    /// Leave the file out and carry on.
    Skip,
}

/// Per-file progress, sent as each extraction finishes.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractEvent {
    Extracted {
        /// Input position, 0-based.
        index: usize,
        total: usize,
        path: PathBuf,
        size: u64,
        image: bool,
    },
    Failed {
        index: usize,
        total: usize,
        path: PathBuf,
        reason: String,
    },
}

/// Extraction results in input order.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<FileMetadata>,
    /// Failures left out under [`ErrorPolicy::Skip`].
    pub skipped: Vec<ExtractError>,
}

/// Extract every path in parallel.
pub fn extract_all(
    paths: &[PathBuf],
    extractor: &Extractor,
    thumbnail_bound: u32,
    policy: ErrorPolicy,
    events: Option<Sender<ExtractEvent>>,
) -> Result<Extraction, PipelineError> {
    let total = paths.len();
    info!(files = total, "extracting metadata");

    let results: Vec<Result<FileMetadata, ExtractError>> = paths
        .par_iter()
        .enumerate()
        .map_with(events, |events, (index, path)| {
            let result = extractor.extract(path, thumbnail_bound);
            if let Some(tx) = events {
                let event = match &result {
                    Ok(meta) => ExtractEvent::Extracted {
                        index,
                        total,
                        path: meta.path().to_path_buf(),
                        size: meta.size(),
                        image: meta.image.is_some(),
                    },
                    Err(e) => ExtractEvent::Failed {
                        index,
                        total,
                        path: path.clone(),
                        reason: e.to_string(),
                    },
                };
                // A dropped receiver only means nobody is watching.
                let _ = tx.send(event);
            }
            result
        })
        .collect();

    let mut extraction = Extraction::default();
    for result in results {
        match result {
            Ok(meta) => extraction.records.push(meta),
            Err(e) if policy == ErrorPolicy::Skip => {
                warn!("skipping: {e}");
                extraction.skipped.push(e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(extraction)
}

/// How records become messages.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub max_size: u64,
    /// `None` keeps input order.
    pub order_by: Option<KeyPath>,
    pub reverse: bool,
    pub title: String,
    pub template: SubjectTemplate,
    /// Copied into every descriptor.
    pub addressing: Addressing,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            order_by: None,
            reverse: false,
            title: DEFAULT_TITLE.to_string(),
            template: SubjectTemplate::default(),
            addressing: Addressing::default(),
        }
    }
}

/// One message of a plan plus the numbers the CLI shows for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedMessage {
    pub message: MessageDescriptor,
    pub file_count: usize,
    pub total_size: u64,
}

/// Sort, partition, title and assemble. Empty groups produce no message.
pub fn plan(
    records: Vec<FileMetadata>,
    options: &PlanOptions,
) -> Result<Vec<PlannedMessage>, PipelineError> {
    let records = match &options.order_by {
        Some(key) => sort_records(records, key, options.reverse),
        None => records,
    };

    let mut groups = partition(&records, options.max_size)?;
    let before = groups.len();
    groups.retain(|g| !g.is_empty());
    if groups.len() < before {
        debug!(dropped = before - groups.len(), "dropped empty groups");
    }

    let subjects = subjects(&groups, &options.title, &options.template);
    let planned: Vec<PlannedMessage> = groups
        .iter()
        .zip(subjects)
        .map(|(group, subject)| PlannedMessage {
            message: assemble(group, &subject).with_addressing(options.addressing.clone()),
            file_count: group.len(),
            total_size: group.total_size(),
        })
        .collect();
    info!(messages = planned.len(), files = records.len(), "planned batch");
    Ok(planned)
}
