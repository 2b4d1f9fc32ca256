//! Size-bounded grouping of metadata records.
//!
//! [`partition`] is a single greedy pass over records in the caller's order.
//! A record joins the current group while the running total plus its size
//! stays strictly below the limit; otherwise the current group is closed and
//! a new one starts with that record. Nothing is reordered.
//!
//! The comparison is `<`, not `<=`: a group never reaches the limit exactly
//! unless it holds a single record whose size equals the limit. Such a record
//! is accepted (only `size > limit` is rejected) and closes the group before
//! it, which is empty when that record comes first.
//!
//! Empty input yields one empty group. Callers treat that as "no work".

use crate::metadata::FileMetadata;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    #[error("file \"{name}\", size {size}, exceed max_size {limit}")]
    CapacityExceeded { name: String, size: u64, limit: u64 },
}

/// An ordered batch of records with their summed size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group<'a> {
    members: Vec<&'a FileMetadata>,
    total_size: u64,
}

impl<'a> Group<'a> {
    fn push(&mut self, record: &'a FileMetadata) {
        self.total_size += record.size();
        self.members.push(record);
    }

    pub fn members(&self) -> &[&'a FileMetadata] {
        &self.members
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member paths, in order; these become the message attachments.
    pub fn paths(&self) -> impl Iterator<Item = &'a Path> + '_ {
        self.members.iter().map(|&m| m.path())
    }
}

/// Pack `records` into contiguous groups whose totals stay below `max_size`.
///
/// Fails on the first record larger than `max_size`; no groups are returned
/// in that case.
pub fn partition(records: &[FileMetadata], max_size: u64) -> Result<Vec<Group<'_>>, GroupError> {
    let mut groups = Vec::new();
    let mut current = Group::default();

    for record in records {
        let size = record.size();
        if size > max_size {
            return Err(GroupError::CapacityExceeded {
                name: record.name().to_string(),
                size,
                limit: max_size,
            });
        }
        // A group total never exceeds max_size, so this cannot underflow.
        if size >= max_size - current.total_size {
            groups.push(std::mem::take(&mut current));
        }
        current.push(record);
    }
    groups.push(current);
    Ok(groups)
}
