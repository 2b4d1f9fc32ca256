//! Ordering of metadata records by a dotted key path.
//!
//! A [`KeyPath`] such as `image.date` or `file.size` is a parsed sequence of
//! field names. It is interpreted against a tagged-union view of a record
//! ([`Node`]): each segment descends into a [`Branch`] until a [`Leaf`]
//! value is reached.
//!
//! ## Missing fields
//!
//! A record that lacks the path (an optional field is absent, the name is
//! unknown, or the path stops at a branch or runs past a leaf) has no key.
//! Records without a key sort before records with one; two keyless records
//! compare equal. Nothing here raises an error for a missing field.
//!
//! ## Stability
//!
//! Sorting is stable in both directions: records with equal keys keep their
//! input order. `descending` reverses the comparison, so keyless records end
//! up last.

use crate::metadata::{FileDates, FileInfo, FileMetadata, Hashes, ImageInfo};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid sort key {0:?}: segments must be non-empty and separated by '.'")]
pub struct KeyPathError(pub String);

/// A parsed dotted field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromStr for KeyPath {
    type Err = KeyPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<String> = s.trim().split('.').map(str::to_string).collect();
        if segments.iter().any(|seg| seg.is_empty()) {
            return Err(KeyPathError(s.to_string()));
        }
        Ok(Self(segments))
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// A comparable value at the end of a key path.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf<'a> {
    Integer(u64),
    Float(f64),
    Text(Cow<'a, str>),
    /// Component-wise pair, e.g. pixel `(width, height)`.
    Pair(u32, u32),
}

impl Leaf<'_> {
    fn rank(&self) -> u8 {
        match self {
            Leaf::Integer(_) => 0,
            Leaf::Float(_) => 1,
            Leaf::Text(_) => 2,
            Leaf::Pair(..) => 3,
        }
    }
}

impl Eq for Leaf<'_> {}

impl PartialOrd for Leaf<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Leaf<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Leaf::Integer(a), Leaf::Integer(b)) => a.cmp(b),
            (Leaf::Float(a), Leaf::Float(b)) => a.total_cmp(b),
            (Leaf::Text(a), Leaf::Text(b)) => a.cmp(b),
            (Leaf::Pair(a0, a1), Leaf::Pair(b0, b1)) => (a0, a1).cmp(&(b0, b1)),
            // A given path always yields the same variant; keep the order total anyway.
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// A structured container in the record view.
#[derive(Debug, Clone, Copy)]
pub enum Branch<'a> {
    Record(&'a FileMetadata),
    File(&'a FileInfo),
    Dates(&'a FileDates),
    Hashes(&'a Hashes),
    Image(&'a ImageInfo),
}

/// One position in the record view.
#[derive(Debug, Clone)]
pub enum Node<'a> {
    Branch(Branch<'a>),
    Leaf(Leaf<'a>),
}

fn text(s: &str) -> Node<'_> {
    Node::Leaf(Leaf::Text(Cow::Borrowed(s)))
}

impl<'a> Branch<'a> {
    /// The child named `segment`, or `None` when this branch has no such field.
    pub fn child(self, segment: &str) -> Option<Node<'a>> {
        match self {
            Branch::Record(r) => match segment {
                "file" => Some(Node::Branch(Branch::File(&r.file))),
                "type_description" => r.type_description.as_deref().map(text),
                "image" => r.image.as_ref().map(|i| Node::Branch(Branch::Image(i))),
                _ => None,
            },
            Branch::File(f) => match segment {
                "name" => Some(text(&f.name)),
                "path" => Some(Node::Leaf(Leaf::Text(f.path.to_string_lossy()))),
                "size" => Some(Node::Leaf(Leaf::Integer(f.size))),
                "date" => Some(Node::Branch(Branch::Dates(&f.date))),
                "hash" => Some(Node::Branch(Branch::Hashes(&f.hash))),
                _ => None,
            },
            Branch::Dates(d) => match segment {
                "created" => Some(Node::Leaf(Leaf::Float(d.created))),
                "modified" => Some(Node::Leaf(Leaf::Float(d.modified))),
                _ => None,
            },
            Branch::Hashes(h) => match segment {
                "md5" => Some(text(&h.md5)),
                "sha256" => Some(text(&h.sha256)),
                _ => None,
            },
            Branch::Image(i) => match segment {
                "format" => Some(text(&i.format)),
                "size" => Some(Node::Leaf(Leaf::Pair(i.size.0, i.size.1))),
                "mode" => Some(text(&i.mode)),
                "date" => i.date.as_deref().map(text),
                "device" => i.device.as_deref().map(text),
                _ => None,
            },
        }
    }
}

/// Resolve `key` against `record`. `None` when the record lacks the path.
pub fn lookup<'a>(record: &'a FileMetadata, key: &KeyPath) -> Option<Leaf<'a>> {
    let mut node = Node::Branch(Branch::Record(record));
    for segment in key.segments() {
        node = match node {
            Node::Branch(branch) => branch.child(segment)?,
            Node::Leaf(_) => return None,
        };
    }
    match node {
        Node::Leaf(leaf) => Some(leaf),
        Node::Branch(_) => None,
    }
}

/// Three-way comparison of two records under `key`; keyless records rank first.
pub fn compare(a: &FileMetadata, b: &FileMetadata, key: &KeyPath) -> Ordering {
    match (lookup(a, key), lookup(b, key)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y),
    }
}

/// Stable sort of `records` by `key`.
pub fn sort_records(
    mut records: Vec<FileMetadata>,
    key: &KeyPath,
    descending: bool,
) -> Vec<FileMetadata> {
    records.sort_by(|a, b| {
        let ord = compare(a, b, key);
        if descending { ord.reverse() } else { ord }
    });
    records
}
