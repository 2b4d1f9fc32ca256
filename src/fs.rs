//! Filesystem access used by metadata extraction.
//!
//! Extraction never touches `std::fs` directly. It goes through
//! [`FileSource`], which keeps the extractor testable against in-memory
//! fixtures and lets a host application substitute its own storage.

use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Size and timestamps of one file.
///
/// Timestamps are seconds since the Unix epoch, with sub-second precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileStat {
    pub size: u64,
    pub created: f64,
    pub modified: f64,
}

/// Read access to file content and attributes.
pub trait FileSource: Sync {
    /// Read the whole file into memory.
    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Read size and timestamps.
    fn stat(&self, path: &Path) -> io::Result<FileStat>;
}

/// The local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSource for LocalFs {
    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = std::fs::metadata(path)?;
        let modified = unix_seconds(meta.modified()?);
        // Birth time is not recorded on every filesystem; fall back to mtime.
        let created = meta.created().map(unix_seconds).unwrap_or(modified);
        Ok(FileStat {
            size: meta.len(),
            created,
            modified,
        })
    }
}

fn unix_seconds(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(before) => -before.duration().as_secs_f64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn stat_reports_size_and_recent_times() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.bin");
        std::fs::write(&path, vec![0u8; 1500]).unwrap();

        let stat = LocalFs.stat(&path).unwrap();
        assert_eq!(stat.size, 1500);
        assert!(stat.modified > 1_000_000_000.0);
        assert!(stat.created > 1_000_000_000.0);
    }

    #[test]
    fn read_all_returns_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        std::fs::write(&path, "hello").unwrap();
        assert_eq!(LocalFs.read_all(&path).unwrap(), b"hello");
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = LocalFs.stat(Path::new("/nonexistent/file.jpg")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(LocalFs.read_all(Path::new("/nonexistent/file.jpg")).is_err());
    }

    #[test]
    fn pre_epoch_times_are_negative() {
        let t = UNIX_EPOCH - std::time::Duration::from_secs(10);
        assert_eq!(unix_seconds(t), -10.0);
    }
}
