//! Abstractions over the operating system so collectors can be tested.
//!
//! The `FileSystem` trait lets the `/proc` sampler read either the real
//! filesystem on Linux or an in-memory mock. The `ProcessSampler` trait is
//! the boundary the metrics collectors talk to: anything that can list a
//! process's descendants and read its CPU and resident memory.

use std::io;
use std::path::{Path, PathBuf};

use crate::collector::procfs::SampleError;

/// Abstraction for filesystem operations.
///
/// This trait allows collectors to read from the real filesystem or from
/// a mock implementation for testing purposes.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Lists entries in a directory.
    ///
    /// # Returns
    /// A vector of paths to entries in the directory, or an I/O error.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Real filesystem implementation that delegates to `std::fs`.
///
/// Use this in production to read from the actual `/proc` filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        Ok(paths)
    }
}

/// A single process reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessReading {
    /// CPU utilisation since the previous reading of the same process, in
    /// percent of one core. Zero for the first reading.
    pub cpu_percent: f64,
    /// Resident set size in bytes.
    pub rss_bytes: u64,
}

/// Process inspection facility used by the metrics collectors.
pub trait ProcessSampler: Send {
    /// Returns `true` if the process currently exists.
    fn exists(&self, pid: u32) -> bool;

    /// Lists all transitive descendants of `pid`, not including `pid`.
    ///
    /// Fails with [`SampleError::ProcessGone`] if `pid` itself is gone.
    fn descendants(&mut self, pid: u32) -> Result<Vec<u32>, SampleError>;

    /// Reads CPU and resident memory of a single process.
    ///
    /// Fails with [`SampleError::ProcessGone`] if the process has exited.
    fn sample(&mut self, pid: u32) -> Result<ProcessReading, SampleError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_real_fs_read_to_string() {
        let fs = RealFs::new();
        let cargo_toml = env::current_dir().unwrap().join("Cargo.toml");
        let content = fs.read_to_string(&cargo_toml).unwrap();
        assert!(content.contains("[package]"));
    }

    #[test]
    fn test_real_fs_exists() {
        let fs = RealFs::new();
        let cargo_toml = env::current_dir().unwrap().join("Cargo.toml");
        assert!(fs.exists(&cargo_toml));
        assert!(!fs.exists(Path::new("/nonexistent/path/12345")));
    }

    #[test]
    fn test_real_fs_read_dir() {
        let fs = RealFs::new();
        let src_dir = env::current_dir().unwrap().join("src");
        let entries = fs.read_dir(&src_dir).unwrap();
        assert!(entries.iter().any(|p| p.ends_with("lib.rs")));
    }
}
