//! Mock transports for testing sinks.
//!
//! `SharedBuffer` captures emitted records in memory, `BrokenPipe` rejects
//! every write so transport failures can be exercised.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct BufferInner {
    bytes: Vec<u8>,
    flushes: usize,
}

/// Growable byte buffer shared between clones.
///
/// Hand one clone to a sink and read the emitted records from another.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<BufferInner>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, BufferInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner().bytes).into_owned()
    }

    /// Written text split into non-empty lines.
    pub fn lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Number of `flush` calls received.
    pub fn flushes(&self) -> usize {
        self.inner().flushes
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner().bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner().flushes += 1;
        Ok(())
    }
}

/// Transport that rejects every write.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"))
    }
}
