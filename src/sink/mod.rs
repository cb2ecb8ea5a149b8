//! Metrics output strategies.
//!
//! A `MetricsSink` receives one [`Sample`] per tick and decides when to
//! emit it. Records are written as one JSON object per line.
//!
//! - [`StreamingSink`] emits every sample as soon as it arrives.
//! - [`LatestSink`] keeps only the newest sample and emits it on flush.

mod latest;
pub mod mock;
mod streaming;

pub use latest::LatestSink;
pub use streaming::StreamingSink;

use std::io::Write;

use crate::metrics::Sample;

/// Error type for output failures.
#[derive(Debug)]
pub enum SinkError {
    /// The transport rejected a write or flush.
    Io(std::io::Error),
    /// The sample could not be serialized.
    Serialize(serde_json::Error),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Io(e) => write!(f, "output error: {}", e),
            SinkError::Serialize(e) => write!(f, "serialization error: {}", e),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Io(e) => Some(e),
            SinkError::Serialize(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        SinkError::Io(e)
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            SinkError::Io(e.into())
        } else {
            SinkError::Serialize(e)
        }
    }
}

/// Strategy that receives samples from the polling loop.
pub trait MetricsSink: Send {
    /// Called once before the first tick.
    fn init(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Called once per tick.
    fn write(&mut self, sample: &Sample) -> Result<(), SinkError>;

    /// Called once at teardown, whether or not `write` was ever called.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes `sample` as a single JSON line and flushes the transport.
pub(crate) fn emit<W: Write>(out: &mut W, sample: &Sample) -> Result<(), SinkError> {
    serde_json::to_writer(&mut *out, sample)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::InstantSample;
    use crate::sink::mock::{BrokenPipe, SharedBuffer};

    #[test]
    fn test_emit_writes_one_flushed_line() {
        let buffer = SharedBuffer::new();
        let mut out = buffer.clone();
        let sample = Sample::Instant(InstantSample {
            cpu_usage: 1.5,
            mem_usage_mb: 3,
        });

        emit(&mut out, &sample).unwrap();

        assert_eq!(buffer.contents(), "{\"cpu_usage\":1.5,\"mem_usage_mb\":3}\n");
        assert_eq!(buffer.flushes(), 1);
    }

    #[test]
    fn test_emit_reports_transport_failure_as_io() {
        let err = emit(&mut BrokenPipe, &Sample::empty_instant()).unwrap_err();
        assert!(matches!(err, SinkError::Io(_)));
    }
}
