//! Sink that emits every sample immediately.

use std::io::Write;

use tracing::trace;

use super::{MetricsSink, SinkError, emit};
use crate::metrics::Sample;

/// Emits each sample as one JSON line as soon as it is written.
pub struct StreamingSink<W: Write + Send> {
    out: W,
    records: u64,
}

impl<W: Write + Send> StreamingSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, records: 0 }
    }

    /// Number of records emitted.
    pub fn records(&self) -> u64 {
        self.records
    }
}

impl<W: Write + Send> MetricsSink for StreamingSink<W> {
    fn write(&mut self, sample: &Sample) -> Result<(), SinkError> {
        emit(&mut self.out, sample)?;
        self.records += 1;
        trace!("streamed record #{}", self.records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::InstantSample;
    use crate::sink::mock::{BrokenPipe, SharedBuffer};

    fn sample(cpu: f64, mem: u64) -> Sample {
        Sample::Instant(InstantSample {
            cpu_usage: cpu,
            mem_usage_mb: mem,
        })
    }

    #[test]
    fn test_emits_every_write_in_order() {
        let buffer = SharedBuffer::new();
        let mut sink = StreamingSink::new(buffer.clone());

        sink.init().unwrap();
        for i in 0..5 {
            sink.write(&sample(i as f64, i)).unwrap();
            // Visible before the next write.
            assert_eq!(buffer.lines().len(), i as usize + 1);
        }

        let lines = buffer.lines();
        assert_eq!(lines.len(), 5);
        for (i, line) in lines.iter().enumerate() {
            let parsed: InstantSample = serde_json::from_str(line).unwrap();
            assert_eq!(parsed.mem_usage_mb, i as u64);
        }
        assert_eq!(buffer.flushes(), 5);
        assert_eq!(sink.records(), 5);
    }

    #[test]
    fn test_flush_emits_nothing() {
        let buffer = SharedBuffer::new();
        let mut sink = StreamingSink::new(buffer.clone());

        sink.write(&sample(1.0, 1)).unwrap();
        sink.flush().unwrap();
        sink.flush().unwrap();

        assert_eq!(buffer.lines().len(), 1);
    }

    #[test]
    fn test_flush_without_writes_is_safe() {
        let buffer = SharedBuffer::new();
        let mut sink = StreamingSink::new(buffer.clone());

        sink.flush().unwrap();
        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut sink = StreamingSink::new(BrokenPipe);
        assert!(matches!(
            sink.write(&sample(1.0, 1)),
            Err(SinkError::Io(_))
        ));
        assert_eq!(sink.records(), 0);
    }
}
