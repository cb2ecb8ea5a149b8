//! Sink that reports only the final sample.

use std::io::Write;

use tracing::debug;

use super::{MetricsSink, SinkError, emit};
use crate::metrics::Sample;

/// Holds the most recent sample and emits it once, on flush.
///
/// Earlier samples are discarded. Flushing without any prior write emits
/// the configured empty sample, all fields zero.
pub struct LatestSink<W: Write + Send> {
    out: W,
    latest: Option<Sample>,
    empty: Sample,
    flushed: bool,
}

impl<W: Write + Send> LatestSink<W> {
    /// Creates a sink whose empty record is an all-zero aggregate sample.
    pub fn new(out: W) -> Self {
        Self::with_empty(out, Sample::empty_aggregate())
    }

    /// Creates a sink that emits `empty` when flushed with nothing written.
    pub fn with_empty(out: W, empty: Sample) -> Self {
        Self {
            out,
            latest: None,
            empty,
            flushed: false,
        }
    }

    /// The sample that would be emitted on flush.
    pub fn latest(&self) -> &Sample {
        self.latest.as_ref().unwrap_or(&self.empty)
    }
}

impl<W: Write + Send> MetricsSink for LatestSink<W> {
    fn write(&mut self, sample: &Sample) -> Result<(), SinkError> {
        self.latest = Some(*sample);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        if self.flushed {
            return Ok(());
        }
        self.flushed = true;

        if self.latest.is_none() {
            debug!("flushing with no samples, emitting empty record");
        }
        let record = *self.latest();
        emit(&mut self.out, &record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{AggregateSample, InstantSample};
    use crate::sink::mock::{BrokenPipe, SharedBuffer};

    fn aggregate(mem: u64, cpu: f64) -> Sample {
        Sample::Aggregate(AggregateSample {
            max_men_usage_mb: mem,
            avg_cpu_usage: cpu,
        })
    }

    #[test]
    fn test_emits_only_last_write_on_flush() {
        let buffer = SharedBuffer::new();
        let mut sink = LatestSink::new(buffer.clone());

        sink.init().unwrap();
        for k in 1..=4 {
            sink.write(&aggregate(k * 10, k as f64)).unwrap();
        }
        assert!(buffer.contents().is_empty());

        sink.flush().unwrap();

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        let parsed: AggregateSample = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(
            parsed,
            AggregateSample {
                max_men_usage_mb: 40,
                avg_cpu_usage: 4.0,
            }
        );
    }

    #[test]
    fn test_flush_without_writes_emits_zero_record() {
        let buffer = SharedBuffer::new();
        let mut sink = LatestSink::new(buffer.clone());

        sink.flush().unwrap();

        assert_eq!(
            buffer.lines(),
            vec![r#"{"max_men_usage_mb":0,"avg_cpu_usage":0.0}"#]
        );
    }

    #[test]
    fn test_empty_record_follows_configuration() {
        let buffer = SharedBuffer::new();
        let mut sink = LatestSink::with_empty(buffer.clone(), Sample::empty_instant());

        sink.flush().unwrap();

        let parsed: InstantSample = serde_json::from_str(&buffer.lines()[0]).unwrap();
        assert_eq!(parsed, InstantSample::default());
    }

    #[test]
    fn test_second_flush_emits_nothing() {
        let buffer = SharedBuffer::new();
        let mut sink = LatestSink::new(buffer.clone());

        sink.write(&aggregate(1, 1.0)).unwrap();
        sink.flush().unwrap();
        sink.flush().unwrap();

        assert_eq!(buffer.lines().len(), 1);
    }

    #[test]
    fn test_writes_never_touch_transport() {
        let mut sink = LatestSink::new(BrokenPipe);
        sink.write(&aggregate(1, 1.0)).unwrap();
        assert!(matches!(sink.flush(), Err(SinkError::Io(_))));
    }
}
