//! Collector and sink pairings offered by the agent.

use crate::collector::ProcessSampler;
use crate::metrics::{AggregateCollector, InstantCollector, MetricsCollector, Sample};
use crate::sink::{LatestSink, MetricsSink, StreamingSink};

/// Monitoring behaviour of an agent, selecting its collector and sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// Streams the current usage on every tick.
    Stream,
    /// Reports average CPU and peak memory once, at shutdown.
    Log,
}

impl AgentKind {
    /// Builds the collector for this kind.
    pub fn make_collector<S>(self, sampler: S, pid: u32) -> Box<dyn MetricsCollector>
    where
        S: ProcessSampler + 'static,
    {
        match self {
            AgentKind::Stream => Box::new(InstantCollector::new(sampler, pid)),
            AgentKind::Log => Box::new(AggregateCollector::new(sampler, pid)),
        }
    }

    /// Builds the sink for this kind.
    pub fn make_sink<W>(self, out: W) -> Box<dyn MetricsSink>
    where
        W: std::io::Write + Send + 'static,
    {
        match self {
            AgentKind::Stream => Box::new(StreamingSink::new(out)),
            AgentKind::Log => Box::new(LatestSink::with_empty(out, Sample::empty_aggregate())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AgentKind::Stream => "stream",
            AgentKind::Log => "log",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ScriptedSampler;
    use crate::sink::mock::SharedBuffer;

    const MB: u64 = 1 << 20;

    fn sampler() -> ScriptedSampler {
        ScriptedSampler::new()
            .with_process(100, 1, 10.0, 100 * MB)
            .with_process(101, 100, 5.0, 40 * MB)
    }

    #[test]
    fn test_stream_pairs_instant_with_streaming() {
        let buffer = SharedBuffer::new();
        let mut collector = AgentKind::Stream.make_collector(sampler(), 100);
        let mut sink = AgentKind::Stream.make_sink(buffer.clone());

        let sample = collector.collect().unwrap();
        assert!(matches!(sample, Sample::Instant(_)));

        sink.write(&sample).unwrap();
        assert_eq!(buffer.lines().len(), 1);
    }

    #[test]
    fn test_log_pairs_aggregate_with_latest() {
        let buffer = SharedBuffer::new();
        let mut collector = AgentKind::Log.make_collector(sampler(), 100);
        let mut sink = AgentKind::Log.make_sink(buffer.clone());

        let sample = collector.collect().unwrap();
        assert!(matches!(sample, Sample::Aggregate(_)));

        sink.write(&sample).unwrap();
        assert!(buffer.lines().is_empty());
        sink.flush().unwrap();
        assert_eq!(
            buffer.lines(),
            vec![r#"{"max_men_usage_mb":140,"avg_cpu_usage":0.0}"#]
        );
    }

    #[test]
    fn test_display_names() {
        assert_eq!(AgentKind::Stream.to_string(), "stream");
        assert_eq!(AgentKind::Log.to_string(), "log");
    }
}
