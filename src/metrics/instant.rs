//! Collector reporting the current usage of a process tree.

use tracing::trace;

use super::{CollectError, InstantSample, MetricsCollector, Sample, tree_usage};
use crate::collector::ProcessSampler;

/// Reports CPU and memory of the most recent tick.
pub struct InstantCollector<S: ProcessSampler> {
    sampler: S,
    pid: u32,
}

impl<S: ProcessSampler> InstantCollector<S> {
    /// Creates a collector for `pid` and its descendants.
    pub fn new(sampler: S, pid: u32) -> Self {
        Self { sampler, pid }
    }
}

impl<S: ProcessSampler> MetricsCollector for InstantCollector<S> {
    fn collect(&mut self) -> Result<Sample, CollectError> {
        let usage = tree_usage(&mut self.sampler, self.pid)?;
        trace!(
            "pid {}: {} processes, cpu={:.1}%, mem={}MB",
            self.pid, usage.processes, usage.cpu_percent, usage.mem_mb
        );

        Ok(Sample::Instant(InstantSample {
            cpu_usage: usage.cpu_percent,
            mem_usage_mb: usage.mem_mb,
        }))
    }
}
