//! Collector reporting running statistics of a process tree.

use tracing::trace;

use super::{AggregateSample, CollectError, MetricsCollector, Sample, tree_usage};
use crate::collector::ProcessSampler;

/// Value fed into the running CPU average on each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Averaging {
    /// Feeds the previous average back into itself, so the reported
    /// average never moves from its initial zero. Matches the output
    /// existing consumers were built against.
    #[default]
    Compat,
    /// Feeds the freshly sampled CPU value, giving the arithmetic mean
    /// of all readings.
    Observed,
}

/// Statistics accumulated by [`AggregateCollector`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregationState {
    pub sample_count: u64,
    pub running_avg_cpu: f64,
    pub running_max_mem: u64,
}

impl AggregationState {
    /// Folds one tick's readings into the running statistics.
    pub fn record(&mut self, cpu: f64, mem_mb: u64, averaging: Averaging) {
        self.sample_count += 1;
        let increment = match averaging {
            Averaging::Compat => self.running_avg_cpu,
            Averaging::Observed => cpu,
        };
        self.running_avg_cpu = expanding_avg(self.running_avg_cpu, self.sample_count, increment);
        self.running_max_mem = self.running_max_mem.max(mem_mb);
    }
}

/// Expanding mean: `(avg * (n - 1) + value) / n`.
fn expanding_avg(avg: f64, n: u64, value: f64) -> f64 {
    let n = n as f64;
    (avg * (n - 1.0) + value) / n
}

/// Reports running average CPU and peak memory since creation.
pub struct AggregateCollector<S: ProcessSampler> {
    sampler: S,
    pid: u32,
    state: AggregationState,
    averaging: Averaging,
}

impl<S: ProcessSampler> AggregateCollector<S> {
    /// Creates a collector for `pid` and its descendants.
    pub fn new(sampler: S, pid: u32) -> Self {
        Self {
            sampler,
            pid,
            state: AggregationState::default(),
            averaging: Averaging::default(),
        }
    }

    /// Selects the value fed into the CPU average.
    pub fn with_averaging(mut self, averaging: Averaging) -> Self {
        self.averaging = averaging;
        self
    }

    /// Returns the statistics accumulated so far.
    pub fn state(&self) -> &AggregationState {
        &self.state
    }
}

impl<S: ProcessSampler> MetricsCollector for AggregateCollector<S> {
    fn collect(&mut self) -> Result<Sample, CollectError> {
        let usage = tree_usage(&mut self.sampler, self.pid)?;
        self.state.record(usage.cpu_percent, usage.mem_mb, self.averaging);
        trace!(
            "pid {}: tick {}, cpu={:.1}%, mem={}MB",
            self.pid, self.state.sample_count, usage.cpu_percent, usage.mem_mb
        );

        Ok(Sample::Aggregate(AggregateSample {
            max_men_usage_mb: self.state.running_max_mem,
            avg_cpu_usage: self.state.running_avg_cpu,
        }))
    }
}
