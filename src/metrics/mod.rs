//! Metrics collection strategies.
//!
//! A `MetricsCollector` turns the readings of a process tree into one
//! [`Sample`] per tick. Two strategies are provided:
//!
//! - [`InstantCollector`] reports the current CPU and memory sums.
//! - [`AggregateCollector`] reports running average CPU and peak memory.

mod aggregate;
mod instant;
mod sample;

pub use aggregate::{AggregateCollector, AggregationState, Averaging};
pub use instant::InstantCollector;
pub use sample::{AggregateSample, InstantSample, Sample};

use tracing::{debug, warn};

use crate::collector::{ProcessSampler, SampleError};

/// Error type for collection failures that end the polling loop.
#[derive(Debug)]
pub enum CollectError {
    /// The monitored process itself no longer exists.
    TargetGone(u32),
    /// Sampling the monitored process failed for another reason.
    Sample(SampleError),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::TargetGone(pid) => write!(f, "target process {} is gone", pid),
            CollectError::Sample(e) => write!(f, "sampling failed: {}", e),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Sample(e) => Some(e),
            CollectError::TargetGone(_) => None,
        }
    }
}

impl From<SampleError> for CollectError {
    fn from(e: SampleError) -> Self {
        match e {
            SampleError::ProcessGone(pid) => CollectError::TargetGone(pid),
            other => CollectError::Sample(other),
        }
    }
}

/// Strategy that produces one sample per tick.
pub trait MetricsCollector: Send {
    /// Samples the process tree once.
    fn collect(&mut self) -> Result<Sample, CollectError>;
}

/// CPU and memory summed over a process tree.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TreeUsage {
    /// Sum of CPU percentages.
    pub cpu_percent: f64,
    /// Sum of resident memory, each process floored to whole MB.
    pub mem_mb: u64,
    /// Number of processes that contributed.
    pub processes: usize,
}

/// Bytes to whole megabytes, rounding down.
pub fn bytes_to_mb(bytes: u64) -> u64 {
    bytes >> 20
}

/// Samples `pid` and all its descendants and sums their usage.
///
/// Descendants that fail to sample are left out of the sums. A failure on
/// `pid` itself is returned to the caller.
pub fn tree_usage<S: ProcessSampler + ?Sized>(
    sampler: &mut S,
    pid: u32,
) -> Result<TreeUsage, CollectError> {
    let children = sampler.descendants(pid)?;
    let root = sampler.sample(pid)?;

    let mut usage = TreeUsage {
        cpu_percent: root.cpu_percent,
        mem_mb: bytes_to_mb(root.rss_bytes),
        processes: 1,
    };

    for child in children {
        match sampler.sample(child) {
            Ok(reading) => {
                usage.cpu_percent += reading.cpu_percent;
                usage.mem_mb += bytes_to_mb(reading.rss_bytes);
                usage.processes += 1;
            }
            Err(SampleError::ProcessGone(gone)) => {
                debug!("process {} exited before it was sampled", gone);
            }
            Err(e) => {
                warn!("skipping process {}: {}", child, e);
            }
        }
    }

    Ok(usage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{MockFs, ProcSampler, ScriptedSampler};

    const MB: u64 = 1 << 20;

    #[test]
    fn test_tree_usage_sums_target_and_children() {
        let mut sampler = ScriptedSampler::new()
            .with_process(100, 1, 10.0, 100 * MB)
            .with_process(101, 100, 5.0, 40 * MB)
            .with_process(102, 100, 5.0, 20 * MB);

        let usage = tree_usage(&mut sampler, 100).unwrap();
        assert_eq!(usage.cpu_percent, 20.0);
        assert_eq!(usage.mem_mb, 160);
        assert_eq!(usage.processes, 3);
    }

    #[test]
    fn test_tree_usage_floors_each_process() {
        let mut sampler = ScriptedSampler::new()
            .with_process(100, 1, 0.0, MB + MB / 2)
            .with_process(101, 100, 0.0, MB - 1);

        let usage = tree_usage(&mut sampler, 100).unwrap();
        assert_eq!(usage.mem_mb, 1);
    }

    #[test]
    fn test_tree_usage_skips_vanished_child() {
        let mut sampler = ScriptedSampler::new()
            .with_process(100, 1, 10.0, 100 * MB)
            .with_process(102, 100, 5.0, 20 * MB);
        sampler.add_ghost(101, 100);

        let usage = tree_usage(&mut sampler, 100).unwrap();
        assert_eq!(usage.cpu_percent, 15.0);
        assert_eq!(usage.mem_mb, 120);
        assert_eq!(usage.processes, 2);
    }

    #[test]
    fn test_tree_usage_target_gone() {
        let mut sampler = ScriptedSampler::new().with_process(101, 100, 5.0, MB);

        assert!(matches!(
            tree_usage(&mut sampler, 100),
            Err(CollectError::TargetGone(100))
        ));
    }

    #[test]
    fn test_tree_usage_over_proc() {
        let fs = MockFs::process_tree();
        let mut sampler = ProcSampler::new(fs, "/proc");

        let usage = tree_usage(&mut sampler, 100).unwrap();
        // server 100 + workers 40 + 20 + helper 8
        assert_eq!(usage.mem_mb, 168);
        assert_eq!(usage.processes, 4);
        assert_eq!(usage.cpu_percent, 0.0);
    }

    #[test]
    fn test_bytes_to_mb() {
        assert_eq!(bytes_to_mb(0), 0);
        assert_eq!(bytes_to_mb(MB - 1), 0);
        assert_eq!(bytes_to_mb(MB), 1);
        assert_eq!(bytes_to_mb(3 * MB + 7), 3);
    }
}
