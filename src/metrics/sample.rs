//! Samples emitted by the metrics collectors.
//!
//! Field names and their order are the wire format read by downstream
//! consumers, including the `max_men_usage_mb` spelling.

use serde::{Deserialize, Serialize};

/// Readings of the most recent tick, summed over the process tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InstantSample {
    pub cpu_usage: f64,
    pub mem_usage_mb: u64,
}

/// Running statistics since the collector was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateSample {
    pub max_men_usage_mb: u64,
    pub avg_cpu_usage: f64,
}

/// One record produced per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Sample {
    Instant(InstantSample),
    Aggregate(AggregateSample),
}

impl Sample {
    /// An all-zero instant sample.
    pub fn empty_instant() -> Self {
        Sample::Instant(InstantSample::default())
    }

    /// An all-zero aggregate sample.
    pub fn empty_aggregate() -> Self {
        Sample::Aggregate(AggregateSample::default())
    }
}

impl From<InstantSample> for Sample {
    fn from(sample: InstantSample) -> Self {
        Sample::Instant(sample)
    }
}

impl From<AggregateSample> for Sample {
    fn from(sample: AggregateSample) -> Self {
        Sample::Aggregate(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instant_sample_json_field_order() {
        let sample = Sample::Instant(InstantSample {
            cpu_usage: 20.0,
            mem_usage_mb: 160,
        });
        assert_eq!(
            serde_json::to_string(&sample).unwrap(),
            r#"{"cpu_usage":20.0,"mem_usage_mb":160}"#
        );
    }

    #[test]
    fn test_aggregate_sample_json_keeps_legacy_field_name() {
        let sample = Sample::Aggregate(AggregateSample {
            max_men_usage_mb: 512,
            avg_cpu_usage: 1.5,
        });
        assert_eq!(
            serde_json::to_string(&sample).unwrap(),
            r#"{"max_men_usage_mb":512,"avg_cpu_usage":1.5}"#
        );
    }

    #[test]
    fn test_empty_samples_are_zero() {
        assert_eq!(
            serde_json::to_string(&Sample::empty_aggregate()).unwrap(),
            r#"{"max_men_usage_mb":0,"avg_cpu_usage":0.0}"#
        );
        assert_eq!(
            serde_json::to_string(&Sample::empty_instant()).unwrap(),
            r#"{"cpu_usage":0.0,"mem_usage_mb":0}"#
        );
    }
}
