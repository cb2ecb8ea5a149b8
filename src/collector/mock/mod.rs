//! Mock implementations for testing.
//!
//! This module provides `MockFs` with pre-built `/proc` scenarios for testing
//! the `/proc` sampler, and `ScriptedSampler` for driving the metrics
//! collectors with exact CPU and memory readings.

mod filesystem;
mod sampler;
mod scenarios;

pub use filesystem::MockFs;
pub use sampler::ScriptedSampler;
