//! procwatch - process tree resource monitoring agent.
//!
//! Provides:
//! - `collector` — process tree discovery and per-process sampling from `/proc`
//! - `metrics` — collection strategies (instant, aggregate) producing samples
//! - `sink` — output strategies (streaming, latest) writing JSON records
//! - `agent` — the polling loop and its start/stop/wait lifecycle
//!
//! # Example
//!
//! ```
//! use procwatch::agent::{AgentConfig, AgentKind, MonitorAgent};
//! use procwatch::collector::ScriptedSampler;
//! use procwatch::sink::mock::SharedBuffer;
//!
//! let sampler = ScriptedSampler::new().with_process(42, 1, 12.5, 64 << 20);
//! let out = SharedBuffer::new();
//! let config = AgentConfig::new(Some(42), 0.05).unwrap();
//!
//! let mut agent = MonitorAgent::with_kind(AgentKind::Stream, config, sampler, out.clone()).unwrap();
//! agent.start().unwrap();
//! agent.stop();
//! agent.wait().unwrap();
//!
//! for line in out.lines() {
//!     assert_eq!(line, r#"{"cpu_usage":12.5,"mem_usage_mb":64}"#);
//! }
//! ```

pub mod agent;
pub mod collector;
pub mod metrics;
pub mod sink;
