//! Process inspection for Linux.
//!
//! This module is the boundary between the agent and the operating system:
//! it discovers a process tree and reads per-process CPU and resident memory
//! from the `/proc` filesystem, with support for mocking for testing on macOS.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │        ProcessSampler (trait)            │
//! │  ┌───────────────────┐ ┌──────────────┐  │
//! │  │   ProcSampler     │ │  Scripted    │  │
//! │  │  - /proc/[pid]/*  │ │  Sampler     │  │
//! │  └─────────┬─────────┘ │  (Testing)   │  │
//! │            │           └──────────────┘  │
//! │     ┌──────▼──────┐                      │
//! │     │  FileSystem │ (trait)              │
//! │     └──────┬──────┘                      │
//! └────────────┼─────────────────────────────┘
//!       ┌──────┴──────┐
//!  ┌────▼────┐   ┌────▼────┐
//!  │ RealFs  │   │ MockFs  │
//!  │ (Linux) │   │(Testing)│
//!  └─────────┘   └─────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use procwatch::collector::{MockFs, ProcSampler, ProcessSampler};
//!
//! let fs = MockFs::process_tree();
//! let mut sampler = ProcSampler::new(fs, "/proc");
//! let children = sampler.descendants(100).unwrap();
//! assert_eq!(children.len(), 3);
//! ```

pub mod mock;
pub mod procfs;
pub mod traits;

pub use mock::{MockFs, ScriptedSampler};
pub use procfs::{ProcSampler, SampleError};
pub use traits::{FileSystem, ProcessReading, ProcessSampler, RealFs};
