//! Sampler for the Linux `/proc` filesystem.
//!
//! This module provides parsers and a process sampler for reading per-process
//! CPU and memory information from the `/proc` virtual filesystem.

pub mod parser;
pub mod process;

pub use process::{ProcSampler, SampleError, cpu_percent};
