//! Process sampler for gathering per-process CPU and memory from `/proc/[pid]/`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::collector::procfs::parser::{ProcStat, parse_proc_stat, parse_proc_status};
use crate::collector::traits::{FileSystem, ProcessReading, ProcessSampler};

/// Clock ticks per second (USER_HZ). Standard value for Linux.
const CLK_TCK: u64 = 100;

/// Error type for sampling failures.
#[derive(Debug)]
pub enum SampleError {
    /// Process does not exist (anymore).
    ProcessGone(u32),
    /// I/O error reading process files.
    Io(std::io::Error),
    /// Parse error in process files.
    Parse(String),
}

impl std::fmt::Display for SampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleError::ProcessGone(pid) => write!(f, "process {} disappeared", pid),
            SampleError::Io(e) => write!(f, "I/O error: {}", e),
            SampleError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for SampleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SampleError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SampleError {
    fn from(e: std::io::Error) -> Self {
        SampleError::Io(e)
    }
}

/// Previous CPU reading of a process, used to compute utilisation deltas.
#[derive(Debug, Clone, Copy)]
struct CpuBaseline {
    ticks: u64,
    /// Process start time; a change means the pid was reused.
    starttime: u64,
    at: Instant,
}

/// Computes CPU utilisation in percent of one core from two tick readings.
///
/// Formula: (Δticks / CLK_TCK) / Δwall * 100
///
/// Returns 0 for an empty interval or a tick counter that went backwards.
pub fn cpu_percent(prev_ticks: u64, cur_ticks: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    let delta = cur_ticks.saturating_sub(prev_ticks);
    (delta as f64 / CLK_TCK as f64) / secs * 100.0
}

/// Samples processes by reading the `/proc` filesystem.
pub struct ProcSampler<F: FileSystem> {
    fs: F,
    proc_path: String,
    baselines: HashMap<u32, CpuBaseline>,
}

impl<F: FileSystem> ProcSampler<F> {
    /// Creates a new sampler.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            baselines: HashMap::new(),
        }
    }

    fn read_stat(&self, pid: u32) -> Result<ProcStat, SampleError> {
        let stat_path = format!("{}/{}/stat", self.proc_path, pid);
        let content = self
            .fs
            .read_to_string(Path::new(&stat_path))
            .map_err(|_| SampleError::ProcessGone(pid))?;
        parse_proc_stat(&content).map_err(|e| SampleError::Parse(e.message))
    }

    /// Builds the parent -> children map of every process under the proc root.
    ///
    /// Processes that disappear during the scan are silently skipped.
    fn children_map(&self) -> Result<HashMap<u32, Vec<u32>>, SampleError> {
        let entries = self.fs.read_dir(Path::new(&self.proc_path))?;
        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();

        for entry in entries {
            if let Some(name) = entry.file_name().and_then(|n| n.to_str())
                && let Ok(pid) = name.parse::<u32>()
            {
                match self.read_stat(pid) {
                    Ok(stat) => children.entry(stat.ppid).or_default().push(pid),
                    Err(e) => trace!("skipping pid {} during scan: {}", pid, e),
                }
            }
        }

        Ok(children)
    }
}

impl<F: FileSystem> ProcessSampler for ProcSampler<F> {
    fn exists(&self, pid: u32) -> bool {
        let stat_path = format!("{}/{}/stat", self.proc_path, pid);
        self.fs.exists(Path::new(&stat_path))
    }

    fn descendants(&mut self, pid: u32) -> Result<Vec<u32>, SampleError> {
        if !self.exists(pid) {
            return Err(SampleError::ProcessGone(pid));
        }

        let children = self.children_map()?;

        let mut seen = HashSet::from([pid]);
        let mut queue = VecDeque::from([pid]);
        let mut result = Vec::new();

        while let Some(parent) = queue.pop_front() {
            let Some(kids) = children.get(&parent) else {
                continue;
            };
            for &child in kids {
                if seen.insert(child) {
                    result.push(child);
                    queue.push_back(child);
                }
            }
        }

        // Forget baselines of processes that are no longer part of the tree.
        self.baselines.retain(|p, _| seen.contains(p));

        Ok(result)
    }

    fn sample(&mut self, pid: u32) -> Result<ProcessReading, SampleError> {
        let stat = self.read_stat(pid)?;

        let status_path = format!("{}/{}/status", self.proc_path, pid);
        let status_content = self
            .fs
            .read_to_string(Path::new(&status_path))
            .map_err(|_| SampleError::ProcessGone(pid))?;
        let status = parse_proc_status(&status_content).map_err(|e| SampleError::Parse(e.message))?;

        let now = Instant::now();
        let ticks = stat.cpu_ticks();
        let cpu = match self.baselines.get(&pid) {
            Some(prev) if prev.starttime == stat.starttime => {
                cpu_percent(prev.ticks, ticks, now.duration_since(prev.at))
            }
            _ => 0.0,
        };
        self.baselines.insert(
            pid,
            CpuBaseline {
                ticks,
                starttime: stat.starttime,
                at: now,
            },
        );

        Ok(ProcessReading {
            cpu_percent: cpu,
            rss_bytes: status.vm_rss * 1024,
        })
    }
}
