//! Scripted process sampler for deterministic collector tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use crate::collector::procfs::SampleError;
use crate::collector::traits::{ProcessReading, ProcessSampler};

#[derive(Debug, Clone, Copy)]
struct ScriptedProcess {
    ppid: u32,
    reading: ProcessReading,
    /// Listed as a child but gone by the time it is sampled.
    ghost: bool,
}

/// Process sampler that returns pre-set readings.
///
/// Clones share the same process table, so a test can keep one handle and
/// change readings (or kill processes) while an agent owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSampler {
    processes: Arc<Mutex<HashMap<u32, ScriptedProcess>>>,
}

impl ScriptedSampler {
    /// Creates a sampler with no processes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a process and returns the sampler, for chained construction.
    pub fn with_process(self, pid: u32, ppid: u32, cpu_percent: f64, rss_bytes: u64) -> Self {
        self.set_process(pid, ppid, cpu_percent, rss_bytes);
        self
    }

    /// Adds or replaces a process.
    pub fn set_process(&self, pid: u32, ppid: u32, cpu_percent: f64, rss_bytes: u64) {
        self.table().insert(
            pid,
            ScriptedProcess {
                ppid,
                reading: ProcessReading {
                    cpu_percent,
                    rss_bytes,
                },
                ghost: false,
            },
        );
    }

    /// Adds a process that shows up in the tree but exits before it is sampled.
    pub fn add_ghost(&self, pid: u32, ppid: u32) {
        self.table().insert(
            pid,
            ScriptedProcess {
                ppid,
                reading: ProcessReading::default(),
                ghost: true,
            },
        );
    }

    /// Removes a process as if it had exited.
    pub fn kill(&self, pid: u32) {
        self.table().remove(&pid);
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<u32, ScriptedProcess>> {
        self.processes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProcessSampler for ScriptedSampler {
    fn exists(&self, pid: u32) -> bool {
        self.table().contains_key(&pid)
    }

    fn descendants(&mut self, pid: u32) -> Result<Vec<u32>, SampleError> {
        let table = self.table();
        if !table.contains_key(&pid) {
            return Err(SampleError::ProcessGone(pid));
        }

        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        for (&child, process) in table.iter() {
            children.entry(process.ppid).or_default().push(child);
        }
        for kids in children.values_mut() {
            kids.sort_unstable();
        }

        let mut seen = HashSet::from([pid]);
        let mut queue = VecDeque::from([pid]);
        let mut result = Vec::new();
        while let Some(parent) = queue.pop_front() {
            for &child in children.get(&parent).into_iter().flatten() {
                if seen.insert(child) {
                    result.push(child);
                    queue.push_back(child);
                }
            }
        }
        Ok(result)
    }

    fn sample(&mut self, pid: u32) -> Result<ProcessReading, SampleError> {
        match self.table().get(&pid) {
            Some(process) if !process.ghost => Ok(process.reading),
            _ => Err(SampleError::ProcessGone(pid)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_descendants() {
        let mut sampler = ScriptedSampler::new()
            .with_process(10, 1, 0.0, 0)
            .with_process(11, 10, 0.0, 0)
            .with_process(12, 11, 0.0, 0)
            .with_process(20, 1, 0.0, 0);

        assert_eq!(sampler.descendants(10).unwrap(), vec![11, 12]);
        assert!(matches!(
            sampler.descendants(99),
            Err(SampleError::ProcessGone(99))
        ));
    }

    #[test]
    fn test_scripted_clones_share_state() {
        let handle = ScriptedSampler::new().with_process(10, 1, 5.0, 1024);
        let mut owned = handle.clone();

        handle.kill(10);
        assert!(!owned.exists(10));
        assert!(owned.sample(10).is_err());
    }

    #[test]
    fn test_ghost_is_listed_but_not_sampled() {
        let mut sampler = ScriptedSampler::new().with_process(10, 1, 0.0, 0);
        sampler.add_ghost(11, 10);

        assert_eq!(sampler.descendants(10).unwrap(), vec![11]);
        assert!(matches!(
            sampler.sample(11),
            Err(SampleError::ProcessGone(11))
        ));
    }
}
