//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` filesystem states
//! for testing process tree discovery and sampling.

use super::filesystem::MockFs;

impl MockFs {
    /// Adds a sleeping process built from its essential figures.
    ///
    /// `utime`/`stime` are in clock ticks, `rss_kb` is the resident set in kB.
    pub fn add_task(&mut self, pid: u32, ppid: u32, name: &str, utime: u64, stime: u64, rss_kb: u64) {
        let stat = format!(
            "{pid} ({name}) S {ppid} {pid} {pid} 0 -1 4194304 0 0 0 0 {utime} {stime} 0 0 20 0 1 0 {start} 0 {pages} 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            start = pid as u64 * 10,
            pages = rss_kb / 4,
        );
        let status = format!(
            "Name:\t{name}\nState:\tS (sleeping)\nPid:\t{pid}\nPPid:\t{ppid}\nVmRSS:\t{rss_kb:>9} kB\n"
        );
        self.add_process(pid, &stat, &status);
    }

    /// Creates a system with a small process tree.
    ///
    /// ```text
    /// 1 init
    /// ├── 100 server      100 MB
    /// │   ├── 101 worker   40 MB
    /// │   │   └── 103 helper 8 MB
    /// │   └── 102 worker   20 MB
    /// └── 200 sshd         12 MB
    /// ```
    pub fn process_tree() -> Self {
        let mut fs = Self::new();

        fs.add_task(1, 0, "init", 50, 30, 4 * 1024);
        fs.add_task(100, 1, "server", 1000, 200, 100 * 1024);
        fs.add_task(101, 100, "worker", 500, 100, 40 * 1024);
        fs.add_task(102, 100, "worker", 300, 50, 20 * 1024);
        fs.add_task(103, 101, "helper", 10, 5, 8 * 1024);
        fs.add_task(200, 1, "sshd", 20, 10, 12 * 1024);

        fs
    }

    /// Creates the process tree with a zombie child of the server.
    pub fn with_zombie_process() -> Self {
        let mut fs = Self::process_tree();

        fs.add_process(
            4000,
            "4000 (defunct) Z 100 4000 100 0 -1 4194308 0 0 0 0 0 0 0 0 20 0 1 0 400000 0 0 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 -1 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "\
Name:\tdefunct
State:\tZ (zombie)
Pid:\t4000
PPid:\t100
",
        );

        fs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::traits::FileSystem;
    use std::path::Path;

    #[test]
    fn test_process_tree() {
        let fs = MockFs::process_tree();
        assert!(fs.exists(Path::new("/proc/1/stat")));
        assert!(fs.exists(Path::new("/proc/103/status")));

        let entries = fs.read_dir(Path::new("/proc")).unwrap();
        assert_eq!(entries.len(), 6);
    }

    #[test]
    fn test_add_task_stat_layout() {
        let fs = MockFs::process_tree();
        let stat = fs.read_to_string(Path::new("/proc/101/stat")).unwrap();
        assert!(stat.starts_with("101 (worker) S 100 "));

        let status = fs.read_to_string(Path::new("/proc/101/status")).unwrap();
        assert!(status.contains("VmRSS:\t    40960 kB"));
    }

    #[test]
    fn test_zombie_process() {
        let fs = MockFs::with_zombie_process();
        let stat = fs.read_to_string(Path::new("/proc/4000/stat")).unwrap();
        assert!(stat.contains(") Z ")); // Zombie state
    }
}
