//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of `/proc/[pid]/stat` and
//! `/proc/[pid]/status` into structured data. They are designed to be easily
//! testable with string inputs.

use std::collections::HashMap;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Fields of `/proc/[pid]/stat` the sampler needs.
#[derive(Debug, Clone, Default)]
pub struct ProcStat {
    pub ppid: u32,
    /// User mode time in clock ticks.
    pub utime: u64,
    /// Kernel mode time in clock ticks.
    pub stime: u64,
    /// Time the process started after boot, in clock ticks.
    pub starttime: u64,
}

impl ProcStat {
    /// Total CPU time consumed, in clock ticks.
    pub fn cpu_ticks(&self) -> u64 {
        self.utime + self.stime
    }
}

/// Number of fields after `(comm)` up to and including `starttime`.
const STAT_MIN_FIELDS: usize = 20;

/// Parses `/proc/[pid]/stat` content.
///
/// The format is tricky because the comm field can contain spaces and parentheses.
/// Format: pid (comm) state ppid pgrp session tty_nr ...
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let content = content.trim();

    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;

    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    content[..open_paren]
        .trim()
        .parse::<u32>()
        .map_err(|_| ParseError::new("invalid pid"))?;

    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();

    if fields.len() < STAT_MIN_FIELDS {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected {}+, got {}",
            STAT_MIN_FIELDS,
            fields.len()
        )));
    }

    let parse_field = |idx: usize, name: &str| -> Result<u64, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };

    Ok(ProcStat {
        ppid: parse_field(1, "ppid")? as u32,
        utime: parse_field(11, "utime")?,
        stime: parse_field(12, "stime")?,
        starttime: parse_field(19, "starttime")?,
    })
}

/// Fields of `/proc/[pid]/status` the sampler needs.
#[derive(Debug, Clone, Default)]
pub struct ProcStatus {
    /// Resident set size in kB. Zero for kernel threads and zombies.
    pub vm_rss: u64,
}

/// Parses `/proc/[pid]/status` content.
///
/// Format is key:\tvalue pairs, one per line.
pub fn parse_proc_status(content: &str) -> Result<ProcStatus, ParseError> {
    let mut fields: HashMap<&str, &str> = HashMap::new();

    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim(), value.trim());
        }
    }

    if !fields.contains_key("Pid") {
        return Err(ParseError::new("missing Pid in status"));
    }

    // Memory fields are in kB format: "12345 kB"
    let parse_kb = |key: &str| -> u64 {
        fields
            .get(key)
            .and_then(|s| s.split_whitespace().next())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    };

    Ok(ProcStatus {
        vm_rss: parse_kb("VmRSS"),
    })
}
