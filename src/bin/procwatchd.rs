//! procwatchd - process tree resource monitor.
//!
//! Samples CPU and memory of a process and all of its descendants and writes
//! JSON records to stdout. Logs go to stderr.

use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use procwatch::agent::{AgentConfig, AgentKind, DEFAULT_POLL_INTERVAL_SECS, MonitorAgent};
use procwatch::collector::{ProcSampler, RealFs};

/// Output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Print current CPU and memory on every tick.
    Stream,
    /// Print average CPU and peak memory once, on exit.
    Log,
}

impl From<Mode> for AgentKind {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Stream => AgentKind::Stream,
            Mode::Log => AgentKind::Log,
        }
    }
}

/// Process tree resource monitor.
#[derive(Parser)]
#[command(name = "procwatchd", about = "Process tree resource monitor", version)]
struct Args {
    /// PID of the process to monitor. Defaults to procwatchd itself.
    #[arg(short, long)]
    pid: Option<u32>,

    /// Sampling interval in seconds.
    #[arg(short, long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    interval: f64,

    /// Output mode.
    #[arg(short, long, value_enum, default_value_t = Mode::Stream)]
    mode: Mode,

    /// Stop after this many seconds. Runs until Ctrl-C if omitted.
    #[arg(short, long)]
    duration: Option<f64>,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["procwatchd", "procwatch"] {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("invalid log directive for {}: {}", target, e),
        }
    }

    // stdout carries the records.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let config = match AgentConfig::new(args.pid, args.interval) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let deadline = match args.duration.map(Duration::try_from_secs_f64).transpose() {
        Ok(deadline) => deadline,
        Err(e) => {
            error!("invalid duration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let kind = AgentKind::from(args.mode);

    info!("procwatchd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: pid={}, interval={}s, mode={}, proc={}",
        config.target_pid(),
        args.interval,
        kind,
        args.proc_path
    );

    let sampler = ProcSampler::new(RealFs::new(), &args.proc_path);
    let mut agent = match MonitorAgent::with_kind(kind, config, sampler, std::io::stdout()) {
        Ok(agent) => agent,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // Setup graceful shutdown
    let stop = agent.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        stop.stop();
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    if let Some(deadline) = deadline {
        let stop = agent.stop_handle();
        thread::spawn(move || {
            thread::sleep(deadline);
            info!("Duration elapsed");
            stop.stop();
        });
    }

    if let Err(e) = agent.start() {
        error!("Failed to start agent: {}", e);
        return ExitCode::FAILURE;
    }

    match agent.wait() {
        Ok(()) => {
            info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Agent stopped with error: {}", e);
            ExitCode::FAILURE
        }
    }
}
