//! Monitoring agent: a cancellable polling loop on its own thread.
//!
//! Each tick asks the collector for a sample and hands it to the sink,
//! then sleeps for the poll interval. The sleep is a condition variable
//! wait, so `stop()` interrupts it immediately.
//!
//! # Lifecycle
//!
//! ```text
//! Created ──start()──▶ Running ──stop()──▶ Stopping ──flush──▶ Stopped
//!    │                    │                                      ▲
//!    │                    └── collector/sink failure ────────────┤
//!    └── stop() before start(): flush inline ────────────────────┘
//! ```
//!
//! The sink is flushed exactly once per agent, on every path to `Stopped`.

mod config;
mod kind;

pub use config::{AgentConfig, ConfigError, DEFAULT_POLL_INTERVAL_SECS};
pub use kind::AgentKind;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, mpsc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::collector::ProcessSampler;
use crate::metrics::{CollectError, MetricsCollector};
use crate::sink::{MetricsSink, SinkError};

/// Lifecycle state of a [`MonitorAgent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Running,
    Stopping,
    Stopped,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Created => "created",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Error type for agent failures.
#[derive(Debug)]
pub enum AgentError {
    /// Invalid configuration.
    Config(ConfigError),
    /// The collector failed; the target process is usually gone.
    Collect(CollectError),
    /// The output transport failed.
    Sink(SinkError),
    /// The polling thread could not be spawned.
    Spawn(std::io::Error),
    /// Operation not allowed in the current state.
    InvalidState {
        op: &'static str,
        state: LifecycleState,
    },
    /// The polling thread panicked.
    Panicked,
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentError::Config(e) => write!(f, "configuration error: {}", e),
            AgentError::Collect(e) => write!(f, "collection failed: {}", e),
            AgentError::Sink(e) => write!(f, "sink failed: {}", e),
            AgentError::Spawn(e) => write!(f, "failed to spawn polling thread: {}", e),
            AgentError::InvalidState { op, state } => {
                write!(f, "cannot {} an agent that is {}", op, state)
            }
            AgentError::Panicked => write!(f, "polling thread panicked"),
        }
    }
}

impl std::error::Error for AgentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AgentError::Config(e) => Some(e),
            AgentError::Collect(e) => Some(e),
            AgentError::Sink(e) => Some(e),
            AgentError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for AgentError {
    fn from(e: ConfigError) -> Self {
        AgentError::Config(e)
    }
}

impl From<CollectError> for AgentError {
    fn from(e: CollectError) -> Self {
        AgentError::Collect(e)
    }
}

impl From<SinkError> for AgentError {
    fn from(e: SinkError) -> Self {
        AgentError::Sink(e)
    }
}

/// Collector and sink owned by one agent.
type Parts = (Box<dyn MetricsCollector>, Box<dyn MetricsSink>);

/// State shared between the agent, its stop handles and the polling thread.
#[derive(Debug)]
struct Shared {
    state: Mutex<LifecycleState>,
    changed: Condvar,
    ticks: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(LifecycleState::Created),
            changed: Condvar::new(),
            ticks: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self) -> LifecycleState {
        *self.lock()
    }

    fn set(&self, state: LifecycleState) {
        *self.lock() = state;
        self.changed.notify_all();
    }

    /// Moves `Created` or `Running` to `Stopping`. Returns `true` on a transition.
    fn request_stop(&self) -> bool {
        let mut state = self.lock();
        match *state {
            LifecycleState::Created | LifecycleState::Running => {
                *state = LifecycleState::Stopping;
                drop(state);
                self.changed.notify_all();
                true
            }
            LifecycleState::Stopping | LifecycleState::Stopped => false,
        }
    }

    /// Sleeps for `interval` or until the state leaves `Running`.
    fn sleep_while_running(&self, interval: Duration) {
        let deadline = Instant::now() + interval;
        let mut state = self.lock();
        while *state == LifecycleState::Running {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let (guard, _) = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    fn wait_stopped(&self) {
        let mut state = self.lock();
        while *state != LifecycleState::Stopped {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Marks the agent `Stopped` when the polling thread exits, even by panic.
struct StoppedOnExit(Arc<Shared>);

impl Drop for StoppedOnExit {
    fn drop(&mut self) {
        self.0.set(LifecycleState::Stopped);
    }
}

/// Cloneable handle that requests an agent to stop from another thread.
#[derive(Debug, Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    /// Requests the agent to stop. Idempotent.
    ///
    /// A request made before `start()` makes the next `start()`, `stop()`
    /// or `wait()` on the agent tear it down without running any tick.
    pub fn stop(&self) {
        if self.shared.request_stop() {
            debug!("stop requested");
        }
    }
}

/// Periodically samples a process tree and writes the samples to a sink.
pub struct MonitorAgent {
    config: AgentConfig,
    shared: Arc<Shared>,
    parts: Option<Parts>,
    handle: Option<JoinHandle<Result<(), AgentError>>>,
    /// Failure of a teardown that ran on the caller's thread, reported by `wait()`.
    outcome: Option<AgentError>,
}

impl MonitorAgent {
    /// Creates an agent from an explicit collector and sink.
    pub fn new(
        config: AgentConfig,
        collector: Box<dyn MetricsCollector>,
        sink: Box<dyn MetricsSink>,
    ) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::new()),
            parts: Some((collector, sink)),
            handle: None,
            outcome: None,
        }
    }

    /// Creates an agent whose collector and sink are chosen by `kind`.
    ///
    /// Fails if the target process does not exist.
    pub fn with_kind<S, W>(
        kind: AgentKind,
        config: AgentConfig,
        sampler: S,
        out: W,
    ) -> Result<Self, AgentError>
    where
        S: ProcessSampler + 'static,
        W: std::io::Write + Send + 'static,
    {
        let pid = config.target_pid();
        if !sampler.exists(pid) {
            return Err(CollectError::TargetGone(pid).into());
        }
        debug!("creating {} agent for pid {}", kind, pid);
        Ok(Self::new(
            config,
            kind.make_collector(sampler, pid),
            kind.make_sink(out),
        ))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.shared.get()
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Acquire)
    }

    /// Returns a handle that can stop this agent from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Initialises the sink and starts the polling loop on a new thread.
    ///
    /// Returns without blocking. If a stop was already requested, the agent
    /// is torn down instead and `Ok(())` is returned.
    pub fn start(&mut self) -> Result<(), AgentError> {
        match self.state() {
            LifecycleState::Created => {}
            LifecycleState::Stopping if self.parts.is_some() => {
                self.teardown_unstarted();
                return Ok(());
            }
            state => return Err(AgentError::InvalidState { op: "start", state }),
        }
        let Some((collector, mut sink)) = self.parts.take() else {
            return Err(AgentError::InvalidState {
                op: "start",
                state: self.state(),
            });
        };

        if let Err(e) = sink.init() {
            error!("sink init failed: {}", e);
            self.shared.set(LifecycleState::Stopping);
            if let Err(flush_err) = sink.flush() {
                warn!("flush after failed init also failed: {}", flush_err);
            }
            self.shared.set(LifecycleState::Stopped);
            return Err(e.into());
        }

        {
            let mut state = self.shared.lock();
            if *state != LifecycleState::Created {
                // Stop was requested while the sink initialised.
                drop(state);
                self.parts = Some((collector, sink));
                self.teardown_unstarted();
                return Ok(());
            }
            *state = LifecycleState::Running;
        }

        let shared = Arc::clone(&self.shared);
        let interval = self.config.poll_interval();
        let pid = self.config.target_pid();

        // Parts are handed over only once the thread exists, so a failed
        // spawn leaves them here to be flushed.
        let (tx, rx) = mpsc::channel::<Parts>();
        let spawned = thread::Builder::new()
            .name(format!("procwatch-{}", pid))
            .spawn(move || match rx.recv() {
                Ok((collector, sink)) => run_loop(shared, interval, collector, sink),
                Err(_) => Ok(()),
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                error!("failed to spawn polling thread: {}", e);
                self.abandon_start((collector, sink));
                return Err(AgentError::Spawn(e));
            }
        };
        if let Err(mpsc::SendError(parts)) = tx.send((collector, sink)) {
            error!("polling thread exited before it started");
            let _ = handle.join();
            self.abandon_start(parts);
            return Err(AgentError::Panicked);
        }

        info!(
            "agent started: pid={}, interval={:.3}s",
            pid,
            interval.as_secs_f64()
        );
        self.handle = Some(handle);
        Ok(())
    }

    /// Tears down a `Running` agent whose polling thread never got the parts.
    fn abandon_start(&mut self, parts: Parts) {
        self.parts = Some(parts);
        self.shared.set(LifecycleState::Stopping);
        self.teardown_unstarted();
    }

    /// Requests the polling loop to stop. Idempotent, never fails.
    ///
    /// On an agent that was never started, the sink is flushed right away.
    pub fn stop(&mut self) {
        if self.shared.request_stop() {
            debug!("stop requested");
        }
        if self.parts.is_some() && self.state() == LifecycleState::Stopping {
            self.teardown_unstarted();
        }
    }

    /// Blocks until the agent is `Stopped` and returns how the loop ended.
    ///
    /// A fatal collector or sink error is reported by the first call only.
    /// Fails with `InvalidState` on an agent that was neither started nor
    /// stopped, since it would never finish.
    pub fn wait(&mut self) -> Result<(), AgentError> {
        match self.state() {
            LifecycleState::Created => {
                return Err(AgentError::InvalidState {
                    op: "wait for",
                    state: LifecycleState::Created,
                });
            }
            LifecycleState::Stopping if self.parts.is_some() => self.teardown_unstarted(),
            _ => {}
        }

        self.shared.wait_stopped();

        if let Some(handle) = self.handle.take() {
            return match handle.join() {
                Ok(result) => result,
                Err(_) => Err(AgentError::Panicked),
            };
        }
        match self.outcome.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Flushes and releases the sink of an agent that never ran a loop.
    fn teardown_unstarted(&mut self) {
        let Some((collector, mut sink)) = self.parts.take() else {
            return;
        };
        debug!("stopping agent before it started");
        if let Err(e) = sink.flush() {
            error!("sink flush failed: {}", e);
            self.outcome = Some(e.into());
        }
        drop(collector);
        drop(sink);
        self.shared.set(LifecycleState::Stopped);
        info!("agent stopped");
    }
}

impl Drop for MonitorAgent {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Body of the polling thread.
fn run_loop(
    shared: Arc<Shared>,
    interval: Duration,
    mut collector: Box<dyn MetricsCollector>,
    mut sink: Box<dyn MetricsSink>,
) -> Result<(), AgentError> {
    let _stopped = StoppedOnExit(Arc::clone(&shared));

    let result = loop {
        if shared.get() != LifecycleState::Running {
            break Ok(());
        }

        let sample = match collector.collect() {
            Ok(sample) => sample,
            Err(e) => {
                error!("stopping agent: {}", e);
                break Err(AgentError::Collect(e));
            }
        };
        if let Err(e) = sink.write(&sample) {
            error!("stopping agent: {}", e);
            break Err(AgentError::Sink(e));
        }

        let ticks = shared.ticks.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("tick #{}: {:?}", ticks, sample);

        shared.sleep_while_running(interval);
    };

    shared.set(LifecycleState::Stopping);
    let flushed = sink.flush();
    drop(collector);
    drop(sink);
    info!(
        "agent stopped after {} ticks",
        shared.ticks.load(Ordering::Acquire)
    );

    match (result, flushed) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(e)) => {
            error!("sink flush failed: {}", e);
            Err(AgentError::Sink(e))
        }
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(flush_err)) => {
            warn!("sink flush failed: {}", flush_err);
            Err(e)
        }
    }
}
