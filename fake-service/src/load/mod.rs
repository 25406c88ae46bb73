//! Synthetic CPU and memory load.
//!
//! A [`LoadGenerator`] owns one [`GeneratorConfig`] and starts at most one
//! generation at a time. [`LoadGenerator::generate`] spawns the named pressure
//! loops and returns a [`StopHandle`] that ends them again:
//!
//! ```text
//! generate() ──► memory loop  (tokio task, one tick every 500ms)
//!            └─► cpu loop     (tokio task supervising one OS thread per core)
//!
//! StopHandle::stop()  clears the shared running flag and cancels every loop
//! StopHandle::join()  stop() + wait for every loop to exit
//! ```
//!
//! Generators that should be observed together (one per request, plus the
//! process-wide one) share a [`LoadStats`], so [`LoadStats::active_loops`]
//! sums live loops across all of them.

mod cpu;
mod memory;

use fake_core::{GeneratorAction, GeneratorConfig, GeneratorEvent, GeneratorState, LoopKind};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::GeneratorError;

/// Counters shared by every generator that reports into the same place.
#[derive(Debug, Default)]
pub struct LoadStats {
    /// Memory ticks completed.
    ticks: AtomicU64,
    /// Loops spawned and not yet exited.
    live: AtomicUsize,
}

impl LoadStats {
    /// Pressure loops currently running, across all generators.
    pub fn active_loops(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Memory ticks completed, across all generators.
    pub fn total_ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }
}

/// Starts and tracks synthetic load generation.
#[derive(Debug, Clone)]
pub struct LoadGenerator {
    config: Arc<GeneratorConfig>,
    state: Arc<Mutex<GeneratorState>>,
    stats: Arc<LoadStats>,
}

impl LoadGenerator {
    /// Create an idle generator with its own counters.
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_stats(Arc::new(config), Arc::new(LoadStats::default()))
    }

    /// Create an idle generator that reports into `stats`.
    pub fn with_stats(config: Arc<GeneratorConfig>, stats: Arc<LoadStats>) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(GeneratorState::new())),
            stats,
        }
    }

    /// Generator configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Counters this generator reports into.
    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    /// Start the memory loop, plus the CPU loop if cores > 0.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::AlreadyRunning`] if a previous generation has
    /// not finished yet, or [`GeneratorError::NoRuntime`] outside a runtime.
    pub fn generate(&self) -> Result<StopHandle, GeneratorError> {
        let runtime = Handle::try_current().map_err(|_| GeneratorError::NoRuntime)?;

        let actions = transition(
            &mut lock(&self.state),
            GeneratorEvent::GenerateRequested {
                cpu: self.config.cpu_enabled(),
            },
        );

        let running = Arc::new(AtomicBool::new(true));
        let live = Arc::new(AtomicUsize::new(0));
        let mut loops = Vec::with_capacity(actions.len());
        for action in actions {
            match action {
                GeneratorAction::Start(kind) => {
                    loops.push(self.spawn_loop(&runtime, kind, running.clone(), live.clone()));
                }
                GeneratorAction::RejectBusy => return Err(GeneratorError::AlreadyRunning),
                _ => {}
            }
        }

        tracing::debug!(loops = loops.len(), "Load generation started");

        Ok(StopHandle {
            loops,
            running,
            live,
            state: self.state.clone(),
            stopped: false,
        })
    }

    fn spawn_loop(
        &self,
        runtime: &Handle,
        kind: LoopKind,
        running: Arc<AtomicBool>,
        live: Arc<AtomicUsize>,
    ) -> LoopHandle {
        let token = CancellationToken::new();
        let guard = LoopGuard::enter(kind, self.state.clone(), self.stats.clone(), live);
        let config = self.config.clone();
        let cancel = token.clone();

        let task = match kind {
            LoopKind::Memory => {
                let stats = self.stats.clone();
                runtime.spawn(async move {
                    let _guard = guard;
                    memory::run(&config, running, cancel, stats).await;
                })
            }
            LoopKind::Cpu => runtime.spawn(async move {
                let _guard = guard;
                cpu::run(&config, running, cancel).await;
            }),
        };

        LoopHandle {
            kind,
            token,
            task: Some(task),
        }
    }

    /// Number of this generator's loops that have not exited yet.
    ///
    /// Zero once every loop of the last generation has stopped.
    pub fn active_loops(&self) -> usize {
        lock(&self.state).live_loops()
    }

    /// Whether a new generation can start.
    pub fn is_idle(&self) -> bool {
        lock(&self.state).is_idle()
    }

    /// Snapshot of the lifecycle state.
    pub fn state(&self) -> GeneratorState {
        lock(&self.state).clone()
    }
}

/// One spawned loop.
#[derive(Debug)]
struct LoopHandle {
    kind: LoopKind,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

/// Reports the loop's exit when the loop task ends, however it ends.
struct LoopGuard {
    kind: LoopKind,
    state: Arc<Mutex<GeneratorState>>,
    stats: Arc<LoadStats>,
    /// Live loops of the generation this loop belongs to.
    live: Arc<AtomicUsize>,
}

impl LoopGuard {
    fn enter(
        kind: LoopKind,
        state: Arc<Mutex<GeneratorState>>,
        stats: Arc<LoadStats>,
        live: Arc<AtomicUsize>,
    ) -> Self {
        stats.live.fetch_add(1, Ordering::AcqRel);
        live.fetch_add(1, Ordering::AcqRel);
        Self {
            kind,
            state,
            stats,
            live,
        }
    }
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        tracing::debug!(kind = self.kind.name(), "Load loop exited");
        let actions = {
            // Both counters move under the state lock so a concurrent stop()
            // sees them agree with the state machine
            let mut state = lock(&self.state);
            self.live.fetch_sub(1, Ordering::AcqRel);
            self.stats.live.fetch_sub(1, Ordering::AcqRel);
            transition(&mut state, GeneratorEvent::LoopExited(self.kind))
        };
        if actions.contains(&GeneratorAction::Finished) {
            tracing::debug!("Load generation finished");
        }
    }
}

/// Ends the loops started by one [`LoadGenerator::generate`] call.
///
/// Dropping the handle stops the loops without waiting for them.
#[derive(Debug)]
pub struct StopHandle {
    loops: Vec<LoopHandle>,
    running: Arc<AtomicBool>,
    /// Loops of this generation that have not exited yet.
    live: Arc<AtomicUsize>,
    state: Arc<Mutex<GeneratorState>>,
    stopped: bool,
}

impl StopHandle {
    /// Loops started by this generation.
    pub fn loops(&self) -> impl Iterator<Item = LoopKind> + '_ {
        self.loops.iter().map(|l| l.kind)
    }

    /// Signal a single loop to stop.
    ///
    /// Other loops keep running. Returns `false` if no loop of that kind was
    /// started.
    pub fn signal(&self, kind: LoopKind) -> bool {
        match self.loops.iter().find(|l| l.kind == kind) {
            Some(l) => {
                l.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stop every loop without waiting for it to exit.
    ///
    /// Never blocks. Calling it again has no effect. Once every loop of this
    /// generation has exited the generator is left alone, since a newer
    /// generation may own it by then.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        self.running.store(false, Ordering::Release);
        let actions = {
            let mut state = lock(&self.state);
            if self.live.load(Ordering::Acquire) == 0 {
                return;
            }
            transition(&mut state, GeneratorEvent::StopRequested)
        };
        if actions.contains(&GeneratorAction::CancelAll) {
            for l in &self.loops {
                l.token.cancel();
            }
        }
    }

    /// Stop every loop and wait until all of them have exited.
    pub async fn join(mut self) {
        self.stop();
        for l in &mut self.loops {
            if let Some(task) = l.task.take() {
                if let Err(e) = task.await {
                    tracing::error!("Load loop {} failed: {}", l.kind.name(), e);
                }
            }
        }
    }
}

impl Drop for StopHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(state: &Mutex<GeneratorState>) -> MutexGuard<'_, GeneratorState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn transition(state: &mut GeneratorState, event: GeneratorEvent) -> Vec<GeneratorAction> {
    let (next, actions) = std::mem::take(state).on_event(event);
    *state = next;
    actions
}
