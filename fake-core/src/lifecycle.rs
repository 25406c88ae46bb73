//! Load generator lifecycle state machine.
//!
//! This module provides a pure, side-effect-free state machine for the
//! `Idle → Running → Stopping → Idle` lifecycle of a load generator. It takes
//! events as input and produces a new state plus a list of actions to execute.
//!
//! Spawning and cancelling the pressure loops is performed by `fake-service`,
//! not by this module.

/// One of the pressure loops a generation can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    /// Memory allocation loop, always started.
    Memory,
    /// CPU duty-cycle supervisor, started when cores > 0.
    Cpu,
}

impl LoopKind {
    /// Name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Cpu => "cpu",
        }
    }
}

/// Generator lifecycle - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GeneratorState {
    /// No loops running; a generation may start.
    #[default]
    Idle,
    /// A generation is running.
    Running {
        /// Loops that have not exited yet.
        live: usize,
    },
    /// Stop was requested; waiting for loops to exit.
    Stopping {
        /// Loops that have not exited yet.
        live: usize,
    },
}

/// Input events for the lifecycle state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorEvent {
    /// Caller asked for a new generation.
    GenerateRequested {
        /// Whether the CPU loop should be started.
        cpu: bool,
    },
    /// Caller asked for every loop to stop.
    StopRequested,
    /// A loop has exited.
    LoopExited(LoopKind),
}

/// Side effects the service must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorAction {
    /// Spawn the given loop.
    Start(LoopKind),
    /// Cancel every running loop.
    CancelAll,
    /// Generation was rejected because one is already live.
    RejectBusy,
    /// Every loop has exited.
    Finished,
}

impl GeneratorState {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self::Idle
    }

    /// Process an event and return the new state plus actions to execute.
    pub fn on_event(self, event: GeneratorEvent) -> (Self, Vec<GeneratorAction>) {
        match (self, event) {
            // From Idle
            (Self::Idle, GeneratorEvent::GenerateRequested { cpu }) => {
                let mut actions = vec![GeneratorAction::Start(LoopKind::Memory)];
                if cpu {
                    actions.push(GeneratorAction::Start(LoopKind::Cpu));
                }
                (
                    Self::Running {
                        live: actions.len(),
                    },
                    actions,
                )
            }

            // From Running
            (Self::Running { live }, GeneratorEvent::StopRequested) => {
                (Self::Stopping { live }, vec![GeneratorAction::CancelAll])
            }
            (Self::Running { live }, GeneratorEvent::LoopExited(_)) => {
                Self::loop_exited(live, |live| Self::Running { live })
            }

            // From Stopping
            (Self::Stopping { live }, GeneratorEvent::LoopExited(_)) => {
                Self::loop_exited(live, |live| Self::Stopping { live })
            }

            // A live generation rejects another one
            (
                state @ (Self::Running { .. } | Self::Stopping { .. }),
                GeneratorEvent::GenerateRequested { .. },
            ) => (state, vec![GeneratorAction::RejectBusy]),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    fn loop_exited(live: usize, still_live: fn(usize) -> Self) -> (Self, Vec<GeneratorAction>) {
        match live.saturating_sub(1) {
            0 => (Self::Idle, vec![GeneratorAction::Finished]),
            remaining => (still_live(remaining), vec![]),
        }
    }

    /// Check if no generation is live.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Number of loops that have not exited.
    pub fn live_loops(&self) -> usize {
        match self {
            Self::Idle => 0,
            Self::Running { live } | Self::Stopping { live } => *live,
        }
    }
}
