//! # fake-core
//!
//! Pure logic for fake-service (no I/O, instant tests).
//!
//! This crate implements the numeric and state-machine parts of the synthetic
//! load generator and the request duration budget without spawning tasks,
//! sleeping, or allocating load, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. Randomness is injected through a caller-supplied
//! [`rand::Rng`] so that tests can seed it.
//!
//! The actual work (pressure loops, sleeping, upstream calls) is performed by
//! the `fake-service` crate, which interprets the values produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod budget;
pub mod generator;
pub mod lifecycle;
pub mod phase;
pub mod timing;
pub mod variance;

pub use budget::Budget;
pub use generator::{DutyCycle, GeneratorConfig, GeneratorConfigError, MIB};
pub use lifecycle::{GeneratorAction, GeneratorEvent, GeneratorState, LoopKind};
pub use phase::{PhaseState, MIN_TICKS_PER_PERIOD, TICK_INTERVAL};
pub use timing::{RequestDuration, TimingError};
pub use variance::VarianceModel;
