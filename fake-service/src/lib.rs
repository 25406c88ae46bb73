//! # fake-service
//!
//! Emulates one service of a distributed system for testing service
//! topologies.
//!
//! Every request to a fake service:
//! - Generates synthetic CPU and memory load while it is being handled
//! - Optionally fails on purpose, at a configured rate
//! - Calls its configured upstreams through a bounded worker pool
//! - Holds the answer until a drawn request duration has passed
//! - Returns a response tree describing itself and every upstream call
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!  GET / ────────►│         fake-service         │
//!                 │  ┌────────────┐ ┌──────────┐ │──► upstream A
//!                 │  │ load loops │ │  worker  │ │
//!                 │  │ (cpu, mem) │ │   pool   │ │──► upstream B
//!                 │  └────────────┘ └──────────┘ │
//!                 └──────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod budget;
pub mod config;
pub mod error;
pub mod http;
pub mod inject;
pub mod load;
pub mod net;
pub mod service;
pub mod upstream;
pub mod worker;
