//! # Crewed Mission Telemetry Simulator
//!
//! A deterministic, time-evolving mission-state simulator coupled to a
//! real-time multi-subscriber distribution layer. At a fixed cadence the core
//! computes an internally consistent spacecraft/crew/subsystem snapshot,
//! pushes it to every connected stream subscriber, and serves it to
//! synchronous point-in-time queries — both paths observe the same tick's
//! data.
//!
//! ## Features
//!
//! - **Orbital propagation**: piecewise two-body trajectory with a
//!   Newton-Raphson Kepler solve and vis-viva-consistent velocities
//! - **Subsystem simulation**: crew vitals, life support, power, propulsion,
//!   and communications as bounded random walks that never leave their
//!   declared physical ranges
//! - **Alert lifecycle**: threshold scanning with severity tiers,
//!   per-(system, parameter) deduplication, and idempotent acknowledgement
//! - **Snapshot distribution**: 100 ms fan-out that tolerates subscriber
//!   churn and evicts slow or dead consumers without stalling the producer
//!
//! ## Quick Start
//!
//! ```rust
//! use orionsim::sim::{MissionSimulator, SimConfig};
//! use std::time::Duration;
//!
//! let mut sim = MissionSimulator::new(SimConfig::default());
//!
//! // Advance one tick and read the aggregated snapshot.
//! let snapshot = sim.step(Duration::from_millis(100));
//! println!("MET {}", snapshot.spacecraft.mission_elapsed_time);
//! ```
//!
//! ## Architecture
//!
//! - [`clock`] - Monotonic mission-elapsed-time source
//! - [`orbit`] - Trajectory profile and orbital numerics
//! - [`subsystems`] - Individual subsystem simulators
//! - [`timeline`] - Flight plan and event status derivation
//! - [`alerts`] - Threshold evaluation and alert lifecycle
//! - [`telemetry`] - Per-tick snapshot aggregation
//! - [`sim`] - Main orchestrator
//! - [`protocol`] - Request/response wire types
//! - [`server`] - Tick loop, subscriber fan-out, and query surface

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod alerts;
pub mod clock;
pub mod orbit;
pub mod protocol;
pub mod server;
pub mod sim;
pub mod subsystems;
pub mod telemetry;
pub mod timeline;

// Re-export main public types for convenience
pub use alerts::{Alert, AlertEvaluator, AlertSeverity};
pub use clock::MissionClock;
pub use orbit::{OrbitalPropagator, OrbitalState};
pub use sim::{MissionSimulator, SimConfig};
pub use telemetry::Snapshot;
