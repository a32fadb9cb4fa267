pub mod comms;
pub mod crew;
pub mod eclss;
pub mod power;
pub mod propulsion;

pub use comms::{CommsState, CommsSystem};
pub use crew::{CrewState, CrewSystem};
pub use eclss::{EclssState, EclssSystem};
pub use power::{PowerState, PowerSystem};
pub use propulsion::{PropulsionState, PropulsionSystem};

use crate::orbit::OrbitalState;
use crate::timeline::Timeline;
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

/// Per-tick inputs shared by every simulator. Subsystems read the tick's
/// orbital state and flight plan; they never see a sibling's same-tick
/// output.
pub struct TickContext<'a> {
    pub elapsed: Duration,
    pub met_s: f64,
    pub dt_s: f64,
    pub orbital: &'a OrbitalState,
    pub timeline: &'a Timeline,
    pub rng: &'a mut StdRng,
}

/// The single update contract all subsystem simulators implement: advance
/// internal state one tick and hand back the wire-ready state for it.
pub trait SubsystemModel {
    type State: Clone + Serialize;

    fn update(&mut self, ctx: &mut TickContext<'_>) -> Self::State;
}

/// One step of a bounded random walk: perturb, then clip to the declared
/// valid range. The clip happens after the perturbation so no excursion can
/// ever leave the range, whatever the step size.
pub(crate) fn bounded_walk(rng: &mut StdRng, current: f64, step: f64, min: f64, max: f64) -> f64 {
    let next = current + rng.gen_range(-step..=step);
    next.clamp(min, max)
}

/// A mean-reverting variant: drift a fraction of the way back toward the
/// baseline each tick, then perturb and clip. Keeps vitals wandering around
/// their nominal values instead of pinning at a bound.
pub(crate) fn reverting_walk(
    rng: &mut StdRng,
    current: f64,
    baseline: f64,
    pull: f64,
    step: f64,
    min: f64,
    max: f64,
) -> f64 {
    let reverted = current + (baseline - current) * pull;
    bounded_walk(rng, reverted, step, min, max)
}

/// Move `current` toward `target` by at most `rate * dt`, for quantities
/// that respond smoothly rather than stochastically (panel temperature,
/// chamber pressure).
pub(crate) fn approach(current: f64, target: f64, rate: f64, dt_s: f64) -> f64 {
    let max_delta = rate * dt_s;
    current + (target - current).clamp(-max_delta, max_delta)
}
