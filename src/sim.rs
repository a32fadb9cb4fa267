use crate::alerts::{AlertError, AlertEvaluator, AlertSeverity};
use crate::clock::MissionClock;
use crate::orbit::{OrbitalPropagator, OrbitalState};
use crate::subsystems::{
    CommsSystem, CrewSystem, EclssSystem, PowerSystem, PropulsionSystem, SubsystemModel,
    TickContext,
};
use crate::telemetry::{SpacecraftTelemetry, Snapshot, TelemetryAggregator, TelemetryFrame};
use crate::timeline::Timeline;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// RNG seed; a fixed seed makes a run reproducible tick for tick.
    pub seed: u64,
    /// Mission clock acceleration factor for ground testing.
    pub time_scale: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0x0051_0A17,
            time_scale: 1.0,
        }
    }
}

/// The mission-state orchestrator: owns the clock, propagator, flight plan,
/// subsystem simulators, and alert evaluator, and turns each tick into one
/// immutable snapshot.
pub struct MissionSimulator {
    clock: MissionClock,
    propagator: OrbitalPropagator,
    timeline: Timeline,
    crew: CrewSystem,
    eclss: EclssSystem,
    power: PowerSystem,
    propulsion: PropulsionSystem,
    comms: CommsSystem,
    evaluator: AlertEvaluator,
    aggregator: TelemetryAggregator,
    rng: StdRng,
    last_orbital: OrbitalState,
    last_met_s: f64,
}

impl MissionSimulator {
    pub fn new(config: SimConfig) -> Self {
        let propagator = OrbitalPropagator::new();
        // The epoch solve converges trivially (M = 0); the zeroed fallback
        // only exists so construction itself cannot fail.
        let last_orbital = propagator
            .propagate(Duration::ZERO)
            .unwrap_or_default();

        Self {
            clock: MissionClock::with_scale(config.time_scale),
            propagator,
            timeline: Timeline::new(),
            crew: CrewSystem::new(),
            eclss: EclssSystem::new(),
            power: PowerSystem::new(),
            propulsion: PropulsionSystem::new(),
            comms: CommsSystem::new(),
            evaluator: AlertEvaluator::new(),
            aggregator: TelemetryAggregator::new(),
            rng: StdRng::seed_from_u64(config.seed),
            last_orbital,
            last_met_s: 0.0,
        }
    }

    /// Advance one tick at the clock's current elapsed time.
    pub fn tick(&mut self) -> Arc<Snapshot> {
        self.step(self.clock.elapsed())
    }

    /// Advance one tick at an explicit elapsed time. Exposed separately so
    /// long simulated spans can be driven without waiting on wall time.
    pub fn step(&mut self, elapsed: Duration) -> Arc<Snapshot> {
        let met_s = elapsed.as_secs_f64();
        let dt_s = (met_s - self.last_met_s).max(0.0);

        // A diverged solve falls back to the last converged state and raises
        // a system alert; numeric failure never reaches consumers.
        let orbital = match self.propagator.propagate(elapsed) {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, "orbital propagation failed, holding last state");
                self.evaluator.raise(
                    "guidance",
                    "orbit_propagation",
                    AlertSeverity::Caution,
                    format!("orbit solution degraded: {err}"),
                    elapsed,
                );
                self.last_orbital.clone()
            }
        };

        let mut ctx = TickContext {
            elapsed,
            met_s,
            dt_s,
            orbital: &orbital,
            timeline: &self.timeline,
            rng: &mut self.rng,
        };
        let crew = self.crew.update(&mut ctx);
        let eclss = self.eclss.update(&mut ctx);
        let power = self.power.update(&mut ctx);
        let propulsion = self.propulsion.update(&mut ctx);
        let communications = self.comms.update(&mut ctx);

        let spacecraft = SpacecraftTelemetry::from_orbital(&orbital, elapsed);
        let frame = TelemetryFrame {
            spacecraft: &spacecraft,
            crew: &crew,
            eclss: &eclss,
            power: &power,
            propulsion: &propulsion,
            communications: &communications,
        };
        self.evaluator.evaluate(&frame, elapsed);

        let snapshot = self.aggregator.assemble(
            spacecraft,
            crew,
            eclss,
            power,
            propulsion,
            communications,
            self.timeline.state(met_s),
            self.evaluator.alerts().to_vec(),
        );

        self.last_met_s = met_s;
        self.last_orbital = orbital;
        Arc::new(snapshot)
    }

    /// Acknowledge an alert. Serialized against evaluator passes by virtue
    /// of requiring `&mut self` on the one simulator instance.
    pub fn acknowledge_alert(&mut self, id: u64) -> Result<(), AlertError> {
        self.evaluator.acknowledge(id)
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    // Ground-test override access to individual simulators.

    pub fn crew_mut(&mut self) -> &mut CrewSystem {
        &mut self.crew
    }

    pub fn eclss_mut(&mut self) -> &mut EclssSystem {
        &mut self.eclss
    }

    pub fn power_mut(&mut self) -> &mut PowerSystem {
        &mut self.power
    }

    pub fn propulsion_mut(&mut self) -> &mut PropulsionSystem {
        &mut self.propulsion
    }
}

impl Default for MissionSimulator {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}
