use crate::alerts::Alert;
use crate::clock::MissionClock;
use crate::orbit::{OrbitalState, Vec3};
use crate::subsystems::{CommsState, CrewState, EclssState, PowerState, PropulsionState};
use crate::timeline::TimelineState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitalParameters {
    pub apogee: f64,
    pub perigee: f64,
    pub inclination: f64,
    pub period: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpacecraftTelemetry {
    pub position: Vec3,
    pub velocity: Vec3,
    pub mission_elapsed_time: String,
    pub altitude: f64,
    pub distance_earth: f64,
    pub distance_moon: f64,
    pub orbital_parameters: OrbitalParameters,
}

impl SpacecraftTelemetry {
    pub fn from_orbital(orbital: &OrbitalState, elapsed: Duration) -> Self {
        Self {
            position: orbital.position_km,
            velocity: orbital.velocity_km_s,
            mission_elapsed_time: MissionClock::format_met(elapsed),
            altitude: orbital.altitude_km,
            distance_earth: orbital.distance_earth_km,
            distance_moon: orbital.distance_moon_km,
            orbital_parameters: OrbitalParameters {
                apogee: orbital.apogee_km,
                perigee: orbital.perigee_km,
                inclination: orbital.inclination_deg,
                period: orbital.period_s,
            },
        }
    }
}

/// The immutable per-tick aggregate and the sole unit exchanged with
/// consumers. Every field belongs to the same tick; a snapshot is replaced
/// wholesale, never partially updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub spacecraft: SpacecraftTelemetry,
    pub crew: CrewState,
    pub eclss: EclssState,
    pub power: PowerState,
    pub propulsion: PropulsionState,
    pub communications: CommsState,
    pub timeline: TimelineState,
    pub alerts: Vec<Alert>,
}

/// Borrowed view over one tick's subsystem outputs, handed to the alert
/// evaluator before the snapshot is sealed.
pub struct TelemetryFrame<'a> {
    pub spacecraft: &'a SpacecraftTelemetry,
    pub crew: &'a CrewState,
    pub eclss: &'a EclssState,
    pub power: &'a PowerState,
    pub propulsion: &'a PropulsionState,
    pub communications: &'a CommsState,
}

/// Seals one tick's outputs into a `Snapshot` and stamps the monotonically
/// increasing tick counter. Single point of assembly: all fields of a given
/// snapshot come from the one `assemble` call.
#[derive(Debug, Default)]
pub struct TelemetryAggregator {
    tick: u64,
}

impl TelemetryAggregator {
    pub fn new() -> Self {
        Self { tick: 0 }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        &mut self,
        spacecraft: SpacecraftTelemetry,
        crew: CrewState,
        eclss: EclssState,
        power: PowerState,
        propulsion: PropulsionState,
        communications: CommsState,
        timeline: TimelineState,
        alerts: Vec<Alert>,
    ) -> Snapshot {
        self.tick += 1;
        Snapshot {
            tick: self.tick,
            spacecraft,
            crew,
            eclss,
            power,
            propulsion,
            communications,
            timeline,
            alerts,
        }
    }
}
