use super::{approach, reverting_walk, SubsystemModel, TickContext};
use crate::clock::MissionClock;
use crate::timeline::EventKind;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const RCS_THRUSTER_COUNT: usize = 24;

const ENGINE_THRUST_N: f64 = 26_600.0;
const ENGINE_ISP_S: f64 = 316.0;
const ENGINE_TEMP_IDLE_C: f64 = 24.0;
const ENGINE_TEMP_FIRING_C: f64 = 385.0;
const ENGINE_TEMP_RATE_C_PER_S: f64 = 9.0;
const CHAMBER_PRESSURE_IDLE_PSI: f64 = 110.0;
const CHAMBER_PRESSURE_FIRING_PSI: f64 = 262.0;
const CHAMBER_PRESSURE_RATE_PSI_PER_S: f64 = 14.0;

const HYDRAZINE_INITIAL_KG: f64 = 262.0;
const MON_INITIAL_KG: f64 = 238.0;
const TOTAL_DELTA_V_MPS: f64 = 1_450.0;
const MAIN_BURN_HYDRAZINE_KG_PER_S: f64 = 0.30;
const MAIN_BURN_MON_KG_PER_S: f64 = 0.35;
const RCS_PULSE_PROPELLANT_KG: f64 = 0.012;

// Quad prefixes for thruster ids: forward, aft, left, right.
const QUAD_PREFIXES: [char; 4] = ['F', 'A', 'L', 'R'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineStatus {
    Ready,
    Firing,
    Safed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThrusterStatus {
    Active,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainEngine {
    pub status: EngineStatus,
    pub thrust: f64,
    pub specific_impulse: f64,
    pub temperature: f64,
    pub chamber_pressure: f64,
    pub total_burn_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcsThruster {
    pub thruster_id: String,
    pub status: ThrusterStatus,
    pub firing_count: u32,
    pub propellant_used: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fuel {
    pub hydrazine: f64,
    pub mon_oxidizer: f64,
    pub total_delta_v: f64,
    pub used_delta_v: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingBurn {
    pub name: String,
    pub met: String,
    pub duration: f64,
    pub delta_v: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropulsionState {
    pub main_engine: MainEngine,
    pub rcs_thrusters: Vec<RcsThruster>,
    pub fuel: Fuel,
    pub upcoming_burns: Vec<UpcomingBurn>,
}

#[derive(Debug, Clone)]
struct Thruster {
    id: String,
    enabled: bool,
    firing_count: u32,
    propellant_used: f64,
}

/// Service module propulsion: the main engine fires whenever the flight plan
/// has a burn in progress; the RCS quads pulse continuously for attitude
/// hold. Delta-v bookkeeping follows the flight plan rather than integrating
/// thrust, so it stays exact across ticks.
#[derive(Debug, Clone)]
pub struct PropulsionSystem {
    engine_temperature: f64,
    chamber_pressure: f64,
    hydrazine_kg: f64,
    mon_kg: f64,
    thrusters: Vec<Thruster>,
}

impl PropulsionSystem {
    pub fn new() -> Self {
        let thrusters = (0..RCS_THRUSTER_COUNT)
            .map(|index| Thruster {
                id: format!(
                    "{}{}",
                    QUAD_PREFIXES[index / (RCS_THRUSTER_COUNT / QUAD_PREFIXES.len())],
                    index % (RCS_THRUSTER_COUNT / QUAD_PREFIXES.len()) + 1
                ),
                enabled: true,
                firing_count: 0,
                propellant_used: 0.0,
            })
            .collect();

        Self {
            engine_temperature: ENGINE_TEMP_IDLE_C,
            chamber_pressure: CHAMBER_PRESSURE_IDLE_PSI,
            hydrazine_kg: HYDRAZINE_INITIAL_KG,
            mon_kg: MON_INITIAL_KG,
            thrusters,
        }
    }

    /// Ground-test override: take one RCS thruster offline.
    pub fn disable_thruster(&mut self, index: usize) {
        if let Some(thruster) = self.thrusters.get_mut(index) {
            thruster.enabled = false;
        }
    }
}

impl SubsystemModel for PropulsionSystem {
    type State = PropulsionState;

    fn update(&mut self, ctx: &mut TickContext<'_>) -> Self::State {
        let active_burn = ctx.timeline.active_burn(ctx.met_s);
        let firing = active_burn.is_some();

        let (temp_target, pressure_target) = if firing {
            (ENGINE_TEMP_FIRING_C, CHAMBER_PRESSURE_FIRING_PSI)
        } else {
            (ENGINE_TEMP_IDLE_C, CHAMBER_PRESSURE_IDLE_PSI)
        };
        self.engine_temperature = approach(
            self.engine_temperature,
            temp_target,
            ENGINE_TEMP_RATE_C_PER_S,
            ctx.dt_s,
        );
        self.chamber_pressure = approach(
            self.chamber_pressure,
            pressure_target,
            CHAMBER_PRESSURE_RATE_PSI_PER_S,
            ctx.dt_s,
        );

        if firing {
            self.hydrazine_kg =
                (self.hydrazine_kg - MAIN_BURN_HYDRAZINE_KG_PER_S * ctx.dt_s).max(0.0);
            self.mon_kg = (self.mon_kg - MAIN_BURN_MON_KG_PER_S * ctx.dt_s).max(0.0);
        }

        // Attitude-hold pulses. Firing probability scales with tick length so
        // the pulse rate is cadence-independent.
        let pulse_probability = (0.2 * ctx.dt_s).clamp(0.0, 1.0);
        for thruster in self.thrusters.iter_mut().filter(|t| t.enabled) {
            if ctx.rng.gen_bool(pulse_probability) {
                thruster.firing_count = thruster.firing_count.saturating_add(1);
                thruster.propellant_used += RCS_PULSE_PROPELLANT_KG;
                self.hydrazine_kg = (self.hydrazine_kg - RCS_PULSE_PROPELLANT_KG).max(0.0);
            }
        }

        // Burn-time and delta-v ledgers derive from the flight plan: sum of
        // finished burns plus the in-progress fraction.
        let mut total_burn_time = 0.0;
        let mut used_delta_v = 0.0;
        for event in ctx.timeline.burns() {
            if let EventKind::Burn { delta_v_mps } = event.kind {
                let burn_end = event.met_s + event.duration_s;
                if ctx.met_s >= burn_end {
                    total_burn_time += event.duration_s;
                    used_delta_v += delta_v_mps;
                } else if ctx.met_s > event.met_s {
                    let fraction = (ctx.met_s - event.met_s) / event.duration_s;
                    total_burn_time += event.duration_s * fraction;
                    used_delta_v += delta_v_mps * fraction;
                }
            }
        }

        let thrust = if firing {
            ENGINE_THRUST_N * ctx.rng.gen_range(0.985..=1.015)
        } else {
            0.0
        };
        let specific_impulse = reverting_walk(
            ctx.rng,
            ENGINE_ISP_S,
            ENGINE_ISP_S,
            0.0,
            0.4,
            ENGINE_ISP_S - 2.0,
            ENGINE_ISP_S + 2.0,
        );

        let upcoming_burns = ctx
            .timeline
            .upcoming_burns(ctx.met_s)
            .into_iter()
            .filter_map(|event| match event.kind {
                EventKind::Burn { delta_v_mps } => Some(UpcomingBurn {
                    name: event.name.to_string(),
                    met: MissionClock::format_met(Duration::from_secs_f64(event.met_s)),
                    duration: event.duration_s,
                    delta_v: delta_v_mps,
                }),
                EventKind::Milestone => None,
            })
            .collect();

        PropulsionState {
            main_engine: MainEngine {
                status: if firing {
                    EngineStatus::Firing
                } else {
                    EngineStatus::Ready
                },
                thrust,
                specific_impulse,
                temperature: self.engine_temperature,
                chamber_pressure: self.chamber_pressure,
                total_burn_time,
            },
            rcs_thrusters: self
                .thrusters
                .iter()
                .map(|thruster| RcsThruster {
                    thruster_id: thruster.id.clone(),
                    status: if thruster.enabled {
                        ThrusterStatus::Active
                    } else {
                        ThrusterStatus::Disabled
                    },
                    firing_count: thruster.firing_count,
                    propellant_used: thruster.propellant_used,
                })
                .collect(),
            fuel: Fuel {
                hydrazine: self.hydrazine_kg,
                mon_oxidizer: self.mon_kg,
                total_delta_v: TOTAL_DELTA_V_MPS,
                used_delta_v,
            },
            upcoming_burns,
        }
    }
}

impl Default for PropulsionSystem {
    fn default() -> Self {
        Self::new()
    }
}
