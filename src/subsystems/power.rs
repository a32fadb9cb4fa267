use super::{approach, reverting_walk, SubsystemModel, TickContext};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const BATTERY_COUNT: usize = 4;

const ARRAY_RATED_OUTPUT_KW: f64 = 11.2;
const ARRAY_VOLTAGE_V: (f64, f64) = (112.0, 126.0);
const BATTERY_CAPACITY_KWH: f64 = 3.6;
const BATTERY_SOC_PERCENT: (f64, f64) = (0.0, 100.0);
const BATTERY_TEMP_C: (f64, f64) = (10.0, 35.0);
const PANEL_TEMP_SUNLIT_C: f64 = 62.0;
const PANEL_TEMP_ECLIPSE_C: f64 = -85.0;
const PANEL_TEMP_RATE_C_PER_S: f64 = 0.35;

// Nominal bus loads in kW.
const LOAD_LIFE_SUPPORT_KW: f64 = 3.0;
const LOAD_AVIONICS_KW: f64 = 1.8;
const LOAD_COMMS_KW: f64 = 1.2;
const LOAD_THERMAL_KW: f64 = 2.2;
const LOAD_PROPULSION_KW: f64 = 1.1;
const BURN_PROPULSION_EXTRA_KW: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatteryHealth {
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolarArrays {
    pub output_power: f64,
    pub voltage: f64,
    pub panel_temperature: f64,
    pub sun_angle: f64,
    pub degradation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryState {
    pub id: u8,
    pub state_of_charge: f64,
    pub voltage: f64,
    pub temperature: f64,
    pub health: BatteryHealth,
    pub cycles: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerConsumption {
    pub total: f64,
    pub life_support: f64,
    pub avionics: f64,
    pub communications: f64,
    pub thermal: f64,
    pub propulsion: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerBudget {
    pub available: f64,
    pub required: f64,
    pub margin: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerState {
    pub solar_arrays: SolarArrays,
    pub batteries: Vec<BatteryState>,
    pub consumption: PowerConsumption,
    pub budget: PowerBudget,
}

#[derive(Debug, Clone)]
struct Battery {
    soc: f64,
    voltage: f64,
    temperature: f64,
    cycles: u32,
    charging: bool,
}

/// Electrical power system: sun-angle-driven solar arrays, a four-battery
/// pack that charges on surplus and discharges in eclipse, and the bus load
/// ledger.
#[derive(Debug, Clone)]
pub struct PowerSystem {
    array_voltage: f64,
    panel_temperature: f64,
    degradation: f64,
    batteries: Vec<Battery>,
    load_life_support: f64,
    load_avionics: f64,
    load_comms: f64,
    load_thermal: f64,
    load_propulsion: f64,
}

impl PowerSystem {
    pub fn new() -> Self {
        Self {
            array_voltage: 120.0,
            panel_temperature: 20.0,
            degradation: 0.2,
            batteries: (0..BATTERY_COUNT)
                .map(|index| Battery {
                    soc: 90.0 - index as f64 * 1.5,
                    voltage: 31.0,
                    temperature: 18.0 + index as f64,
                    cycles: 60 + index as u32 * 12,
                    charging: true,
                })
                .collect(),
            load_life_support: LOAD_LIFE_SUPPORT_KW,
            load_avionics: LOAD_AVIONICS_KW,
            load_comms: LOAD_COMMS_KW,
            load_thermal: LOAD_THERMAL_KW,
            load_propulsion: LOAD_PROPULSION_KW,
        }
    }

    /// Ground-test override: force one battery's state of charge.
    pub fn set_battery_soc(&mut self, index: usize, percent: f64) {
        if let Some(battery) = self.batteries.get_mut(index) {
            battery.soc = percent.clamp(BATTERY_SOC_PERCENT.0, BATTERY_SOC_PERCENT.1);
        }
    }
}

impl SubsystemModel for PowerSystem {
    type State = PowerState;

    fn update(&mut self, ctx: &mut TickContext<'_>) -> Self::State {
        let dt_hours = ctx.dt_s / 3_600.0;

        // Array output follows the cosine of the sun angle from the orbital
        // geometry, zeroed in Earth shadow.
        let illumination = if ctx.orbital.in_eclipse {
            0.0
        } else {
            ctx.orbital.sun_angle_deg.to_radians().cos().max(0.0)
        };
        self.degradation = (self.degradation + 0.000_001 * ctx.dt_s).min(2.0);
        let output_power = (ARRAY_RATED_OUTPUT_KW
            * illumination
            * (1.0 - self.degradation / 100.0)
            + ctx.rng.gen_range(-0.05..=0.05))
        .max(0.0);

        self.array_voltage = if illumination > 0.0 {
            reverting_walk(
                ctx.rng,
                self.array_voltage,
                120.0,
                0.05,
                0.2,
                ARRAY_VOLTAGE_V.0,
                ARRAY_VOLTAGE_V.1,
            )
        } else {
            0.0
        };
        let panel_target = if illumination > 0.0 {
            PANEL_TEMP_SUNLIT_C * illumination
        } else {
            PANEL_TEMP_ECLIPSE_C
        };
        self.panel_temperature = approach(
            self.panel_temperature,
            panel_target,
            PANEL_TEMP_RATE_C_PER_S,
            ctx.dt_s,
        );

        // Load walks around nominal; propulsion draws extra while a burn is
        // in progress.
        self.load_life_support = reverting_walk(
            ctx.rng,
            self.load_life_support,
            LOAD_LIFE_SUPPORT_KW,
            0.02,
            0.02,
            2.4,
            3.6,
        );
        self.load_avionics = reverting_walk(
            ctx.rng,
            self.load_avionics,
            LOAD_AVIONICS_KW,
            0.02,
            0.015,
            1.4,
            2.2,
        );
        self.load_comms =
            reverting_walk(ctx.rng, self.load_comms, LOAD_COMMS_KW, 0.02, 0.015, 0.9, 1.6);
        self.load_thermal = reverting_walk(
            ctx.rng,
            self.load_thermal,
            LOAD_THERMAL_KW,
            0.02,
            0.02,
            1.7,
            2.7,
        );
        let propulsion_baseline = if ctx.timeline.active_burn(ctx.met_s).is_some() {
            LOAD_PROPULSION_KW + BURN_PROPULSION_EXTRA_KW
        } else {
            LOAD_PROPULSION_KW
        };
        self.load_propulsion = reverting_walk(
            ctx.rng,
            self.load_propulsion,
            propulsion_baseline,
            0.1,
            0.02,
            0.8,
            2.6,
        );

        let total_load = self.load_life_support
            + self.load_avionics
            + self.load_comms
            + self.load_thermal
            + self.load_propulsion;

        // Surplus charges the pack, deficit drains it, split evenly.
        let net_kw = output_power - total_load;
        let soc_delta = (net_kw / BATTERY_COUNT as f64) / BATTERY_CAPACITY_KWH * 100.0 * dt_hours;
        for battery in &mut self.batteries {
            let was_charging = battery.charging;
            battery.charging = net_kw > 0.0;
            if was_charging && !battery.charging {
                battery.cycles = battery.cycles.saturating_add(1);
            }
            battery.soc =
                (battery.soc + soc_delta).clamp(BATTERY_SOC_PERCENT.0, BATTERY_SOC_PERCENT.1);
            battery.voltage = 27.0 + battery.soc * 0.05 + ctx.rng.gen_range(-0.05..=0.05);
            battery.temperature = reverting_walk(
                ctx.rng,
                battery.temperature,
                20.0,
                0.01,
                0.05,
                BATTERY_TEMP_C.0,
                BATTERY_TEMP_C.1,
            );

            debug_assert!(
                (BATTERY_SOC_PERCENT.0..=BATTERY_SOC_PERCENT.1).contains(&battery.soc),
                "battery SOC {} outside clip bounds",
                battery.soc
            );
        }

        let required = total_load;
        let available = output_power;
        let margin = if required > 0.0 {
            (available - required) / required * 100.0
        } else {
            0.0
        };

        PowerState {
            solar_arrays: SolarArrays {
                output_power,
                voltage: self.array_voltage,
                panel_temperature: self.panel_temperature,
                sun_angle: ctx.orbital.sun_angle_deg,
                degradation: self.degradation,
            },
            batteries: self
                .batteries
                .iter()
                .enumerate()
                .map(|(index, battery)| BatteryState {
                    id: index as u8 + 1,
                    state_of_charge: battery.soc,
                    voltage: battery.voltage,
                    temperature: battery.temperature,
                    health: if battery.cycles > 400 {
                        BatteryHealth::Fair
                    } else {
                        BatteryHealth::Good
                    },
                    cycles: battery.cycles,
                })
                .collect(),
            consumption: PowerConsumption {
                total: total_load,
                life_support: self.load_life_support,
                avionics: self.load_avionics,
                communications: self.load_comms,
                thermal: self.load_thermal,
                propulsion: self.load_propulsion,
            },
            budget: PowerBudget {
                available,
                required,
                margin,
            },
        }
    }
}

impl Default for PowerSystem {
    fn default() -> Self {
        Self::new()
    }
}
