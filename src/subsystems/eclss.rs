use super::{bounded_walk, reverting_walk, SubsystemModel, TickContext};
use rand::Rng;
use serde::{Deserialize, Serialize};

// Physical clip ranges for the cabin loops.
const O2_GENERATION_KG_HR: (f64, f64) = (0.6, 1.4);
const O2_TANK_PRESSURE_PSI: (f64, f64) = (700.0, 950.0);
const O2_PARTIAL_PRESSURE_MMHG: (f64, f64) = (120.0, 185.0);
const O2_CONSUMPTION_KG_HR: (f64, f64) = (0.7, 1.3);
const CO2_LEVEL_MMHG: (f64, f64) = (0.5, 8.0);
const POTABLE_WATER_L: (f64, f64) = (0.0, 250.0);
const WASTEWATER_L: (f64, f64) = (0.0, 40.0);
const HUMIDITY_PERCENT: (f64, f64) = (25.0, 75.0);
const CABIN_PRESSURE_PSI: (f64, f64) = (12.5, 15.5);
const CABIN_TEMP_C: (f64, f64) = (17.0, 28.0);

// LiOH canister consumption while the scrubber is active.
const LIOH_USE_KG_PER_HOUR: f64 = 0.045;
const CREW_WATER_USE_L_PER_HOUR: f64 = 0.55;
const RECLAIMER_RETURN_L_PER_HOUR: f64 = 0.48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrubberStatus {
    Active,
    Standby,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OxygenLoop {
    pub generation_rate: f64,
    pub tank_pressure: f64,
    pub partial_pressure: f64,
    pub consumption_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Co2Removal {
    pub scrubber_status: ScrubberStatus,
    pub co2_level: f64,
    pub lioh_remaining: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterLoop {
    pub potable_water: f64,
    pub wastewater: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CabinEnvironment {
    pub pressure: f64,
    pub temperature: f64,
    pub air_quality_index: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EclssState {
    pub oxygen: OxygenLoop,
    pub co2_removal: Co2Removal,
    pub water: WaterLoop,
    pub cabin: CabinEnvironment,
}

/// Environmental control and life support loops: oxygen generation, CO2
/// scrubbing, water management, cabin environment.
#[derive(Debug, Clone)]
pub struct EclssSystem {
    o2_generation: f64,
    o2_tank_pressure: f64,
    o2_partial_pressure: f64,
    o2_consumption: f64,
    scrubber_status: ScrubberStatus,
    co2_level: f64,
    lioh_remaining: f64,
    potable_water: f64,
    wastewater: f64,
    humidity: f64,
    cabin_pressure: f64,
    cabin_temperature: f64,
    air_quality: f64,
}

impl EclssSystem {
    pub fn new() -> Self {
        Self {
            o2_generation: 1.0,
            o2_tank_pressure: 875.0,
            o2_partial_pressure: 160.0,
            o2_consumption: 1.0,
            scrubber_status: ScrubberStatus::Active,
            co2_level: 2.8,
            lioh_remaining: 22.0,
            potable_water: 210.0,
            wastewater: 8.0,
            humidity: 45.0,
            cabin_pressure: 14.7,
            cabin_temperature: 22.0,
            air_quality: 96.0,
        }
    }

    /// Ground-test override: force the O2 partial pressure reading. Clipped
    /// to the physical range; threshold evaluation happens downstream.
    pub fn set_o2_partial_pressure(&mut self, mmhg: f64) {
        self.o2_partial_pressure =
            mmhg.clamp(O2_PARTIAL_PRESSURE_MMHG.0, O2_PARTIAL_PRESSURE_MMHG.1);
    }

    fn state(&self) -> EclssState {
        EclssState {
            oxygen: OxygenLoop {
                generation_rate: self.o2_generation,
                tank_pressure: self.o2_tank_pressure,
                partial_pressure: self.o2_partial_pressure,
                consumption_rate: self.o2_consumption,
            },
            co2_removal: Co2Removal {
                scrubber_status: self.scrubber_status,
                co2_level: self.co2_level,
                lioh_remaining: self.lioh_remaining,
            },
            water: WaterLoop {
                potable_water: self.potable_water,
                wastewater: self.wastewater,
                humidity: self.humidity,
            },
            cabin: CabinEnvironment {
                pressure: self.cabin_pressure,
                temperature: self.cabin_temperature,
                air_quality_index: self.air_quality.round() as u8,
            },
        }
    }
}

impl SubsystemModel for EclssSystem {
    type State = EclssState;

    fn update(&mut self, ctx: &mut TickContext<'_>) -> Self::State {
        let dt_hours = ctx.dt_s / 3_600.0;

        self.o2_generation = reverting_walk(
            ctx.rng,
            self.o2_generation,
            1.0,
            0.02,
            0.01,
            O2_GENERATION_KG_HR.0,
            O2_GENERATION_KG_HR.1,
        );
        self.o2_consumption = reverting_walk(
            ctx.rng,
            self.o2_consumption,
            1.0,
            0.02,
            0.01,
            O2_CONSUMPTION_KG_HR.0,
            O2_CONSUMPTION_KG_HR.1,
        );
        // Tank bleeds down as generation draws on it; partial pressure
        // follows the generation/consumption balance.
        self.o2_tank_pressure = bounded_walk(
            ctx.rng,
            self.o2_tank_pressure - self.o2_generation * 0.02 * dt_hours,
            0.4,
            O2_TANK_PRESSURE_PSI.0,
            O2_TANK_PRESSURE_PSI.1,
        );
        self.o2_partial_pressure = reverting_walk(
            ctx.rng,
            self.o2_partial_pressure,
            160.0,
            0.01,
            0.25,
            O2_PARTIAL_PRESSURE_MMHG.0,
            O2_PARTIAL_PRESSURE_MMHG.1,
        );

        if self.scrubber_status == ScrubberStatus::Active {
            self.lioh_remaining = (self.lioh_remaining - LIOH_USE_KG_PER_HOUR * dt_hours).max(0.0);
        }
        // The scrubber drops to standby occasionally and degrades once the
        // canisters run out.
        self.scrubber_status = if self.lioh_remaining <= 0.0 {
            ScrubberStatus::Degraded
        } else if ctx.rng.gen_bool(0.001) {
            match self.scrubber_status {
                ScrubberStatus::Active => ScrubberStatus::Standby,
                _ => ScrubberStatus::Active,
            }
        } else {
            self.scrubber_status
        };
        let co2_baseline = match self.scrubber_status {
            ScrubberStatus::Active => 2.8,
            ScrubberStatus::Standby => 3.6,
            ScrubberStatus::Degraded => 5.5,
        };
        self.co2_level = reverting_walk(
            ctx.rng,
            self.co2_level,
            co2_baseline,
            0.01,
            0.05,
            CO2_LEVEL_MMHG.0,
            CO2_LEVEL_MMHG.1,
        );

        let net_water = (CREW_WATER_USE_L_PER_HOUR - RECLAIMER_RETURN_L_PER_HOUR) * dt_hours;
        self.potable_water =
            (self.potable_water - net_water).clamp(POTABLE_WATER_L.0, POTABLE_WATER_L.1);
        self.wastewater = bounded_walk(
            ctx.rng,
            self.wastewater,
            0.1,
            WASTEWATER_L.0,
            WASTEWATER_L.1,
        );
        self.humidity = reverting_walk(
            ctx.rng,
            self.humidity,
            45.0,
            0.01,
            0.3,
            HUMIDITY_PERCENT.0,
            HUMIDITY_PERCENT.1,
        );

        self.cabin_pressure = reverting_walk(
            ctx.rng,
            self.cabin_pressure,
            14.7,
            0.02,
            0.02,
            CABIN_PRESSURE_PSI.0,
            CABIN_PRESSURE_PSI.1,
        );
        self.cabin_temperature = reverting_walk(
            ctx.rng,
            self.cabin_temperature,
            22.0,
            0.02,
            0.05,
            CABIN_TEMP_C.0,
            CABIN_TEMP_C.1,
        );
        self.air_quality = reverting_walk(ctx.rng, self.air_quality, 96.0, 0.02, 0.4, 60.0, 100.0);

        debug_assert!(
            (O2_PARTIAL_PRESSURE_MMHG.0..=O2_PARTIAL_PRESSURE_MMHG.1)
                .contains(&self.o2_partial_pressure),
            "O2 partial pressure {} outside clip bounds",
            self.o2_partial_pressure
        );

        self.state()
    }
}

impl Default for EclssSystem {
    fn default() -> Self {
        Self::new()
    }
}
