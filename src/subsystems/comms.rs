use super::{bounded_walk, reverting_walk, SubsystemModel, TickContext};
use crate::clock::MissionClock;
use crate::orbit::SPEED_OF_LIGHT_KM_S;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// Ground stations hand over on a fixed rotation as the Earth turns.
const DSN_STATIONS: [&str; 3] = ["Goldstone", "Madrid", "Canberra"];
const DSN_PASS_DURATION_S: f64 = 28_800.0;

const UPLINK_FREQ_MHZ: f64 = 2_106.4;
const DOWNLINK_FREQ_MHZ: f64 = 2_287.5;

// Free-space path loss reference: signal at 1000 km range, falling 20 dB per
// decade of distance.
const SIGNAL_AT_REFERENCE_DBM: f64 = -60.0;
const SIGNAL_REFERENCE_KM: f64 = 1_000.0;
const SIGNAL_FLOOR_DBM: f64 = -130.0;

const TELEMETRY_RATE_PPS: (f64, f64) = (40.0, 110.0);
const MESSAGE_QUEUE_MAX: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactStatus {
    Active,
    Scheduled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DsnContact {
    pub station: String,
    pub status: ContactStatus,
    pub signal_strength: f64,
    pub data_rate: f64,
    pub uplink_freq: f64,
    pub downlink_freq: f64,
    pub acquisition_time: String,
    pub loss_of_signal: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentDownlink {
    pub video: bool,
    pub telemetry: f64,
    pub voice: bool,
    pub delay: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommsState {
    pub dsn_contacts: Vec<DsnContact>,
    pub current_downlink: CurrentDownlink,
    pub message_queue: u8,
}

/// Deep space network link simulator. Signal strength follows free-space
/// path loss against the Earth range from the orbital state; the data rate
/// adapts to the link quality the way a real scheduler steps modulation.
#[derive(Debug, Clone)]
pub struct CommsSystem {
    signal_strength: f64,
    telemetry_pps: f64,
    message_queue: f64,
    video: bool,
    voice: bool,
}

impl CommsSystem {
    pub fn new() -> Self {
        Self {
            signal_strength: -80.0,
            telemetry_pps: 80.0,
            message_queue: 2.0,
            video: false,
            voice: true,
        }
    }

    fn path_loss_signal(distance_km: f64) -> f64 {
        let ratio = (distance_km / SIGNAL_REFERENCE_KM).max(1e-3);
        SIGNAL_AT_REFERENCE_DBM - 20.0 * ratio.log10()
    }

    fn data_rate_for(signal_dbm: f64) -> f64 {
        if signal_dbm > -90.0 {
            4.0
        } else if signal_dbm > -105.0 {
            2.0
        } else {
            1.0
        }
    }
}

impl SubsystemModel for CommsSystem {
    type State = CommsState;

    fn update(&mut self, ctx: &mut TickContext<'_>) -> Self::State {
        let nominal_signal = Self::path_loss_signal(ctx.orbital.distance_earth_km);
        self.signal_strength = reverting_walk(
            ctx.rng,
            self.signal_strength,
            nominal_signal,
            0.1,
            0.4,
            SIGNAL_FLOOR_DBM,
            SIGNAL_AT_REFERENCE_DBM,
        );
        let data_rate = Self::data_rate_for(self.signal_strength);

        self.telemetry_pps = reverting_walk(
            ctx.rng,
            self.telemetry_pps,
            80.0,
            0.02,
            1.0,
            TELEMETRY_RATE_PPS.0,
            TELEMETRY_RATE_PPS.1,
        );
        self.message_queue = bounded_walk(ctx.rng, self.message_queue, 0.2, 0.0, MESSAGE_QUEUE_MAX);
        // Video needs the high-rate link; voice drops out only on a weak one.
        if ctx.rng.gen_bool(0.002) {
            self.video = !self.video && data_rate >= 4.0;
            self.voice = self.signal_strength > -110.0;
        }
        if data_rate < 4.0 {
            self.video = false;
        }

        // Station rotation with AOS/LOS bracketing the current pass.
        let pass_index = (ctx.met_s / DSN_PASS_DURATION_S) as usize;
        let pass_start = pass_index as f64 * DSN_PASS_DURATION_S;
        let active_station = DSN_STATIONS[pass_index % DSN_STATIONS.len()];
        let next_station = DSN_STATIONS[(pass_index + 1) % DSN_STATIONS.len()];

        let dsn_contacts = vec![
            DsnContact {
                station: active_station.to_string(),
                status: ContactStatus::Active,
                signal_strength: self.signal_strength,
                data_rate,
                uplink_freq: UPLINK_FREQ_MHZ,
                downlink_freq: DOWNLINK_FREQ_MHZ,
                acquisition_time: MissionClock::format_met(Duration::from_secs_f64(pass_start)),
                loss_of_signal: MissionClock::format_met(Duration::from_secs_f64(
                    pass_start + DSN_PASS_DURATION_S,
                )),
            },
            DsnContact {
                station: next_station.to_string(),
                status: ContactStatus::Scheduled,
                signal_strength: SIGNAL_FLOOR_DBM,
                data_rate: 0.0,
                uplink_freq: UPLINK_FREQ_MHZ,
                downlink_freq: DOWNLINK_FREQ_MHZ,
                acquisition_time: MissionClock::format_met(Duration::from_secs_f64(
                    pass_start + DSN_PASS_DURATION_S,
                )),
                loss_of_signal: MissionClock::format_met(Duration::from_secs_f64(
                    pass_start + 2.0 * DSN_PASS_DURATION_S,
                )),
            },
        ];

        CommsState {
            dsn_contacts,
            current_downlink: CurrentDownlink {
                video: self.video,
                telemetry: self.telemetry_pps,
                voice: self.voice,
                delay: ctx.orbital.distance_earth_km / SPEED_OF_LIGHT_KM_S,
            },
            message_queue: self.message_queue.round() as u8,
        }
    }
}

impl Default for CommsSystem {
    fn default() -> Self {
        Self::new()
    }
}
