use super::{reverting_walk, SubsystemModel, TickContext};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const CREW_SIZE: usize = 4;

// Physiological clip bounds. Vitals are clipped to these after every
// perturbation, never only at generation.
const HEART_RATE_BPM: (f64, f64) = (40.0, 180.0);
const SYSTOLIC_MMHG: (f64, f64) = (90.0, 180.0);
const DIASTOLIC_MMHG: (f64, f64) = (50.0, 110.0);
const SPO2_PERCENT: (f64, f64) = (85.0, 100.0);
const BODY_TEMP_C: (f64, f64) = (35.0, 40.0);
const SLEEP_HOURS: (f64, f64) = (0.0, 12.0);

const BASELINE_PULL: f64 = 0.02;
// Galactic cosmic ray background in deep space, mSv per day.
const RADIATION_RATE_MSV_PER_DAY: f64 = 0.5;

const ROSTER: [(&str, &str); CREW_SIZE] = [
    ("Reid Wiseman", "Commander"),
    ("Victor Glover", "Pilot"),
    ("Christina Koch", "Mission Specialist 1"),
    ("Jeremy Hansen", "Mission Specialist 2"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vitals {
    pub heart_rate: u16,
    pub blood_pressure: String,
    pub oxygen_saturation: u8,
    pub temperature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewMemberState {
    pub name: String,
    pub role: String,
    pub vitals: Vitals,
    pub radiation_exposure: f64,
    pub sleep_hours_last_24h: f64,
    pub exercise_compliance: bool,
}

pub type CrewState = Vec<CrewMemberState>;

#[derive(Debug, Clone)]
struct MemberVitals {
    heart_rate: f64,
    systolic: f64,
    diastolic: f64,
    oxygen_saturation: f64,
    temperature: f64,
    sleep_hours: f64,
    exercise_compliance: bool,
    // Small fixed spread so members accumulate dose at slightly different
    // rates behind different amounts of shielding.
    dose_factor: f64,
}

/// Vitals simulator for the fixed four-member roster.
#[derive(Debug, Clone)]
pub struct CrewSystem {
    members: Vec<MemberVitals>,
}

impl CrewSystem {
    pub fn new() -> Self {
        let members = (0..CREW_SIZE)
            .map(|index| MemberVitals {
                heart_rate: 68.0 + index as f64 * 2.5,
                systolic: 118.0 + index as f64 * 1.5,
                diastolic: 76.0 + index as f64,
                oxygen_saturation: 98.0,
                temperature: 36.8 + index as f64 * 0.05,
                sleep_hours: 7.2 + index as f64 * 0.2,
                exercise_compliance: true,
                dose_factor: 0.95 + index as f64 * 0.03,
            })
            .collect();
        Self { members }
    }

    /// Ground-test override: force a heart rate reading through the normal
    /// evaluate path. Clipped like any other update.
    pub fn set_heart_rate(&mut self, index: usize, bpm: f64) {
        if let Some(member) = self.members.get_mut(index) {
            member.heart_rate = bpm.clamp(HEART_RATE_BPM.0, HEART_RATE_BPM.1);
        }
    }

    fn member_state(member: &MemberVitals, index: usize, met_s: f64) -> CrewMemberState {
        let (name, role) = ROSTER[index];
        let elapsed_days = met_s / 86_400.0;

        CrewMemberState {
            name: name.to_string(),
            role: role.to_string(),
            vitals: Vitals {
                heart_rate: member.heart_rate.round() as u16,
                blood_pressure: format!(
                    "{}/{}",
                    member.systolic.round() as u16,
                    member.diastolic.round() as u16
                ),
                oxygen_saturation: member.oxygen_saturation.round() as u8,
                temperature: (member.temperature * 10.0).round() / 10.0,
            },
            radiation_exposure: elapsed_days * RADIATION_RATE_MSV_PER_DAY * member.dose_factor,
            sleep_hours_last_24h: (member.sleep_hours * 10.0).round() / 10.0,
            exercise_compliance: member.exercise_compliance,
        }
    }
}

impl SubsystemModel for CrewSystem {
    type State = CrewState;

    fn update(&mut self, ctx: &mut TickContext<'_>) -> Self::State {
        for member in &mut self.members {
            member.heart_rate = reverting_walk(
                ctx.rng,
                member.heart_rate,
                72.0,
                BASELINE_PULL,
                1.2,
                HEART_RATE_BPM.0,
                HEART_RATE_BPM.1,
            );
            member.systolic = reverting_walk(
                ctx.rng,
                member.systolic,
                120.0,
                BASELINE_PULL,
                0.9,
                SYSTOLIC_MMHG.0,
                SYSTOLIC_MMHG.1,
            );
            member.diastolic = reverting_walk(
                ctx.rng,
                member.diastolic,
                78.0,
                BASELINE_PULL,
                0.7,
                DIASTOLIC_MMHG.0,
                DIASTOLIC_MMHG.1,
            );
            member.oxygen_saturation = reverting_walk(
                ctx.rng,
                member.oxygen_saturation,
                98.0,
                BASELINE_PULL,
                0.2,
                SPO2_PERCENT.0,
                SPO2_PERCENT.1,
            );
            member.temperature = reverting_walk(
                ctx.rng,
                member.temperature,
                36.9,
                BASELINE_PULL,
                0.03,
                BODY_TEMP_C.0,
                BODY_TEMP_C.1,
            );
            member.sleep_hours = reverting_walk(
                ctx.rng,
                member.sleep_hours,
                7.4,
                0.005,
                0.03,
                SLEEP_HOURS.0,
                SLEEP_HOURS.1,
            );
            if ctx.rng.gen_bool(0.0005) {
                member.exercise_compliance = !member.exercise_compliance;
            }

            debug_assert!(
                (HEART_RATE_BPM.0..=HEART_RATE_BPM.1).contains(&member.heart_rate),
                "heart rate {} outside clip bounds",
                member.heart_rate
            );
            debug_assert!(
                (SPO2_PERCENT.0..=SPO2_PERCENT.1).contains(&member.oxygen_saturation),
                "SpO2 {} outside clip bounds",
                member.oxygen_saturation
            );
        }

        self.members
            .iter()
            .enumerate()
            .map(|(index, member)| Self::member_state(member, index, ctx.met_s))
            .collect()
    }
}

impl Default for CrewSystem {
    fn default() -> Self {
        Self::new()
    }
}
