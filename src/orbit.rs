use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const EARTH_MU: f64 = 398_600.4418; // km^3/s^2
pub const EARTH_RADIUS_KM: f64 = 6_371.0;
pub const MOON_MU: f64 = 4_902.8; // km^3/s^2
pub const MOON_RADIUS_KM: f64 = 1_737.4;
pub const EARTH_MOON_DISTANCE_KM: f64 = 384_400.0;
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

const MOON_SIDEREAL_PERIOD_S: f64 = 27.321_661 * 86_400.0;
const MOON_PLANE_TILT_DEG: f64 = 5.145;

const KEPLER_TOLERANCE: f64 = 1e-8;
const KEPLER_MAX_ITERATIONS: u32 = 100;
// Below this eccentricity the anomaly solve is skipped entirely and the
// spacecraft advances at the uniform circular rate.
const CIRCULAR_ECCENTRICITY_FLOOR: f64 = 1e-6;

// Fixed inertial sun line for illumination and eclipse geometry. A true
// ephemeris is out of scope; a constant direction is enough to drive the
// power model and day/night cycling in the parking orbit.
const SUN_DIRECTION: Vec3 = Vec3 {
    x: 1.0,
    y: 0.0,
    z: 0.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn sub(&self, other: &Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

/// One leg of the piecewise trajectory profile. Each leg is a fixed Kepler
/// ellipse; the active leg is selected by mission elapsed time.
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryPhase {
    pub name: &'static str,
    pub start_s: f64,
    pub semi_major_axis_km: f64,
    pub eccentricity: f64,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub arg_periapsis_deg: f64,
    /// Mean anomaly when the leg becomes active, degrees. The trans-lunar
    /// leg starts at periapsis (injection burn); the return leg starts at
    /// apoapsis (lunar flyby).
    pub mean_anomaly_epoch_deg: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrbitalState {
    pub position_km: Vec3,
    pub velocity_km_s: Vec3,
    pub altitude_km: f64,
    pub distance_earth_km: f64,
    pub distance_moon_km: f64,
    pub apogee_km: f64,
    pub perigee_km: f64,
    pub inclination_deg: f64,
    pub period_s: f64,
    pub sun_angle_deg: f64,
    pub in_eclipse: bool,
    pub phase_name: String,
}

#[derive(Debug, Error)]
pub enum PropagationError {
    #[error(
        "Kepler solve failed to converge after {iterations} iterations \
         (M={mean_anomaly:.6} rad, e={eccentricity:.6})"
    )]
    KeplerDivergence {
        mean_anomaly: f64,
        eccentricity: f64,
        iterations: u32,
    },
}

/// Converts mission elapsed time into an internally consistent orbital state
/// along a fixed piecewise trajectory.
#[derive(Debug, Clone)]
pub struct OrbitalPropagator {
    phases: Vec<TrajectoryPhase>,
}

impl OrbitalPropagator {
    /// The nominal ten-day crewed lunar free-return profile: two hours in a
    /// low parking orbit, trans-lunar coast out to the Moon, flyby at ~100 h,
    /// then the return leg.
    pub fn new() -> Self {
        Self::with_profile(vec![
            TrajectoryPhase {
                name: "LEO Parking Orbit",
                start_s: 0.0,
                semi_major_axis_km: EARTH_RADIUS_KM + 192.5,
                eccentricity: 0.001_14,
                inclination_deg: 28.5,
                raan_deg: 0.0,
                arg_periapsis_deg: 0.0,
                mean_anomaly_epoch_deg: 0.0,
            },
            // Near the lunar orbit plane, apoapsis aimed where the Moon
            // will be at the ~100 h flyby.
            TrajectoryPhase {
                name: "Trans-Lunar Coast",
                start_s: 7_200.0,
                semi_major_axis_km: 195_485.5,
                eccentricity: 0.966_39,
                inclination_deg: 5.145,
                raan_deg: 0.0,
                arg_periapsis_deg: 234.4,
                mean_anomaly_epoch_deg: 0.0,
            },
            // Return leg picks up at apoapsis during the flyby and falls
            // back to a 62 km entry perigee.
            TrajectoryPhase {
                name: "Trans-Earth Coast",
                start_s: 360_000.0,
                semi_major_axis_km: 215_230.0,
                eccentricity: 0.970_11,
                inclination_deg: 5.145,
                raan_deg: 0.0,
                arg_periapsis_deg: 235.0,
                mean_anomaly_epoch_deg: 180.0,
            },
        ])
    }

    pub fn with_profile(phases: Vec<TrajectoryPhase>) -> Self {
        assert!(!phases.is_empty(), "trajectory profile needs at least one phase");
        Self { phases }
    }

    fn phase_at(&self, met_s: f64) -> &TrajectoryPhase {
        self.phases
            .iter()
            .rev()
            .find(|phase| met_s >= phase.start_s)
            .unwrap_or(&self.phases[0])
    }

    pub fn propagate(&self, elapsed: Duration) -> Result<OrbitalState, PropagationError> {
        let met_s = elapsed.as_secs_f64();
        let phase = self.phase_at(met_s);

        let a = phase.semi_major_axis_km;
        let e = phase.eccentricity;
        let mean_motion = (EARTH_MU / (a * a * a)).sqrt();
        let period_s = std::f64::consts::TAU / mean_motion;

        let mean_anomaly = (phase.mean_anomaly_epoch_deg.to_radians()
            + mean_motion * (met_s - phase.start_s))
            .rem_euclid(std::f64::consts::TAU);

        // Circular legs advance at the uniform angular rate; anything else
        // goes through the Newton-Raphson anomaly solve.
        let ecc_anomaly = if e < CIRCULAR_ECCENTRICITY_FLOOR {
            mean_anomaly
        } else {
            solve_kepler(mean_anomaly, e)?
        };

        let true_anomaly = 2.0
            * ((1.0 + e).sqrt() * (ecc_anomaly / 2.0).sin())
                .atan2((1.0 - e).sqrt() * (ecc_anomaly / 2.0).cos());
        let radius = a * (1.0 - e * ecc_anomaly.cos());

        // Perifocal position and its time derivative; the derivative form
        // keeps the speed consistent with vis-viva by construction.
        let semi_latus = a * (1.0 - e * e);
        let velocity_scale = (EARTH_MU / semi_latus).sqrt();
        let position_pf = Vec3::new(
            radius * true_anomaly.cos(),
            radius * true_anomaly.sin(),
            0.0,
        );
        let velocity_pf = Vec3::new(
            -velocity_scale * true_anomaly.sin(),
            velocity_scale * (e + true_anomaly.cos()),
            0.0,
        );

        let position_km = rotate_perifocal(
            &position_pf,
            phase.arg_periapsis_deg.to_radians(),
            phase.inclination_deg.to_radians(),
            phase.raan_deg.to_radians(),
        );
        let velocity_km_s = rotate_perifocal(
            &velocity_pf,
            phase.arg_periapsis_deg.to_radians(),
            phase.inclination_deg.to_radians(),
            phase.raan_deg.to_radians(),
        );

        let distance_earth_km = position_km.norm();
        let distance_moon_km = position_km.sub(&moon_position(met_s)).norm();

        let sun_cos =
            (position_km.dot(&SUN_DIRECTION) / distance_earth_km).clamp(-1.0, 1.0);
        let sun_angle_deg = sun_cos.acos().to_degrees();
        // Cylindrical shadow test: night side of Earth and inside the
        // shadow cylinder radius.
        let off_axis_km = distance_earth_km * (1.0 - sun_cos * sun_cos).max(0.0).sqrt();
        let in_eclipse = sun_cos < 0.0 && off_axis_km < EARTH_RADIUS_KM;

        let state = OrbitalState {
            position_km,
            velocity_km_s,
            altitude_km: distance_earth_km - EARTH_RADIUS_KM,
            distance_earth_km,
            distance_moon_km,
            apogee_km: (a * (1.0 + e) - EARTH_RADIUS_KM).max(0.0),
            perigee_km: (a * (1.0 - e) - EARTH_RADIUS_KM).max(0.0),
            inclination_deg: phase.inclination_deg,
            period_s,
            sun_angle_deg,
            in_eclipse,
            phase_name: phase.name.to_string(),
        };

        debug_assert!(
            state.apogee_km >= state.perigee_km && state.perigee_km >= 0.0,
            "apsis ordering violated: apogee {} < perigee {}",
            state.apogee_km,
            state.perigee_km
        );

        Ok(state)
    }
}

impl Default for OrbitalPropagator {
    fn default() -> Self {
        Self::new()
    }
}

/// Simplified Moon ephemeris: a circular orbit of the mean Earth-Moon
/// distance in a plane tilted off the reference equator. Only consumed for
/// the Euclidean distance-to-Moon figure.
pub fn moon_position(met_s: f64) -> Vec3 {
    let angle = std::f64::consts::TAU * met_s / MOON_SIDEREAL_PERIOD_S;
    let tilt = MOON_PLANE_TILT_DEG.to_radians();
    Vec3::new(
        EARTH_MOON_DISTANCE_KM * angle.cos(),
        EARTH_MOON_DISTANCE_KM * angle.sin() * tilt.cos(),
        EARTH_MOON_DISTANCE_KM * angle.sin() * tilt.sin(),
    )
}

/// Newton-Raphson solve of Kepler's equation `M = E - e sin E` for the
/// eccentric anomaly. The apoapsis starting guess keeps the iteration stable
/// on the near-parabolic trans-lunar legs.
fn solve_kepler(mean_anomaly: f64, eccentricity: f64) -> Result<f64, PropagationError> {
    let mut ecc_anomaly = if eccentricity > 0.8 {
        std::f64::consts::PI
    } else {
        mean_anomaly
    };

    for _ in 0..KEPLER_MAX_ITERATIONS {
        let residual = ecc_anomaly - eccentricity * ecc_anomaly.sin() - mean_anomaly;
        let derivative = 1.0 - eccentricity * ecc_anomaly.cos();
        let delta = residual / derivative;
        ecc_anomaly -= delta;
        if delta.abs() < KEPLER_TOLERANCE {
            return Ok(ecc_anomaly);
        }
    }

    Err(PropagationError::KeplerDivergence {
        mean_anomaly,
        eccentricity,
        iterations: KEPLER_MAX_ITERATIONS,
    })
}

/// Rotate a perifocal-frame vector into the inertial frame via argument of
/// periapsis, inclination, and RAAN.
fn rotate_perifocal(v: &Vec3, arg_periapsis: f64, inclination: f64, raan: f64) -> Vec3 {
    let (sin_w, cos_w) = arg_periapsis.sin_cos();
    let (sin_i, cos_i) = inclination.sin_cos();
    let (sin_o, cos_o) = raan.sin_cos();

    Vec3::new(
        (cos_o * cos_w - sin_o * sin_w * cos_i) * v.x
            + (-cos_o * sin_w - sin_o * cos_w * cos_i) * v.y,
        (sin_o * cos_w + cos_o * sin_w * cos_i) * v.x
            + (-sin_o * sin_w + cos_o * cos_w * cos_i) * v.y,
        (sin_w * sin_i) * v.x + (cos_w * sin_i) * v.y,
    )
}
