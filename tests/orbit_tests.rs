use orionsim::orbit::{
    moon_position, OrbitalPropagator, TrajectoryPhase, EARTH_MU, EARTH_MOON_DISTANCE_KM,
    EARTH_RADIUS_KM,
};
use std::time::Duration;

/// A single-phase profile for closed-orbit checks.
fn single_orbit(apogee_alt_km: f64, perigee_alt_km: f64) -> OrbitalPropagator {
    let ra = EARTH_RADIUS_KM + apogee_alt_km;
    let rp = EARTH_RADIUS_KM + perigee_alt_km;
    OrbitalPropagator::with_profile(vec![TrajectoryPhase {
        name: "Test Orbit",
        start_s: 0.0,
        semi_major_axis_km: (ra + rp) / 2.0,
        eccentricity: (ra - rp) / (ra + rp),
        inclination_deg: 28.5,
        raan_deg: 0.0,
        arg_periapsis_deg: 0.0,
        mean_anomaly_epoch_deg: 0.0,
    }])
}

#[cfg(test)]
mod apsis_tests {
    use super::*;

    #[test]
    fn test_apogee_never_below_perigee() {
        let propagator = OrbitalPropagator::new();

        // Sample the full ten-day mission at one-hour steps, crossing every
        // phase boundary.
        for hour in 0..240 {
            let state = propagator
                .propagate(Duration::from_secs(hour * 3_600))
                .unwrap();
            assert!(
                state.apogee_km >= state.perigee_km,
                "t={}h: apogee {} < perigee {}",
                hour,
                state.apogee_km,
                state.perigee_km
            );
            assert!(state.perigee_km >= 0.0);
        }
    }

    #[test]
    fn test_period_follows_semi_major_axis() {
        let propagator = single_orbit(250.0, 200.0);
        let state = propagator.propagate(Duration::ZERO).unwrap();

        let a = (state.apogee_km + state.perigee_km) / 2.0 + EARTH_RADIUS_KM;
        let expected = std::f64::consts::TAU * (a.powi(3) / EARTH_MU).sqrt();
        assert!((state.period_s - expected).abs() < 1e-6);
    }
}

#[cfg(test)]
mod vis_viva_tests {
    use super::*;

    #[test]
    fn test_velocity_consistent_with_vis_viva() {
        let propagator = OrbitalPropagator::new();

        for hour in [0, 1, 3, 10, 50, 99, 101, 150, 239] {
            let state = propagator
                .propagate(Duration::from_secs(hour * 3_600))
                .unwrap();

            let r = state.distance_earth_km;
            let a = (state.apogee_km + state.perigee_km) / 2.0 + EARTH_RADIUS_KM;
            let v_squared = state.velocity_km_s.dot(&state.velocity_km_s);
            let expected = EARTH_MU * (2.0 / r - 1.0 / a);

            let relative_error = (v_squared - expected).abs() / expected;
            assert!(
                relative_error < 1e-6,
                "t={}h: v^2={} expected={} (rel err {})",
                hour,
                v_squared,
                expected,
                relative_error
            );
        }
    }
}

#[cfg(test)]
mod periodicity_tests {
    use super::*;

    #[test]
    fn test_one_full_period_returns_to_start() {
        let propagator = single_orbit(250.0, 200.0);

        let start = propagator.propagate(Duration::ZERO).unwrap();
        let after_period = propagator
            .propagate(Duration::from_secs_f64(start.period_s))
            .unwrap();

        let displacement = start
            .position_km
            .sub(&after_period.position_km)
            .norm();
        assert!(
            displacement < 1.0,
            "spacecraft {} km from start after one period",
            displacement
        );
    }

    #[test]
    fn test_half_period_reaches_apogee() {
        let propagator = single_orbit(250.0, 200.0);
        let start = propagator.propagate(Duration::ZERO).unwrap();

        let state = propagator
            .propagate(Duration::from_secs_f64(start.period_s / 2.0))
            .unwrap();
        assert!((state.altitude_km - 250.0).abs() < 1.0);
    }
}

#[cfg(test)]
mod solver_tests {
    use super::*;

    #[test]
    fn test_circular_orbit_bypasses_solver() {
        let propagator = OrbitalPropagator::with_profile(vec![TrajectoryPhase {
            name: "Circular",
            start_s: 0.0,
            semi_major_axis_km: EARTH_RADIUS_KM + 400.0,
            eccentricity: 0.0,
            inclination_deg: 51.6,
            raan_deg: 0.0,
            arg_periapsis_deg: 0.0,
            mean_anomaly_epoch_deg: 0.0,
        }]);

        let expected_speed = (EARTH_MU / (EARTH_RADIUS_KM + 400.0)).sqrt();
        for minute in 0..95 {
            let state = propagator
                .propagate(Duration::from_secs(minute * 60))
                .unwrap();
            assert!((state.altitude_km - 400.0).abs() < 1e-6);
            let speed = state.velocity_km_s.dot(&state.velocity_km_s).sqrt();
            assert!((speed - expected_speed).abs() < 1e-9);
        }
    }

    #[test]
    fn test_high_eccentricity_converges() {
        // The trans-lunar legs run e ~ 0.966; every sample must converge
        // inside the iteration cap.
        let propagator = OrbitalPropagator::new();
        for hour in 2..240 {
            assert!(propagator
                .propagate(Duration::from_secs(hour * 3_600))
                .is_ok());
        }
    }
}

#[cfg(test)]
mod moon_tests {
    use super::*;

    #[test]
    fn test_moon_stays_at_mean_distance() {
        for day in 0..28 {
            let distance = moon_position(day as f64 * 86_400.0).norm();
            assert!((distance - EARTH_MOON_DISTANCE_KM).abs() < 1.0);
        }
    }

    #[test]
    fn test_moon_distance_shrinks_toward_flyby() {
        let propagator = OrbitalPropagator::new();

        let early = propagator.propagate(Duration::from_secs(3 * 3_600)).unwrap();
        let near_flyby = propagator
            .propagate(Duration::from_secs(99 * 3_600))
            .unwrap();

        assert!(near_flyby.distance_moon_km < early.distance_moon_km);
    }
}
