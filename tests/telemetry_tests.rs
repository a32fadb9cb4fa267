use orionsim::clock::MissionClock;
use orionsim::sim::{MissionSimulator, SimConfig};
use orionsim::timeline::Timeline;
use std::time::Duration;

#[cfg(test)]
mod clock_tests {
    use super::*;

    #[test]
    fn test_met_format_is_ddd_hh_mm_ss() {
        assert_eq!(MissionClock::format_met(Duration::ZERO), "000:00:00:00");
        assert_eq!(
            MissionClock::format_met(Duration::from_secs(2 * 86_400 + 3_661)),
            "002:01:01:01"
        );
        assert_eq!(
            MissionClock::format_met(Duration::from_secs(123 * 86_400)),
            "123:00:00:00"
        );
    }

    #[test]
    fn test_elapsed_is_monotonic() {
        let clock = MissionClock::new();
        let mut previous = clock.elapsed();
        for _ in 0..100 {
            let now = clock.elapsed();
            assert!(now >= previous);
            previous = now;
        }
    }

    #[test]
    fn test_scaled_clock_runs_faster() {
        let real = MissionClock::new();
        let accelerated = MissionClock::with_scale(1_000.0);
        std::thread::sleep(Duration::from_millis(5));
        assert!(accelerated.elapsed() > real.elapsed());
    }
}

#[cfg(test)]
mod snapshot_tests {
    use super::*;

    #[test]
    fn test_tick_counter_increases_monotonically() {
        let mut sim = MissionSimulator::new(SimConfig::default());
        let first = sim.step(Duration::from_millis(100));
        let second = sim.step(Duration::from_millis(200));
        let third = sim.step(Duration::from_millis(300));

        assert_eq!(first.tick, 1);
        assert_eq!(second.tick, 2);
        assert_eq!(third.tick, 3);
    }

    #[test]
    fn test_snapshot_fields_belong_to_one_tick() {
        let mut sim = MissionSimulator::new(SimConfig::default());
        let elapsed = Duration::from_secs(10_000);
        let snapshot = sim.step(elapsed);

        // The MET string, timeline phase, and orbital data all derive from
        // the same elapsed value.
        assert_eq!(
            snapshot.spacecraft.mission_elapsed_time,
            MissionClock::format_met(elapsed)
        );
        assert_eq!(
            snapshot.timeline.current_phase,
            Timeline::new().current_phase(10_000.0)
        );
        assert!(
            snapshot.spacecraft.distance_earth
                >= snapshot.spacecraft.altitude
        );
    }

    #[test]
    fn test_snapshot_carries_full_crew() {
        let mut sim = MissionSimulator::new(SimConfig::default());
        let snapshot = sim.step(Duration::from_millis(100));

        assert_eq!(snapshot.crew.len(), 4);
        assert_eq!(snapshot.crew[0].role, "Commander");
        for member in &snapshot.crew {
            assert!(!member.name.is_empty());
        }
    }

    #[test]
    fn test_met_non_decreasing_across_snapshots() {
        let mut sim = MissionSimulator::new(SimConfig::default());
        let mut previous = String::new();
        for tick in 1..=50 {
            let snapshot = sim.step(Duration::from_millis(tick * 100));
            // Zero-padded MET strings order lexicographically.
            assert!(snapshot.spacecraft.mission_elapsed_time >= previous);
            previous = snapshot.spacecraft.mission_elapsed_time.clone();
        }
    }

    #[test]
    fn test_snapshot_round_trips_through_json() {
        let mut sim = MissionSimulator::new(SimConfig::default());
        let snapshot = sim.step(Duration::from_millis(100));

        let encoded = serde_json::to_string(snapshot.as_ref()).unwrap();
        let decoded: orionsim::Snapshot = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.tick, snapshot.tick);
        assert_eq!(decoded.crew.len(), snapshot.crew.len());
        assert_eq!(
            decoded.spacecraft.mission_elapsed_time,
            snapshot.spacecraft.mission_elapsed_time
        );
    }

    #[test]
    fn test_timeline_status_progression() {
        let timeline = Timeline::new();

        let early = timeline.state(100.0);
        assert_eq!(early.current_phase, "Ascent");
        assert_eq!(
            early.events[0].status,
            orionsim::timeline::EventStatus::InProgress
        );

        let coasting = timeline.state(20_000.0);
        assert_eq!(coasting.current_phase, "Trans-Lunar Coast");
        assert_eq!(
            coasting.events[0].status,
            orionsim::timeline::EventStatus::Complete
        );
        let next = coasting.next_major_event.expect("burns remain");
        assert_eq!(next.name, "Outbound Trajectory Correction");

        let landed = timeline.state(900_000.0);
        assert!(landed.next_major_event.is_none());
        assert!(landed
            .events
            .iter()
            .all(|event| event.status == orionsim::timeline::EventStatus::Complete));
    }
}
