use orionsim::alerts::{severity_for_excursion, AlertError, AlertEvaluator, AlertSeverity};
use orionsim::sim::{MissionSimulator, SimConfig};
use orionsim::telemetry::TelemetryFrame;
use std::time::Duration;

fn test_sim() -> MissionSimulator {
    MissionSimulator::new(SimConfig {
        seed: 1234,
        time_scale: 1.0,
    })
}

#[cfg(test)]
mod severity_tests {
    use super::*;

    #[test]
    fn test_severity_tiers_by_excursion() {
        assert_eq!(severity_for_excursion(0.05), AlertSeverity::Info);
        assert_eq!(severity_for_excursion(0.15), AlertSeverity::Warning);
        assert_eq!(severity_for_excursion(0.25), AlertSeverity::Caution);
        assert_eq!(severity_for_excursion(0.35), AlertSeverity::Critical);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(AlertSeverity::Critical > AlertSeverity::Caution);
        assert!(AlertSeverity::Caution > AlertSeverity::Warning);
        assert!(AlertSeverity::Warning > AlertSeverity::Info);
    }
}

#[cfg(test)]
mod evaluator_tests {
    use super::*;

    #[test]
    fn test_nominal_frame_raises_nothing() {
        let mut sim = test_sim();
        let snapshot = sim.step(Duration::from_millis(100));

        let frame = TelemetryFrame {
            spacecraft: &snapshot.spacecraft,
            crew: &snapshot.crew,
            eclss: &snapshot.eclss,
            power: &snapshot.power,
            propulsion: &snapshot.propulsion,
            communications: &snapshot.communications,
        };
        let mut evaluator = AlertEvaluator::new();
        assert_eq!(evaluator.evaluate(&frame, Duration::from_millis(100)), 0);
        assert!(evaluator.alerts().is_empty());
    }

    #[test]
    fn test_raise_deduplicates_per_system_parameter() {
        let mut evaluator = AlertEvaluator::new();
        let met = Duration::from_secs(60);

        let first = evaluator.raise(
            "eclss",
            "oxygen",
            AlertSeverity::Warning,
            "low".to_string(),
            met,
        );
        let second = evaluator.raise(
            "eclss",
            "oxygen",
            AlertSeverity::Critical,
            "still low".to_string(),
            met,
        );
        // A different parameter on the same system is not suppressed.
        let other = evaluator.raise(
            "eclss",
            "co2",
            AlertSeverity::Warning,
            "high".to_string(),
            met,
        );

        assert!(first.is_some());
        assert!(second.is_none());
        assert!(other.is_some());
        assert_eq!(evaluator.alerts().len(), 2);
    }

    #[test]
    fn test_alert_ids_increase_monotonically() {
        let mut evaluator = AlertEvaluator::new();
        let met = Duration::from_secs(1);

        let a = evaluator
            .raise("power", "battery_charge", AlertSeverity::Info, "a".into(), met)
            .unwrap();
        let b = evaluator
            .raise("crew", "heart_rate", AlertSeverity::Info, "b".into(), met)
            .unwrap();
        assert!(b > a);
    }
}

#[cfg(test)]
mod acknowledge_tests {
    use super::*;

    #[test]
    fn test_acknowledge_is_idempotent() {
        let mut evaluator = AlertEvaluator::new();
        let id = evaluator
            .raise(
                "eclss",
                "oxygen",
                AlertSeverity::Warning,
                "low".to_string(),
                Duration::from_secs(5),
            )
            .unwrap();

        assert!(evaluator.acknowledge(id).is_ok());
        // Second acknowledge is a no-op, not an error.
        assert!(evaluator.acknowledge(id).is_ok());
        assert!(evaluator.alerts()[0].acknowledged);
    }

    #[test]
    fn test_acknowledge_unknown_id_is_not_found() {
        let mut evaluator = AlertEvaluator::new();
        match evaluator.acknowledge(9_999) {
            Err(AlertError::NotFound(id)) => assert_eq!(id, 9_999),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_acknowledged_alert_reopens_dedup_window() {
        let mut evaluator = AlertEvaluator::new();
        let met = Duration::from_secs(10);

        let id = evaluator
            .raise("eclss", "oxygen", AlertSeverity::Warning, "low".into(), met)
            .unwrap();
        evaluator.acknowledge(id).unwrap();

        // With no active alert on the pair, a persisting condition raises a
        // fresh one.
        let reraised = evaluator.raise(
            "eclss",
            "oxygen",
            AlertSeverity::Warning,
            "still low".into(),
            met,
        );
        assert!(reraised.is_some());
        assert_eq!(evaluator.alerts().len(), 2);
        assert_eq!(evaluator.active_alerts().count(), 1);
    }
}

#[cfg(test)]
mod injection_tests {
    use super::*;

    #[test]
    fn test_low_oxygen_raises_exactly_one_alert_within_one_tick() {
        let mut sim = test_sim();
        sim.step(Duration::from_millis(100));

        sim.eclss_mut().set_o2_partial_pressure(130.0);
        let snapshot = sim.step(Duration::from_millis(200));

        let oxygen_alerts: Vec<_> = snapshot
            .alerts
            .iter()
            .filter(|alert| alert.system == "eclss" && alert.parameter == "oxygen")
            .collect();
        assert_eq!(oxygen_alerts.len(), 1);
        assert!(!oxygen_alerts[0].acknowledged);
        // 20 mmHg below a 20 mmHg band is a full-span excursion.
        assert_eq!(oxygen_alerts[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_persisting_condition_does_not_duplicate() {
        let mut sim = test_sim();
        sim.step(Duration::from_millis(100));

        sim.eclss_mut().set_o2_partial_pressure(130.0);
        sim.step(Duration::from_millis(200));
        // The walk holds near the forced reading; the condition is still
        // present on the following ticks.
        sim.eclss_mut().set_o2_partial_pressure(130.0);
        sim.step(Duration::from_millis(300));
        sim.eclss_mut().set_o2_partial_pressure(130.0);
        let snapshot = sim.step(Duration::from_millis(400));

        let oxygen_alerts: Vec<_> = snapshot
            .alerts
            .iter()
            .filter(|alert| alert.system == "eclss" && alert.parameter == "oxygen")
            .collect();
        assert_eq!(oxygen_alerts.len(), 1);
    }

    #[test]
    fn test_alert_survives_return_to_nominal_until_acknowledged() {
        let mut sim = test_sim();
        sim.step(Duration::from_millis(100));

        sim.eclss_mut().set_o2_partial_pressure(130.0);
        sim.step(Duration::from_millis(200));

        // Parameter back to nominal; the alert stays active.
        sim.eclss_mut().set_o2_partial_pressure(160.0);
        let snapshot = sim.step(Duration::from_millis(300));
        let alert = snapshot
            .alerts
            .iter()
            .find(|alert| alert.system == "eclss" && alert.parameter == "oxygen")
            .expect("alert should persist");
        assert!(!alert.acknowledged);

        let id = alert.id;
        sim.acknowledge_alert(id).unwrap();
        sim.eclss_mut().set_o2_partial_pressure(160.0);
        let snapshot = sim.step(Duration::from_millis(400));
        let alert = snapshot
            .alerts
            .iter()
            .find(|alert| alert.id == id)
            .expect("acknowledged alerts are retained");
        assert!(alert.acknowledged);
    }

    #[test]
    fn test_acknowledge_through_simulator() {
        let mut sim = test_sim();
        sim.step(Duration::from_millis(100));
        sim.eclss_mut().set_o2_partial_pressure(130.0);
        let snapshot = sim.step(Duration::from_millis(200));
        let id = snapshot.alerts[0].id;

        assert!(sim.acknowledge_alert(id).is_ok());
        assert!(sim.acknowledge_alert(id).is_ok());
        assert!(matches!(
            sim.acknowledge_alert(123_456),
            Err(AlertError::NotFound(_))
        ));
    }
}
