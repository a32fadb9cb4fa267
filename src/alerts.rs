use crate::clock::MissionClock;
use crate::telemetry::TelemetryFrame;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Info,
    Warning,
    Caution,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub severity: AlertSeverity,
    pub system: String,
    pub parameter: String,
    pub message: String,
    pub timestamp: String,
    pub acknowledged: bool,
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert {0} not found")]
    NotFound(u64),
}

/// One monitored parameter: where to read it in the frame and the nominal
/// band it must stay inside.
pub struct ThresholdRule {
    pub system: &'static str,
    pub parameter: &'static str,
    pub min: f64,
    pub max: f64,
    pub unit: &'static str,
    pub read: fn(&TelemetryFrame<'_>) -> f64,
}

/// Severity tiers by how far outside the nominal band the reading sits,
/// relative to the band's span.
pub fn severity_for_excursion(fraction: f64) -> AlertSeverity {
    if fraction > 0.30 {
        AlertSeverity::Critical
    } else if fraction > 0.20 {
        AlertSeverity::Caution
    } else if fraction > 0.10 {
        AlertSeverity::Warning
    } else {
        AlertSeverity::Info
    }
}

fn excursion_fraction(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if value < min {
        (min - value) / span
    } else if value > max {
        (value - max) / span
    } else {
        0.0
    }
}

fn default_rules() -> Vec<ThresholdRule> {
    vec![
        ThresholdRule {
            system: "eclss",
            parameter: "oxygen",
            min: 150.0,
            max: 170.0,
            unit: "mmHg",
            read: |frame| frame.eclss.oxygen.partial_pressure,
        },
        ThresholdRule {
            system: "eclss",
            parameter: "co2",
            min: 0.5,
            max: 4.0,
            unit: "mmHg",
            read: |frame| frame.eclss.co2_removal.co2_level,
        },
        ThresholdRule {
            system: "eclss",
            parameter: "cabin_pressure",
            min: 13.9,
            max: 15.2,
            unit: "psi",
            read: |frame| frame.eclss.cabin.pressure,
        },
        ThresholdRule {
            system: "power",
            parameter: "battery_charge",
            min: 30.0,
            max: 100.0,
            unit: "%",
            read: |frame| {
                frame
                    .power
                    .batteries
                    .iter()
                    .map(|battery| battery.state_of_charge)
                    .fold(100.0, f64::min)
            },
        },
        ThresholdRule {
            system: "power",
            parameter: "battery_voltage",
            min: 26.0,
            max: 33.5,
            unit: "V",
            read: |frame| {
                frame
                    .power
                    .batteries
                    .iter()
                    .map(|battery| battery.voltage)
                    .fold(33.5, f64::min)
            },
        },
        ThresholdRule {
            system: "crew",
            parameter: "heart_rate",
            min: 40.0,
            max: 120.0,
            unit: "bpm",
            read: |frame| {
                frame
                    .crew
                    .iter()
                    .map(|member| f64::from(member.vitals.heart_rate))
                    .fold(72.0, f64::max)
            },
        },
        ThresholdRule {
            system: "propulsion",
            parameter: "chamber_pressure",
            min: 90.0,
            max: 280.0,
            unit: "psi",
            read: |frame| frame.propulsion.main_engine.chamber_pressure,
        },
        ThresholdRule {
            system: "comms",
            parameter: "signal_strength",
            min: -128.0,
            max: -55.0,
            unit: "dBm",
            read: |frame| {
                frame
                    .communications
                    .dsn_contacts
                    .first()
                    .map_or(-80.0, |contact| contact.signal_strength)
            },
        },
    ]
}

/// Threshold scan plus the alert lifecycle: creation with (system, parameter)
/// deduplication and an idempotent acknowledge machine. Alerts are never
/// deleted; one that returns to nominal stays active until acknowledged.
pub struct AlertEvaluator {
    rules: Vec<ThresholdRule>,
    alerts: Vec<Alert>,
    next_id: u64,
}

impl AlertEvaluator {
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    pub fn with_rules(rules: Vec<ThresholdRule>) -> Self {
        Self {
            rules,
            alerts: Vec::new(),
            next_id: 1,
        }
    }

    /// Scan one tick's frame against the threshold table. Returns how many
    /// alerts were raised this pass.
    pub fn evaluate(&mut self, frame: &TelemetryFrame<'_>, met: Duration) -> usize {
        let mut raised = 0;
        for index in 0..self.rules.len() {
            let rule = &self.rules[index];
            let value = (rule.read)(frame);
            let fraction = excursion_fraction(value, rule.min, rule.max);
            if fraction <= 0.0 {
                continue;
            }
            let severity = severity_for_excursion(fraction);
            let message = format!(
                "{} {:.1} {} outside nominal {:.1}-{:.1} {}",
                rule.parameter, value, rule.unit, rule.min, rule.max, rule.unit
            );
            let (system, parameter) = (rule.system, rule.parameter);
            if self.raise(system, parameter, severity, message, met).is_some() {
                raised += 1;
            }
        }
        raised
    }

    /// Raise an alert through the dedup gate: suppressed when the
    /// (system, parameter) pair already has an active unacknowledged alert.
    /// Returns the new alert's id when one was created.
    pub fn raise(
        &mut self,
        system: &str,
        parameter: &str,
        severity: AlertSeverity,
        message: String,
        met: Duration,
    ) -> Option<u64> {
        if self.has_active(system, parameter) {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.alerts.push(Alert {
            id,
            severity,
            system: system.to_string(),
            parameter: parameter.to_string(),
            message,
            timestamp: MissionClock::format_met(met),
            acknowledged: false,
        });
        Some(id)
    }

    /// Acknowledge by id. A second acknowledge of the same alert is a no-op;
    /// an unknown id is a not-found error.
    pub fn acknowledge(&mut self, id: u64) -> Result<(), AlertError> {
        match self.alerts.iter_mut().find(|alert| alert.id == id) {
            Some(alert) => {
                alert.acknowledged = true;
                Ok(())
            }
            None => Err(AlertError::NotFound(id)),
        }
    }

    pub fn has_active(&self, system: &str, parameter: &str) -> bool {
        self.alerts
            .iter()
            .any(|alert| !alert.acknowledged && alert.system == system && alert.parameter == parameter)
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn active_alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(|alert| !alert.acknowledged)
    }
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::new()
    }
}
