use crate::clock::MissionClock;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Upcoming,
    InProgress,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    Milestone,
    Burn { delta_v_mps: f64 },
}

/// An entry in the fixed flight plan. Times are MET seconds.
#[derive(Debug, Clone, Copy)]
pub struct PlannedEvent {
    pub name: &'static str,
    pub met_s: f64,
    pub duration_s: f64,
    pub kind: EventKind,
}

impl PlannedEvent {
    pub fn status_at(&self, met_s: f64) -> EventStatus {
        if met_s < self.met_s {
            EventStatus::Upcoming
        } else if met_s < self.met_s + self.duration_s {
            EventStatus::InProgress
        } else {
            EventStatus::Complete
        }
    }
}

/// Wire form of one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionEvent {
    pub name: String,
    pub met: String,
    pub status: EventStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineState {
    pub current_phase: String,
    pub events: Vec<MissionEvent>,
    pub next_major_event: Option<MissionEvent>,
}

/// The mission flight plan: an ordered event table plus the phase
/// boundaries. Status is derived from elapsed time on every query, so the
/// timeline itself never mutates.
#[derive(Debug, Clone)]
pub struct Timeline {
    events: Vec<PlannedEvent>,
    phases: Vec<(f64, &'static str)>,
}

impl Timeline {
    /// The ten-day free-return flight plan matching the trajectory profile.
    pub fn new() -> Self {
        Self {
            events: vec![
                PlannedEvent {
                    name: "Liftoff",
                    met_s: 0.0,
                    duration_s: 480.0,
                    kind: EventKind::Milestone,
                },
                PlannedEvent {
                    name: "Trans-Lunar Injection",
                    met_s: 7_200.0,
                    duration_s: 1_080.0,
                    kind: EventKind::Burn { delta_v_mps: 3_100.0 },
                },
                PlannedEvent {
                    name: "Outbound Trajectory Correction",
                    met_s: 93_600.0,
                    duration_s: 30.0,
                    kind: EventKind::Burn { delta_v_mps: 12.0 },
                },
                PlannedEvent {
                    name: "Lunar Flyby",
                    met_s: 360_000.0,
                    duration_s: 7_200.0,
                    kind: EventKind::Milestone,
                },
                PlannedEvent {
                    name: "Return Trajectory Correction",
                    met_s: 450_000.0,
                    duration_s: 35.0,
                    kind: EventKind::Burn { delta_v_mps: 14.0 },
                },
                PlannedEvent {
                    name: "Entry Interface",
                    met_s: 856_800.0,
                    duration_s: 1_500.0,
                    kind: EventKind::Milestone,
                },
                PlannedEvent {
                    name: "Splashdown",
                    met_s: 864_000.0,
                    duration_s: 60.0,
                    kind: EventKind::Milestone,
                },
            ],
            phases: vec![
                (0.0, "Ascent"),
                (480.0, "LEO Parking Orbit"),
                (7_200.0, "Trans-Lunar Coast"),
                (360_000.0, "Lunar Flyby"),
                (367_200.0, "Trans-Earth Coast"),
                (856_800.0, "Entry and Recovery"),
            ],
        }
    }

    pub fn current_phase(&self, met_s: f64) -> &'static str {
        self.phases
            .iter()
            .rev()
            .find(|(start, _)| met_s >= *start)
            .map_or(self.phases[0].1, |(_, name)| *name)
    }

    /// Every burn event in the flight plan, in order.
    pub fn burns(&self) -> impl Iterator<Item = &PlannedEvent> {
        self.events
            .iter()
            .filter(|event| matches!(event.kind, EventKind::Burn { .. }))
    }

    /// The burn event currently firing, if any.
    pub fn active_burn(&self, met_s: f64) -> Option<&PlannedEvent> {
        self.events.iter().find(|event| {
            matches!(event.kind, EventKind::Burn { .. })
                && event.status_at(met_s) == EventStatus::InProgress
        })
    }

    /// Burn events still ahead of the spacecraft, in flight-plan order.
    pub fn upcoming_burns(&self, met_s: f64) -> Vec<&PlannedEvent> {
        self.events
            .iter()
            .filter(|event| {
                matches!(event.kind, EventKind::Burn { .. })
                    && event.status_at(met_s) == EventStatus::Upcoming
            })
            .collect()
    }

    pub fn state(&self, met_s: f64) -> TimelineState {
        let events: Vec<MissionEvent> = self
            .events
            .iter()
            .map(|event| MissionEvent {
                name: event.name.to_string(),
                met: MissionClock::format_met(Duration::from_secs_f64(event.met_s)),
                status: event.status_at(met_s),
            })
            .collect();

        let next_major_event = self
            .events
            .iter()
            .zip(events.iter())
            .find(|(planned, _)| planned.status_at(met_s) == EventStatus::Upcoming)
            .map(|(_, wire)| wire.clone());

        TimelineState {
            current_phase: self.current_phase(met_s).to_string(),
            events,
            next_major_event,
        }
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}
