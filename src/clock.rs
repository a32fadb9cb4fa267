use std::time::{Duration, Instant};

/// Authoritative mission-elapsed-time source.
///
/// MET is derived from the wall-clock delta against a fixed launch instant,
/// optionally scaled by a constant acceleration factor for ground testing.
/// There is no mutation API: elapsed time is a pure function of wall time and
/// is therefore monotonically non-decreasing for the life of the process.
#[derive(Debug, Clone)]
pub struct MissionClock {
    launch: Instant,
    scale: f64,
}

impl MissionClock {
    pub fn new() -> Self {
        Self::with_scale(1.0)
    }

    /// A clock that runs `scale` times faster than wall time.
    pub fn with_scale(scale: f64) -> Self {
        Self {
            launch: Instant::now(),
            scale: scale.max(0.0),
        }
    }

    /// Mission elapsed time since the launch epoch.
    pub fn elapsed(&self) -> Duration {
        self.launch.elapsed().mul_f64(self.scale)
    }

    /// Canonical MET display form, `DDD:HH:MM:SS`.
    pub fn format_met(elapsed: Duration) -> String {
        let total = elapsed.as_secs();
        let days = total / 86_400;
        let hours = (total % 86_400) / 3_600;
        let minutes = (total % 3_600) / 60;
        let seconds = total % 60;
        format!("{days:03}:{hours:02}:{minutes:02}:{seconds:02}")
    }
}

impl Default for MissionClock {
    fn default() -> Self {
        Self::new()
    }
}
