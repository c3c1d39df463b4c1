//! Per-rider lap state and the records the engine keeps.

use std::time::Duration;

/// A rider currently on track.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRider {
    /// Lowercase hex tag identifier
    pub tag_id: String,
    pub name: String,
    pub lap_count: u32,
    /// `f64::INFINITY` until the first lap closes
    pub best_lap_secs: f64,
    pub lap_sum_secs: f64,
    /// Device timestamp of the last accepted sighting
    pub previous_timestamp_us: u64,
}

impl ActiveRider {
    pub fn new(tag_id: impl Into<String>, name: impl Into<String>, timestamp_us: u64) -> Self {
        Self {
            tag_id: tag_id.into(),
            name: name.into(),
            lap_count: 0,
            best_lap_secs: f64::INFINITY,
            lap_sum_secs: 0.0,
            previous_timestamp_us: timestamp_us,
        }
    }

    pub fn best_lap(&self) -> Option<f64> {
        (self.lap_count > 0).then_some(self.best_lap_secs)
    }

    pub fn average_lap(&self) -> Option<f64> {
        (self.lap_count > 0).then(|| self.lap_sum_secs / f64::from(self.lap_count))
    }

    /// Seconds between the last accepted sighting and `timestamp_us`.
    ///
    /// Sightings stamped before the previous one give zero.
    pub fn elapsed_secs(&self, timestamp_us: u64) -> f64 {
        Duration::from_micros(timestamp_us.saturating_sub(self.previous_timestamp_us)).as_secs_f64()
    }

    /// Close a lap ending at `timestamp_us`.
    pub fn record_lap(&mut self, lap_secs: f64, timestamp_us: u64) {
        self.lap_count += 1;
        self.lap_sum_secs += lap_secs;
        if lap_secs < self.best_lap_secs {
            self.best_lap_secs = lap_secs;
        }
        self.previous_timestamp_us = timestamp_us;
    }

    /// Start timing again from `timestamp_us` without touching statistics.
    pub fn restart(&mut self, timestamp_us: u64) {
        self.previous_timestamp_us = timestamp_us;
    }
}

/// One row of lap history.
#[derive(Debug, Clone, PartialEq)]
pub struct LapRecord {
    pub rider_name: String,
    pub tag_id: String,
    pub device_timestamp_us: u64,
    /// Zero when the sighting did not close a lap
    pub lap_secs: f64,
}

/// One leaderboard line.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    /// 1-based
    pub position: usize,
    pub tag_id: String,
    pub name: String,
    pub lap_count: u32,
    pub best_lap_secs: Option<f64>,
    pub average_lap_secs: Option<f64>,
    pub last_seen_us: u64,
}

impl Standing {
    pub(crate) fn from_rider(rider: &ActiveRider) -> Self {
        Self {
            position: 0,
            tag_id: rider.tag_id.clone(),
            name: rider.name.clone(),
            lap_count: rider.lap_count,
            best_lap_secs: rider.best_lap(),
            average_lap_secs: rider.average_lap(),
            last_seen_us: rider.previous_timestamp_us,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_new_rider_has_no_laps() {
        let rider = ActiveRider::new("ab12", "Ana", 1_000);
        assert_eq!(rider.lap_count, 0);
        assert!(rider.best_lap_secs.is_infinite());
        assert_eq!(rider.best_lap(), None);
        assert_eq!(rider.average_lap(), None);
    }

    #[test]
    fn test_record_lap_tracks_best_and_average() {
        let mut rider = ActiveRider::new("ab12", "Ana", 0);
        rider.record_lap(30.0, 30_000_000);
        rider.record_lap(15.0, 45_000_000);
        rider.record_lap(20.0, 65_000_000);
        assert_eq!(rider.lap_count, 3);
        assert!(approx(rider.best_lap(), 15.0));
        assert!(approx(rider.average_lap(), 65.0 / 3.0));
        assert_eq!(rider.previous_timestamp_us, 65_000_000);
    }

    #[test]
    fn test_elapsed_never_negative() {
        let rider = ActiveRider::new("ab12", "Ana", 5_000_000);
        assert!(approx(Some(rider.elapsed_secs(7_500_000)), 2.5));
        assert!(approx(Some(rider.elapsed_secs(1_000_000)), 0.0));
    }

    #[test]
    fn test_restart_keeps_statistics() {
        let mut rider = ActiveRider::new("ab12", "Ana", 0);
        rider.record_lap(40.0, 40_000_000);
        rider.restart(900_000_000);
        assert_eq!(rider.lap_count, 1);
        assert!(approx(rider.best_lap(), 40.0));
        assert_eq!(rider.previous_timestamp_us, 900_000_000);
    }
}
