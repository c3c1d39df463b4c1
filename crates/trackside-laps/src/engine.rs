//! Lap aggregation over sightings from every reader.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};
use trackside_config::LapSettings;
use trackside_core::{LapEvent, TagSighting};

use crate::names::{NameLookup, NameTable};
use crate::rider::{ActiveRider, LapRecord, Standing};

/// What one sighting did to the engine state.
#[derive(Debug, Clone, PartialEq)]
pub enum SightingOutcome {
    /// First sighting of the tag; timing starts here
    NewRider(LapEvent),
    Lap(LapEvent),
    /// The gap exceeded the maximum lap time; timing restarts here
    Restarted { event: LapEvent, gap_secs: f64 },
    /// Inside the dedup window of the tag's last accepted sighting
    Duplicate,
}

impl SightingOutcome {
    pub fn lap_event(&self) -> Option<&LapEvent> {
        match self {
            SightingOutcome::NewRider(event)
            | SightingOutcome::Lap(event)
            | SightingOutcome::Restarted { event, .. } => Some(event),
            SightingOutcome::Duplicate => None,
        }
    }

    pub fn is_lap(&self) -> bool {
        matches!(self, SightingOutcome::Lap(_))
    }
}

/// Counts from one [`LapAggregationEngine::purge_stale`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PurgeReport {
    pub riders_removed: usize,
    pub records_removed: usize,
}

impl PurgeReport {
    pub fn is_empty(&self) -> bool {
        self.riders_removed == 0 && self.records_removed == 0
    }
}

/// Standings and history taken under both locks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineSnapshot {
    pub standings: Vec<Standing>,
    pub history: Vec<LapRecord>,
}

#[derive(Debug, Default)]
struct History {
    records: VecDeque<LapRecord>,
    evicted: u64,
}

/// Shared by every reader session and the presentation side.
///
/// Lock order is riders then history. A sighting holds the rider lock while it
/// appends its history row so readers never see one without the other.
pub struct LapAggregationEngine {
    settings: LapSettings,
    max_lap_secs: f64,
    dedup_us: u64,
    inactivity_us: u64,
    retention_us: u64,
    names: Arc<dyn NameLookup>,
    riders: Mutex<HashMap<String, ActiveRider>>,
    history: Mutex<History>,
}

impl std::fmt::Debug for LapAggregationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LapAggregationEngine")
            .field("settings", &self.settings)
            .field("active_riders", &self.active_rider_count())
            .finish_non_exhaustive()
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

impl LapAggregationEngine {
    pub fn new(settings: LapSettings, names: Arc<dyn NameLookup>) -> Self {
        Self {
            max_lap_secs: settings.max_acceptable_lap_secs,
            dedup_us: micros(settings.dedup_window()),
            inactivity_us: micros(settings.inactivity_window()),
            retention_us: micros(settings.history_retention()),
            settings,
            names,
            riders: Mutex::new(HashMap::new()),
            history: Mutex::new(History::default()),
        }
    }

    /// Engine with no rider names; every rider shows as its tag id.
    pub fn anonymous(settings: LapSettings) -> Self {
        Self::new(settings, Arc::new(NameTable::new()))
    }

    pub fn settings(&self) -> &LapSettings {
        &self.settings
    }

    /// Fold one sighting into the rider table and history.
    pub fn on_sighting(&self, sighting: &TagSighting) -> SightingOutcome {
        let timestamp_us = sighting.device_timestamp_us;
        let mut riders = self.riders.lock();

        let outcome = match riders.get_mut(&sighting.tag_id) {
            None => {
                let name = self
                    .names
                    .display_name(&sighting.tag_id)
                    .unwrap_or_else(|| sighting.tag_id.clone());
                info!(tag = %sighting.tag_id, rider = %name, reader_id = %sighting.reader_id, "New rider on track");
                let rider = ActiveRider::new(sighting.tag_id.clone(), name, timestamp_us);
                let event = lap_event(&rider, timestamp_us, 0.0);
                riders.insert(sighting.tag_id.clone(), rider);
                SightingOutcome::NewRider(event)
            }
            Some(rider) => {
                let delta_us = timestamp_us.saturating_sub(rider.previous_timestamp_us);
                if delta_us <= self.dedup_us {
                    debug!(tag = %sighting.tag_id, delta_us, "Duplicate sighting suppressed");
                    return SightingOutcome::Duplicate;
                }
                let elapsed = rider.elapsed_secs(timestamp_us);
                if elapsed > self.max_lap_secs {
                    info!(tag = %sighting.tag_id, rider = %rider.name, gap_secs = elapsed, "Rider returned, restarting lap timing");
                    rider.restart(timestamp_us);
                    SightingOutcome::Restarted {
                        event: lap_event(rider, timestamp_us, 0.0),
                        gap_secs: elapsed,
                    }
                } else {
                    rider.record_lap(elapsed, timestamp_us);
                    debug!(tag = %sighting.tag_id, rider = %rider.name, lap_secs = elapsed, lap_count = rider.lap_count, "Lap");
                    SightingOutcome::Lap(lap_event(rider, timestamp_us, elapsed))
                }
            }
        };

        if let Some(event) = outcome.lap_event() {
            let mut history = self.history.lock();
            history.records.push_back(LapRecord {
                rider_name: event.rider_name.clone(),
                tag_id: event.tag_id.clone(),
                device_timestamp_us: event.device_timestamp_us,
                lap_secs: event.lap_secs,
            });
            while history.records.len() > self.settings.max_history_entries {
                history.records.pop_front();
                history.evicted += 1;
            }
        }
        drop(riders);
        outcome
    }

    /// Drop riders unseen for longer than the inactivity window and history
    /// older than the retention window, measured against `now_us`.
    pub fn purge_stale(&self, now_us: u64) -> PurgeReport {
        let mut riders = self.riders.lock();
        let before = riders.len();
        riders.retain(|_, rider| {
            now_us.saturating_sub(rider.previous_timestamp_us) <= self.inactivity_us
        });
        let riders_removed = before - riders.len();

        let mut history = self.history.lock();
        let before = history.records.len();
        history
            .records
            .retain(|record| now_us.saturating_sub(record.device_timestamp_us) <= self.retention_us);
        let records_removed = before - history.records.len();
        drop(history);
        drop(riders);

        let report = PurgeReport {
            riders_removed,
            records_removed,
        };
        if !report.is_empty() {
            debug!(riders_removed, records_removed, now_us, "Purged stale lap state");
        }
        report
    }

    pub fn active_rider_count(&self) -> usize {
        self.riders.lock().len()
    }

    pub fn rider(&self, tag_id: &str) -> Option<ActiveRider> {
        self.riders.lock().get(tag_id).cloned()
    }

    /// Riders ordered by lap count, then best lap, then tag id.
    pub fn leaderboard(&self) -> Vec<Standing> {
        let riders = self.riders.lock();
        rank(riders.values())
    }

    /// Lap history ordered by device timestamp.
    pub fn history(&self) -> Vec<LapRecord> {
        let history = self.history.lock();
        sorted_history(&history)
    }

    /// Records dropped because the history cap was reached.
    pub fn evicted_records(&self) -> u64 {
        self.history.lock().evicted
    }

    /// Standings and history from the same instant.
    pub fn snapshot(&self) -> EngineSnapshot {
        let riders = self.riders.lock();
        let history = self.history.lock();
        EngineSnapshot {
            standings: rank(riders.values()),
            history: sorted_history(&history),
        }
    }
}

fn lap_event(rider: &ActiveRider, timestamp_us: u64, lap_secs: f64) -> LapEvent {
    LapEvent {
        rider_name: rider.name.clone(),
        tag_id: rider.tag_id.clone(),
        device_timestamp_us: timestamp_us,
        lap_secs,
        lap_count: rider.lap_count,
    }
}

fn compare_best(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn rank<'a>(riders: impl Iterator<Item = &'a ActiveRider>) -> Vec<Standing> {
    let mut standings: Vec<Standing> = riders.map(Standing::from_rider).collect();
    standings.sort_by(|a, b| {
        b.lap_count
            .cmp(&a.lap_count)
            .then_with(|| compare_best(a.best_lap_secs, b.best_lap_secs))
            .then_with(|| a.tag_id.cmp(&b.tag_id))
    });
    for (i, standing) in standings.iter_mut().enumerate() {
        standing.position = i + 1;
    }
    standings
}

fn sorted_history(history: &History) -> Vec<LapRecord> {
    let mut records: Vec<LapRecord> = history.records.iter().cloned().collect();
    records.sort_by_key(|r| r.device_timestamp_us);
    records
}
