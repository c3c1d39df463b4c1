//! Background tasks that feed and maintain a [`LapAggregationEngine`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, trace};
use trackside_core::{PresentationEvent, PresentationSink, ReaderEvent, StopSignal};
use trackside_errors::ErrorSeverity;

use crate::engine::{LapAggregationEngine, SightingOutcome};

/// Totals from a finished [`pump_reader_events`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PumpStats {
    pub sightings: u64,
    pub laps: u64,
    pub duplicates: u64,
}

/// Feed reader events into the engine until every sender is gone.
///
/// Lap results are forwarded to the presentation sink. Antenna and exception
/// events were already reported by the session that produced them.
pub async fn pump_reader_events(
    engine: Arc<LapAggregationEngine>,
    mut events: mpsc::UnboundedReceiver<ReaderEvent>,
    presentation: PresentationSink,
) -> PumpStats {
    let mut stats = PumpStats::default();
    while let Some(event) = events.recv().await {
        let sighting = match event {
            ReaderEvent::Sighting(sighting) => sighting,
            other => {
                trace!(reader_id = %other.reader_id(), "Non-sighting reader event");
                continue;
            }
        };
        stats.sightings += 1;
        let outcome = engine.on_sighting(&sighting);
        match &outcome {
            SightingOutcome::Duplicate => stats.duplicates += 1,
            SightingOutcome::Lap(_) => stats.laps += 1,
            SightingOutcome::Restarted { event, gap_secs } => {
                presentation.log(
                    ErrorSeverity::Info,
                    &sighting.reader_id,
                    format!(
                        "{} back on track after {gap_secs:.1}s, lap timing restarted",
                        event.rider_name
                    ),
                );
            }
            SightingOutcome::NewRider(_) => {}
        }
        if let Some(event) = outcome.lap_event() {
            presentation.emit(PresentationEvent::Lap(event.clone()));
        }
    }
    debug!(?stats, "Reader event pump finished");
    stats
}

/// Call [`LapAggregationEngine::purge_stale`] every `period` until stopped.
///
/// `clock` supplies the device-clock time each pass is measured against.
/// Returns the number of passes run.
pub async fn run_purge_timer<F>(
    engine: Arc<LapAggregationEngine>,
    period: Duration,
    clock: F,
    stop: StopSignal,
) -> u64
where
    F: Fn() -> u64 + Send,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut passes = 0u64;

    while !stop.is_stopped() {
        tokio::select! {
            biased;
            () = stop.stopped() => break,
            _ = ticker.tick() => {
                engine.purge_stale(clock());
                passes += 1;
            }
        }
    }
    debug!(passes, "Purge timer stopped");
    passes
}
