//! Live timing: reader sessions feeding the lap engine

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use trackside_core::{
    PresentationEvent, PresentationSink, ReaderEventSink, StopSignal, device_clock_now_us,
};
use trackside_laps::{LapAggregationEngine, NameTable, pump_reader_events, run_purge_timer};
use trackside_link::TcpConnector;
use trackside_reader::ReaderSessionController;

use crate::commands::load_config;
use crate::error::CliError;
use crate::output;

/// Run every configured reader until interrupted, or for `duration`.
pub async fn execute(
    config: &Path,
    simulate: bool,
    duration: Option<Duration>,
    json: bool,
) -> Result<()> {
    let config = load_config(config, simulate).await?;

    let names = Arc::new(NameTable::from_config(&config.riders));
    let engine = Arc::new(LapAggregationEngine::new(config.laps.clone(), names));
    let (events, events_rx) = ReaderEventSink::channel();
    let (presentation, presentation_rx) = PresentationSink::channel();
    let stop = StopSignal::new();

    let console = tokio::spawn(present(presentation_rx, json));
    let pump = tokio::spawn(pump_reader_events(
        Arc::clone(&engine),
        events_rx,
        presentation.clone(),
    ));
    let purge = tokio::spawn(run_purge_timer(
        Arc::clone(&engine),
        config.laps.purge_interval(),
        device_clock_now_us,
        stop.clone(),
    ));

    let mut sessions = JoinSet::new();
    for settings in config.readers {
        let connector = TcpConnector::new(settings.max_frame_bytes);
        let mut session =
            ReaderSessionController::new(settings, connector, events.clone(), presentation.clone());
        let stop = stop.clone();
        sessions.spawn(async move {
            let result = session.run(&stop).await;
            (session.reader_id().to_string(), result)
        });
    }
    drop(events);
    info!(readers = sessions.len(), "Readers started");

    let stopper = {
        let stop = stop.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = interrupted() => info!("Interrupted, stopping readers"),
                () = elapsed(duration) => info!("Run time elapsed, stopping readers"),
            }
            stop.stop();
        })
    };

    let mut failures = Vec::new();
    while let Some(joined) = sessions.join_next().await {
        match joined {
            Ok((reader_id, Ok(()))) => info!(%reader_id, "Reader session finished"),
            Ok((reader_id, Err(e))) => {
                error!(%reader_id, error = %e, "Reader session failed");
                failures.push(format!("{reader_id}: {e}"));
            }
            Err(e) => {
                error!(error = %e, "Reader task aborted");
                failures.push(e.to_string());
            }
        }
    }

    // Every session is gone; wind down the rest.
    stop.stop();
    stopper.abort();
    if let Err(e) = purge.await {
        warn!(error = %e, "Purge timer task failed");
    }
    match pump.await {
        Ok(stats) => info!(?stats, "Lap engine drained"),
        Err(e) => warn!(error = %e, "Event pump task failed"),
    }
    drop(presentation);
    if let Err(e) = console.await {
        warn!(error = %e, "Console task failed");
    }

    output::print_leaderboard(&engine.leaderboard(), json);

    if failures.is_empty() {
        Ok(())
    } else {
        Err(CliError::ReaderFailed(failures.join("; ")).into())
    }
}

/// Print presentation events until every sender is dropped.
async fn present(mut events: mpsc::UnboundedReceiver<PresentationEvent>, json: bool) -> usize {
    let mut shown = 0;
    while let Some(event) = events.recv().await {
        if json {
            println!("{}", output::event_json(&event));
        } else {
            println!("{}", output::format_event(&event));
        }
        shown += 1;
    }
    shown
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

async fn elapsed(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending::<()>().await,
    }
}
