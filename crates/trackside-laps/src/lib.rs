//! Lap aggregation for Trackside.
//!
//! A single [`LapAggregationEngine`] is shared by every reader session. It turns
//! tag sightings into laps per rider, keeps a bounded lap history and serves
//! leaderboard snapshots to the presentation side.
//!
//! ```
//! use trackside_config::LapSettings;
//! use trackside_core::TagSighting;
//! use trackside_laps::LapAggregationEngine;
//!
//! let engine = LapAggregationEngine::anonymous(LapSettings::default());
//! engine.on_sighting(&TagSighting::new("gate", 1, "ab12", 0));
//! let outcome = engine.on_sighting(&TagSighting::new("gate", 1, "ab12", 30_000_000));
//! assert!(outcome.is_lap());
//! assert_eq!(engine.leaderboard()[0].lap_count, 1);
//! ```

#![deny(static_mut_refs)]

pub mod engine;
pub mod names;
pub mod rider;
pub mod tasks;

pub use engine::{EngineSnapshot, LapAggregationEngine, PurgeReport, SightingOutcome};
pub use names::{NameLookup, NameTable};
pub use rider::{ActiveRider, LapRecord, Standing};
pub use tasks::{PumpStats, pump_reader_events, run_purge_timer};
