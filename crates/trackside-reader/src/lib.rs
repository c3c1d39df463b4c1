//! Reader sessions for Trackside.
//!
//! [`ReaderSessionController`] brings one LLRP reader through its
//! handshake, arms a single ROSpec and turns the resulting report stream
//! into [`trackside_core::ReaderEvent`]s via a [`TagEventStream`].
//!
//! ```no_run
//! use trackside_config::ReaderSettings;
//! use trackside_core::{EventSink, StopSignal};
//! use trackside_link::TcpConnector;
//! use trackside_reader::ReaderSessionController;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ReaderSettings::builder("finish-line").address("192.168.1.50").build()?;
//! let (events, _events_rx) = EventSink::channel();
//! let mut session =
//!     ReaderSessionController::new(settings, TcpConnector::default(), events, EventSink::null());
//! session.run(&StopSignal::new()).await?;
//! # Ok(())
//! # }
//! ```

#![deny(static_mut_refs)]

pub mod session;
pub mod simulate;
pub mod state;
pub mod stream;

pub use session::{ReaderSessionController, check_status};
pub use simulate::{SIMULATED_EPC_PREFIX, Simulator};
pub use state::SessionState;
pub use stream::{RecordDefect, StreamStats, TagEventStream};
