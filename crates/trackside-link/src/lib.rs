//! Framed request/response channel to one LLRP reader.
//!
//! [`ReaderLink`] owns a [`FrameTransport`] and adds what the session needs
//! on top of raw frames: message id allocation, typed send and receive with
//! a timeout, and [`ReaderLink::transact`] which waits for the response type
//! matching a request.
//!
//! The `mock` feature exposes an in-memory scripted reader for tests of code
//! built on this crate.

#![deny(static_mut_refs)]

pub mod link;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod transport;

pub use link::ReaderLink;
pub use transport::{Connector, FrameTransport, TcpConnector, TcpTransport};
