//! Request/response channel to one reader.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace, warn};
use trackside_errors::{ReaderError, ReaderResult};
use trackside_llrp_protocol::{Envelope, Message};

use crate::transport::FrameTransport;

/// Messages held back while a transact waits for its response.
const MAX_PENDING: usize = 1024;

/// A framed, typed channel to a single reader.
///
/// The link stamps every outbound message with a fresh id from a
/// per-session counter. Responses are matched by type, not by id; anything
/// else that arrives while [`ReaderLink::transact`] waits is queued and
/// handed out by the next [`ReaderLink::receive`].
pub struct ReaderLink<T> {
    reader_id: String,
    transport: T,
    next_message_id: u32,
    pending: VecDeque<Envelope>,
}

impl<T: FrameTransport> ReaderLink<T> {
    pub fn new(reader_id: impl Into<String>, transport: T) -> Self {
        Self {
            reader_id: reader_id.into(),
            transport,
            next_message_id: 1,
            pending: VecDeque::new(),
        }
    }

    pub fn reader_id(&self) -> &str {
        &self.reader_id
    }

    pub fn peer(&self) -> String {
        self.transport.peer()
    }

    /// Number of queued, not yet received messages.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn allocate_message_id(&mut self) -> u32 {
        let id = self.next_message_id;
        self.next_message_id = self.next_message_id.wrapping_add(1);
        id
    }

    /// Send one message and return the id it was sent with.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the message cannot be encoded and a
    /// transport error if the write fails.
    pub async fn send(&mut self, message: &Message) -> ReaderResult<u32> {
        let message_id = self.allocate_message_id();
        let frame = message.encode(message_id)?;
        trace!(
            reader_id = %self.reader_id,
            message = %message.name(),
            message_id,
            bytes = frame.len(),
            "Sending"
        );
        self.transport.write_frame(&frame).await?;
        Ok(message_id)
    }

    async fn read_envelope(&mut self) -> ReaderResult<Envelope> {
        let frame = self.transport.read_frame().await?;
        let envelope = Envelope::decode(&frame)?;
        trace!(
            reader_id = %self.reader_id,
            message = %envelope.message.name(),
            message_id = envelope.message_id,
            bytes = frame.len(),
            "Received"
        );
        Ok(envelope)
    }

    /// Receive one message, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the connection failed and a protocol
    /// error if a frame could not be decoded. A decode failure consumes the
    /// offending frame, so the next call continues with the following one.
    pub async fn receive(&mut self, timeout: Duration) -> ReaderResult<Option<Envelope>> {
        if let Some(envelope) = self.pending.pop_front() {
            return Ok(Some(envelope));
        }
        match tokio::time::timeout(timeout, self.read_envelope()).await {
            Ok(result) => result.map(Some),
            Err(_elapsed) => Ok(None),
        }
    }

    /// Send `request` and wait up to `timeout` for its response.
    ///
    /// The response is the first message of the request's response type, or
    /// the first ERROR_MESSAGE. Its status is not inspected here.
    ///
    /// # Errors
    ///
    /// Returns a timeout error if no response arrives in time, a protocol
    /// error if `request` has no response type or a frame fails to decode,
    /// and a transport error if the connection fails.
    pub async fn transact(&mut self, request: &Message, timeout: Duration) -> ReaderResult<Envelope> {
        let request_type = request.message_type().ok_or_else(|| {
            ReaderError::protocol(format!("{} cannot be sent as a request", request.name()))
        })?;
        if request_type.response_type().is_none() {
            return Err(ReaderError::protocol(format!(
                "{request_type} has no response message"
            )));
        }

        self.send(request).await?;
        let deadline = Instant::now() + timeout;
        loop {
            let read = tokio::time::timeout_at(deadline, self.read_envelope()).await;
            let Ok(envelope) = read else {
                return Err(ReaderError::timeout(request_type.name(), timeout));
            };
            let envelope = envelope?;
            if envelope.message.answers(request_type)
                || matches!(envelope.message, Message::ErrorMessage { .. })
            {
                return Ok(envelope);
            }
            debug!(
                reader_id = %self.reader_id,
                waiting_for = %request_type,
                message = %envelope.message.name(),
                "Queueing message received during transact"
            );
            if self.pending.len() >= MAX_PENDING {
                warn!(reader_id = %self.reader_id, "Pending queue full, dropping oldest message");
                self.pending.pop_front();
            }
            self.pending.push_back(envelope);
        }
    }

    /// Close the underlying transport.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the close fails.
    pub async fn close(&mut self) -> ReaderResult<()> {
        self.transport.close().await
    }
}
