//! Request/response driver over a [`Transport`].
//!
//! There are no request ids on the wire, so a response is correlated with a
//! request only by name: [`Messenger::receive`] polls the transport until a
//! frame with the expected name decodes or the timeout runs out, and throws
//! everything else away. Undecodable frames are logged and skipped; the
//! terminator scan keeps the following frames intact.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::codec::Value;
use crate::error::{MessengerError, TransportError};
use crate::frame::{DecodedResponse, FrameDecoder, FrameEncoder};
use crate::telemetry::*;
use crate::schema;
use crate::table::CommandTable;
use crate::transport::Transport;

/// Default pause between transport reads while waiting for a frame.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Sends commands and polls for responses on one transport.
#[derive(Debug)]
pub struct Messenger<T> {
    transport: T,
    decoder: FrameDecoder,
    poll_interval: Duration,
}

impl<T: Transport> Messenger<T> {
    /// Create a messenger using `table` for both directions.
    pub fn new(transport: T, table: Arc<CommandTable>) -> Self {
        Messenger {
            transport,
            decoder: FrameDecoder::new(table),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the pause between transport reads.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// The shared command table.
    pub fn table(&self) -> &Arc<CommandTable> {
        self.decoder.table()
    }

    /// Encode `name` with `args` and write the frame.
    ///
    /// Nothing is written if encoding fails.
    pub fn send(&mut self, name: &str, args: &[Value]) -> Result<(), MessengerError> {
        let entry = self.decoder.table().lookup_by_name(name)?;
        let frame = FrameEncoder::encode(entry, args)?;
        trace!(
            "Sending '{}' ({} bytes): {}",
            name,
            frame.len(),
            String::from_utf8_lossy(&frame)
        );
        self.transport.write(&frame)?;
        metrics::counter!(FRAMES_SENT.name).increment(1);
        Ok(())
    }

    /// Poll until a frame named `expected` (or any frame, if `None`) decodes.
    ///
    /// Returns `Ok(None)` once `timeout` has elapsed without a match; it never
    /// returns `None` earlier than that. Only transport failures are errors.
    /// Bytes of a frame still in flight stay buffered for the next call.
    pub fn receive(
        &mut self,
        expected: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<DecodedResponse>, TransportError> {
        let start = Instant::now();
        loop {
            let data = self.transport.read_available()?;
            if !data.is_empty() {
                self.decoder.feed(&data);
            }

            while let Some(result) = self.decoder.next_response() {
                match result {
                    Ok(response) => {
                        metrics::counter!(FRAMES_RECEIVED.name).increment(1);
                        if expected.map_or(true, |name| name == response.name) {
                            trace!("Received '{}'", response.name);
                            return Ok(Some(response));
                        }
                        self.log_skipped(&response, expected);
                        metrics::counter!(FRAMES_SKIPPED.name).increment(1);
                    }
                    Err(e) => {
                        warn!("Dropping undecodable frame: {}", e);
                        metrics::counter!(FRAMES_MALFORMED.name).increment(1);
                    }
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                debug!(
                    "No '{}' frame within {:?}",
                    expected.unwrap_or("*"),
                    timeout
                );
                metrics::counter!(RECEIVE_TIMEOUTS.name).increment(1);
                return Ok(None);
            }
            thread::sleep(self.poll_interval.min(timeout - elapsed));
        }
    }

    fn log_skipped(&self, response: &DecodedResponse, expected: Option<&str>) {
        if response.name == schema::ERROR {
            let message = response.value(0).and_then(Value::as_str).unwrap_or("");
            warn!("Device reported error while waiting for '{}': {}", expected.unwrap_or("*"), message);
        } else {
            debug!(
                "Skipping '{}' while waiting for '{}'",
                response.name,
                expected.unwrap_or("*")
            );
        }
    }

    /// Number of bytes held for a frame that has not completed yet.
    pub fn buffered_len(&self) -> usize {
        self.decoder.buffered_len()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back, dropping any buffered bytes.
    pub fn into_transport(self) -> T {
        self.transport
    }
}
