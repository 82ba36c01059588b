//! Byte transport seam.
//!
//! The protocol only needs two primitives from the link: write a whole frame,
//! and read whatever bytes have arrived without blocking. Serial ports, TCP
//! bridges and test doubles all plug in through [`Transport`].

use std::collections::VecDeque;

use crate::error::TransportError;

/// A bidirectional, non-blocking byte link.
pub trait Transport {
    /// Write a complete frame.
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Return the bytes that have arrived since the last call; may be empty.
    fn read_available(&mut self) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).write(data)
    }

    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        (**self).read_available()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).write(data)
    }

    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        (**self).read_available()
    }
}

type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>> + Send>;

/// In-memory transport replaying scripted inbound data.
///
/// Each call to [`Transport::read_available`] hands out the next queued chunk.
/// Every written frame is recorded, and an optional responder can queue a
/// reply for each write, which is how a device is simulated in tests.
#[derive(Default)]
pub struct ScriptedTransport {
    inbound: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    responder: Option<Responder>,
    closed: bool,
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("inbound", &self.inbound.len())
            .field("written", &self.written.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl ScriptedTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a responder called with every written frame.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Queue a chunk to be returned by a later read.
    pub fn push_inbound(&mut self, data: impl Into<Vec<u8>>) {
        self.inbound.push_back(data.into());
    }

    /// Frames written so far, oldest first.
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    /// Written frames as text, for assertions.
    pub fn written_text(&self) -> Vec<String> {
        self.written
            .iter()
            .map(|frame| String::from_utf8_lossy(frame).into_owned())
            .collect()
    }

    /// Make every later call fail with [`TransportError::Closed`].
    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl Transport for ScriptedTransport {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.written.push(data.to_vec());
        if let Some(responder) = self.responder.as_mut() {
            if let Some(reply) = responder(data) {
                self.inbound.push_back(reply);
            }
        }
        Ok(())
    }

    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        Ok(self.inbound.pop_front().unwrap_or_default())
    }
}
