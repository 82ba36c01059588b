//! Frame encoding/decoding utilities.
//!
//! Every message is one text frame:
//!
//! ```text
//! <id>,<field1>,<field2>,...,<fieldN>;
//! ```
//!
//! The id is a plain decimal integer. Fields are the codec's textual tokens,
//! with `,`, `;` and `/` escaped by `/` inside string fields. The firmware may
//! follow each frame with a line ending, which is ignored.
//!
//! The terminator scan honours escapes, so an unpaired `/` right before a `;`
//! joins that frame with the next one; the merged frame then fails to decode
//! and both are lost. Bytes that are not valid UTF-8 are replaced with
//! U+FFFD and logged.

use std::borrow::Cow;
use std::sync::Arc;

use bytes::BytesMut;
use log::warn;

use crate::codec::{decode_field, encode_field, split_fields, TokenCursor, Value};
use crate::constants::*;
use crate::error::{ProtocolError, ProtocolResult};
use crate::table::{CommandEntry, CommandTable};

/// Initial decoder buffer size; a full `stats` frame is a few kilobytes.
pub const INITIAL_BUFFER_SIZE: usize = 8 * 1024;

/// One complete, undecoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Wire identifier.
    pub id: u16,
    /// Field tokens, still escaped.
    pub raw_fields: Vec<String>,
}

/// A frame decoded against its registered signature.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedResponse {
    /// Registered name.
    pub name: String,
    /// Wire identifier.
    pub id: u16,
    /// One value per signature slot.
    pub values: Vec<Value>,
}

impl DecodedResponse {
    /// Get the value at signature position `index`.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// Builds outbound frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameEncoder;

impl FrameEncoder {
    /// Encode `entry` with `args` into one frame.
    ///
    /// Fails without producing anything if the argument count or any
    /// argument type does not match the entry's signature.
    pub fn encode(entry: &CommandEntry, args: &[Value]) -> ProtocolResult<Vec<u8>> {
        if args.len() != entry.signature.len() {
            return Err(ProtocolError::ArityOrTypeMismatch {
                command: entry.name.clone(),
                detail: format!(
                    "expected {} arguments, got {}",
                    entry.signature.len(),
                    args.len()
                ),
            });
        }

        let mut buf = entry.id.to_string().into_bytes();
        for (index, (arg, ty)) in args.iter().zip(entry.signature.iter()).enumerate() {
            let text = encode_field(arg, *ty).map_err(|mismatch| {
                ProtocolError::ArityOrTypeMismatch {
                    command: entry.name.clone(),
                    detail: format!("argument {}: {}", index, mismatch),
                }
            })?;
            buf.push(FIELD_SEPARATOR);
            buf.extend_from_slice(text.as_bytes());
        }
        buf.push(COMMAND_TERMINATOR);
        Ok(buf)
    }
}

/// Splits an inbound byte stream into frames and decodes them.
///
/// Bytes that do not yet form a complete frame stay buffered across calls.
#[derive(Debug)]
pub struct FrameDecoder {
    table: Arc<CommandTable>,
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Create a decoder resolving ids against `table`.
    pub fn new(table: Arc<CommandTable>) -> Self {
        FrameDecoder {
            table,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
        }
    }

    /// The table frames are resolved against.
    pub fn table(&self) -> &Arc<CommandTable> {
        &self.table
    }

    /// Add received data to the buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Take the oldest complete frame out of the buffer.
    ///
    /// Returns `None` if no unescaped terminator has arrived yet. A frame
    /// whose id is not a decimal integer is removed and reported as
    /// [`ProtocolError::MalformedFrame`]; blank frames are dropped silently.
    pub fn try_take_frame(&mut self) -> Option<ProtocolResult<Frame>> {
        loop {
            let end = self.find_terminator()?;
            let raw = self.buffer.split_to(end + 1);
            let body = String::from_utf8_lossy(&raw[..end]);
            if let Cow::Owned(_) = &body {
                warn!("Frame is not valid UTF-8, invalid bytes replaced: {:?}", body);
            }
            let body = body.trim_start_matches(|c: char| c.is_ascii_whitespace());
            if body.is_empty() {
                continue;
            }
            return Some(parse_frame(body));
        }
    }

    /// Decode a frame against its registered signature.
    pub fn decode(&self, frame: &Frame) -> ProtocolResult<DecodedResponse> {
        let entry = self.table.lookup_by_id(frame.id)?;

        let expected = entry.token_count();
        if frame.raw_fields.len() != expected {
            return Err(ProtocolError::FieldCount {
                command: entry.name.clone(),
                expected,
                actual: frame.raw_fields.len(),
            });
        }

        let mut cursor = TokenCursor::new(&frame.raw_fields);
        let mut values = Vec::with_capacity(entry.signature.len());
        for (index, ty) in entry.signature.iter().enumerate() {
            let value = decode_field(&mut cursor, *ty).map_err(|source| {
                ProtocolError::FieldDecodeError {
                    command: entry.name.clone(),
                    index,
                    source,
                }
            })?;
            values.push(value);
        }

        Ok(DecodedResponse {
            name: entry.name.clone(),
            id: entry.id,
            values,
        })
    }

    /// Take and decode the next frame, if one is complete.
    pub fn next_response(&mut self) -> Option<ProtocolResult<DecodedResponse>> {
        let frame = self.try_take_frame()?;
        Some(frame.and_then(|frame| self.decode(&frame)))
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Index of the first terminator not consumed by an escape.
    fn find_terminator(&self) -> Option<usize> {
        let mut i = 0;
        while i < self.buffer.len() {
            match self.buffer[i] {
                ESCAPE_CHAR => i += 2,
                COMMAND_TERMINATOR => return Some(i),
                _ => i += 1,
            }
        }
        None
    }
}

fn parse_frame(body: &str) -> ProtocolResult<Frame> {
    let mut tokens = split_fields(body);
    let id_token = tokens.remove(0);
    let id = id_token
        .trim()
        .parse::<u16>()
        .map_err(|_| ProtocolError::MalformedFrame(format!("invalid command id {:?}", id_token)))?;
    Ok(Frame {
        id,
        raw_fields: tokens,
    })
}
