//! Valvelink command-messenger protocol
//!
//! This crate implements the text protocol spoken between a host and the
//! water system firmware over a serial link. Both sides share one ordered
//! table of named commands and responses; a command's wire id is its position
//! in that table.
//!
//! # Protocol Overview
//!
//! - **Frames**: `<id>,<field>,...,<field>;` with `/` escaping `,`, `;` and
//!   `/` inside string fields
//! - **Commands** (host → firmware): ids 0-7, see [`schema::COMMANDS`]
//! - **Responses** (firmware → host): ids 8-10, see [`schema::RESPONSES`]
//! - **Correlation**: by response name only; unrelated frames are skipped
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use valvelink_messenger::{schema, Messenger, Value};
//!
//! let table = Arc::new(schema::water_system_table()?);
//! let mut messenger = Messenger::new(port, table);
//!
//! messenger.send(schema::PROBE, &[])?;
//! let reply = messenger.receive(Some(schema::PROBE_RESULT), Duration::from_secs(1))?;
//! ```

mod codec;
mod constants;
mod error;
mod frame;
mod poller;
pub mod schema;
mod table;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
mod test_log;

pub use codec::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use poller::*;
pub use table::*;
pub use transport::{ScriptedTransport, Transport};
