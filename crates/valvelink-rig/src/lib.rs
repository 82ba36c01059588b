//! Water system rig host
//!
//! This crate drives a valve rig over the `valvelink-messenger` protocol. A
//! [`Session`] probes the device, synchronizes the valve state and then
//! exposes one method per firmware command:
//!
//! - `reset_trace`, `set_operation_mode`, `set_beam_break_threshold`,
//!   `set_dispensing_duration`, `set_dispensing_probability`,
//!   `set_valves_state`: sent without waiting for an acknowledgement
//! - `get_stats`: waits for the `stats` response, or reports nothing on timeout
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use valvelink_messenger::schema;
//! use valvelink_rig::{RigConfig, Session};
//!
//! let table = Arc::new(schema::water_system_table()?);
//! let mut session = Session::connect(port, table, RigConfig::default())?;
//! if let Some(stats) = session.get_stats()? {
//!     println!("{} rewards since {}", stats.dispensed_count, stats.reset_time);
//! }
//! ```

mod config;
mod discovery;
mod error;
mod session;
mod stats;
mod types;

pub use config::*;
pub use discovery::*;
pub use error::*;
pub use session::*;
pub use stats::*;
pub use types::*;
