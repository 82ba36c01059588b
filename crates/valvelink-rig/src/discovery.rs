//! Endpoint discovery.
//!
//! Tries candidate endpoints one after another and keeps the first whose
//! device answers `probe` with the configured identity.

use std::fmt::Display;
use std::sync::Arc;

use tracing::{debug, info};
use valvelink_messenger::{CommandTable, Transport};

use crate::config::RigConfig;
use crate::session::Session;

/// An endpoint whose device identified itself.
#[derive(Debug)]
pub struct Discovered<E, T> {
    /// The endpoint that answered.
    pub endpoint: E,
    /// Session in the `Identified` state; call [`Session::start`] next.
    pub session: Session<T>,
}

/// Probe each candidate in order.
///
/// `open` turns an endpoint into a transport. Endpoints that fail to open,
/// fail mid-probe or report another identity are skipped. Returns `None` if
/// no candidate matched.
pub fn discover<E, T, I, F, OpenErr>(
    candidates: I,
    mut open: F,
    table: Arc<CommandTable>,
    config: &RigConfig,
) -> Option<Discovered<E, T>>
where
    E: Display,
    T: Transport,
    I: IntoIterator<Item = E>,
    F: FnMut(&E) -> Result<T, OpenErr>,
    OpenErr: Display,
{
    for endpoint in candidates {
        let transport = match open(&endpoint) {
            Ok(transport) => transport,
            Err(e) => {
                debug!(endpoint = %endpoint, error = %e, "Cannot open endpoint");
                continue;
            }
        };

        let mut session = match Session::new(transport, table.clone(), config.clone()) {
            Ok(session) => session,
            Err(e) => {
                debug!(endpoint = %endpoint, error = %e, "Cannot start session");
                continue;
            }
        };

        match session.identify() {
            Ok(()) => {
                info!(endpoint = %endpoint, identity = config.identity(), "Found water system");
                return Some(Discovered { endpoint, session });
            }
            Err(e) => debug!(endpoint = %endpoint, error = %e, "Not a match"),
        }
    }
    None
}
