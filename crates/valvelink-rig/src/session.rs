//! Rig session.
//!
//! A [`Session`] owns the protocol state for one link and walks through
//! three states:
//!
//! 1. **Unidentified**: freshly constructed, nothing sent yet
//! 2. **Identified**: the device answered `probe` with the expected identity
//! 3. **Operating**: the valve state has been pushed and commands are allowed
//!
//! A failed probe or a transport error leaves the session in `Failed`, and
//! every later operation is refused.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use valvelink_messenger::{schema, CommandTable, Messenger, Transport, Value};

use crate::config::RigConfig;
use crate::error::{SessionError, SessionResult};
use crate::stats::Stats;
use crate::types::OperationMode;

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not yet probed.
    Unidentified,
    /// Probe succeeded; valve state not yet synchronized.
    Identified,
    /// Ready for domain operations.
    Operating,
    /// Probe or link failure; the session is unusable.
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Unidentified => "unidentified",
            SessionState::Identified => "identified",
            SessionState::Operating => "operating",
            SessionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Host side of one water system link.
///
/// A session must be driven by one caller at a time; there are no request
/// ids on the wire, so overlapping exchanges would steal each other's
/// responses.
#[derive(Debug)]
pub struct Session<T> {
    messenger: Messenger<T>,
    config: RigConfig,
    state: SessionState,
    /// `false` is closed.
    valve_state: Vec<bool>,
}

impl<T: Transport> Session<T> {
    /// Create an unidentified session on `transport`.
    ///
    /// Fails with [`SessionError::SchemaMismatch`] if the configuration pins
    /// a fingerprint that `table` does not have.
    pub fn new(transport: T, table: Arc<CommandTable>, config: RigConfig) -> SessionResult<Self> {
        let fingerprint = table.fingerprint();
        if let Some(expected) = &config.schema_fingerprint {
            if !expected.eq_ignore_ascii_case(&fingerprint) {
                return Err(SessionError::SchemaMismatch {
                    expected: expected.clone(),
                    actual: fingerprint,
                });
            }
        }
        debug!(fingerprint = %fingerprint, entries = table.len(), "Command table loaded");

        let valves = table.lookup_by_name(schema::SET_VALVES_STATE)?.signature.len();
        let messenger = Messenger::new(transport, table).with_poll_interval(config.poll_interval());

        Ok(Session {
            messenger,
            config,
            state: SessionState::Unidentified,
            valve_state: vec![false; valves],
        })
    }

    /// Create a session, probe the device and synchronize the valves.
    pub fn connect(transport: T, table: Arc<CommandTable>, config: RigConfig) -> SessionResult<Self> {
        let mut session = Session::new(transport, table, config)?;
        session.identify()?;
        session.start()?;
        Ok(session)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    /// In-memory valve state, one entry per valve.
    pub fn valve_state(&self) -> &[bool] {
        &self.valve_state
    }

    /// Send `probe` and check the identity in `probe_result`.
    ///
    /// Any outcome other than the expected identity within the probe timeout
    /// fails the session with [`SessionError::ProbeMismatch`]. No retry is
    /// attempted.
    pub fn identify(&mut self) -> SessionResult<()> {
        self.require(SessionState::Unidentified, "probe")?;

        let result = self.probe();
        match &result {
            Ok(()) => {
                info!(identity = self.config.identity(), "Device identified");
                self.state = SessionState::Identified;
            }
            Err(e) => {
                warn!(error = %e, "Probe failed");
                self.state = SessionState::Failed;
            }
        }
        result
    }

    fn probe(&mut self) -> SessionResult<()> {
        self.messenger.send(schema::PROBE, &[])?;
        let response = self
            .messenger
            .receive(Some(schema::PROBE_RESULT), self.config.probe_timeout())?;

        let expected = self.config.identity();
        let found = response.and_then(|r| r.value(0).and_then(Value::as_str).map(str::to_string));
        match found {
            Some(identity) if identity == expected => Ok(()),
            found => Err(SessionError::ProbeMismatch {
                expected: expected.to_string(),
                found,
            }),
        }
    }

    /// Push the in-memory valve state and enter `Operating`.
    pub fn start(&mut self) -> SessionResult<()> {
        self.require(SessionState::Identified, "start")?;
        let state = self.valve_state.clone();
        self.send_valves(&state)?;
        self.state = SessionState::Operating;
        debug!(valves = ?self.valve_state, "Session operating");
        Ok(())
    }

    /// Clear the firmware's dispense trace and reset time.
    pub fn reset_trace(&mut self) -> SessionResult<()> {
        self.command(schema::RESET_TRACE, &[], "reset trace")
    }

    pub fn set_operation_mode(&mut self, mode: OperationMode) -> SessionResult<()> {
        debug!(mode = %mode, "Setting operation mode");
        self.command(
            schema::SET_OPERATION_MODE,
            &[Value::Int32(mode.code())],
            "set operation mode",
        )
    }

    /// Set the beam break threshold (ratio of the baseline reading).
    pub fn set_beam_break_threshold(&mut self, threshold: f32) -> SessionResult<()> {
        self.command(
            schema::SET_BEAM_BREAK_THRESHOLD,
            &[Value::Float32(threshold)],
            "set beam break threshold",
        )
    }

    /// Set how long, in milliseconds, a valve stays open per reward.
    pub fn set_dispensing_duration(&mut self, duration_ms: i32) -> SessionResult<()> {
        self.command(
            schema::SET_DISPENSING_DURATION,
            &[Value::Int32(duration_ms)],
            "set dispensing duration",
        )
    }

    /// Set the probability (0.0-1.0) that a beam break dispenses.
    pub fn set_dispensing_probability(&mut self, probability: f32) -> SessionResult<()> {
        self.command(
            schema::SET_DISPENSING_PROBABILITY,
            &[Value::Float32(probability)],
            "set dispensing probability",
        )
    }

    /// Open (`true`) or close (`false`) each valve.
    ///
    /// `state` must hold one entry per valve; otherwise nothing is written
    /// and the in-memory state is unchanged.
    pub fn set_valves_state(&mut self, state: &[bool]) -> SessionResult<()> {
        self.require(SessionState::Operating, "set valves state")?;
        self.send_valves(state)
    }

    /// Invert every valve.
    pub fn toggle_valves(&mut self) -> SessionResult<()> {
        let toggled: Vec<bool> = self.valve_state.iter().map(|open| !open).collect();
        self.set_valves_state(&toggled)
    }

    /// Request statistics.
    ///
    /// Returns `Ok(None)` if no `stats` frame arrives within the stats
    /// timeout; a busy device is not an error.
    pub fn get_stats(&mut self) -> SessionResult<Option<Stats>> {
        self.require(SessionState::Operating, "get stats")?;
        self.guard(|s| s.messenger.send(schema::GET_STATS, &[]).map_err(Into::into))?;

        let timeout = self.config.stats_timeout();
        let response = self.guard(|s| {
            s.messenger
                .receive(Some(schema::STATS), timeout)
                .map_err(Into::into)
        })?;

        match response {
            Some(response) => {
                let stats = Stats::from_response(&response)?;
                debug!(
                    reset_time = stats.reset_time,
                    dispensed = stats.dispensed_count,
                    "Stats received"
                );
                Ok(Some(stats))
            }
            None => {
                info!(timeout_ms = timeout.as_millis() as u64, "Stats unavailable");
                Ok(None)
            }
        }
    }

    /// End the session and hand the transport back.
    pub fn close(self) -> T {
        debug!(state = %self.state, "Closing session");
        self.messenger.into_transport()
    }

    fn send_valves(&mut self, state: &[bool]) -> SessionResult<()> {
        let args: Vec<Value> = state.iter().map(|open| Value::Int32(i32::from(*open))).collect();
        self.guard(|s| {
            s.messenger
                .send(schema::SET_VALVES_STATE, &args)
                .map_err(Into::into)
        })?;
        self.valve_state = state.to_vec();
        Ok(())
    }

    fn command(&mut self, name: &str, args: &[Value], operation: &'static str) -> SessionResult<()> {
        self.require(SessionState::Operating, operation)?;
        self.guard(|s| s.messenger.send(name, args).map_err(Into::into))
    }

    fn require(&self, state: SessionState, operation: &'static str) -> SessionResult<()> {
        if self.state != state {
            return Err(SessionError::InvalidState {
                state: self.state,
                operation,
            });
        }
        Ok(())
    }

    /// Run `f`, failing the session if the link breaks.
    fn guard<R>(&mut self, f: impl FnOnce(&mut Self) -> SessionResult<R>) -> SessionResult<R> {
        let result = f(self);
        if let Err(SessionError::Transport(e)) = &result {
            warn!(error = %e, "Link failed");
            self.state = SessionState::Failed;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valvelink_messenger::{schema::water_system_table, ScriptedTransport};

    fn table() -> Arc<CommandTable> {
        Arc::new(water_system_table().unwrap())
    }

    fn fast_config() -> RigConfig {
        RigConfig {
            probe_timeout_ms: 30,
            stats_timeout_ms: 30,
            poll_interval_ms: 1,
            ..RigConfig::default()
        }
    }

    fn device() -> ScriptedTransport {
        ScriptedTransport::new()
            .with_responder(|frame| (frame == b"0;").then(|| b"8,water_system_normal;\r\n".to_vec()))
    }

    #[test]
    fn test_state_machine() {
        let mut session = Session::new(device(), table(), fast_config()).unwrap();
        assert_eq!(session.state(), SessionState::Unidentified);
        assert!(matches!(
            session.reset_trace(),
            Err(SessionError::InvalidState { state: SessionState::Unidentified, .. })
        ));

        session.identify().unwrap();
        assert_eq!(session.state(), SessionState::Identified);
        session.start().unwrap();
        assert_eq!(session.state(), SessionState::Operating);

        let transport = session.close();
        assert_eq!(transport.written_text(), vec!["0;", "6,0,0,0;"]);
    }

    #[test]
    fn test_identify_twice_refused() {
        let mut session = Session::connect(device(), table(), fast_config()).unwrap();
        assert!(matches!(
            session.identify(),
            Err(SessionError::InvalidState { state: SessionState::Operating, .. })
        ));
    }

    #[test]
    fn test_schema_fingerprint_pin() {
        let table = table();
        let good = RigConfig {
            schema_fingerprint: Some(table.fingerprint().to_uppercase()),
            ..fast_config()
        };
        assert!(Session::new(ScriptedTransport::new(), table.clone(), good).is_ok());

        let bad = RigConfig {
            schema_fingerprint: Some("00".into()),
            ..fast_config()
        };
        assert!(matches!(
            Session::new(ScriptedTransport::new(), table, bad),
            Err(SessionError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_commands_encode() {
        let mut session = Session::connect(device(), table(), fast_config()).unwrap();
        session.reset_trace().unwrap();
        session
            .set_operation_mode(OperationMode::AlternatingRewardDispensing)
            .unwrap();
        session.set_beam_break_threshold(0.25).unwrap();
        session.set_dispensing_duration(120).unwrap();
        session.set_dispensing_probability(0.75).unwrap();

        let written = session.close().written_text();
        assert_eq!(
            &written[2..],
            &["1;", "2,2;", "3,0.25;", "4,120;", "5,0.75;"]
        );
    }

    #[test]
    fn test_toggle_valves() {
        let mut session = Session::connect(device(), table(), fast_config()).unwrap();
        session.set_valves_state(&[true, false, true]).unwrap();
        session.toggle_valves().unwrap();
        assert_eq!(session.valve_state(), &[false, true, false]);

        let written = session.close().written_text();
        assert_eq!(written.last().unwrap(), "6,0,1,0;");
    }

    #[test]
    fn test_transport_failure_fails_session() {
        let mut session = Session::connect(device(), table(), fast_config()).unwrap();
        session.messenger.transport_mut().close();

        assert!(matches!(session.reset_trace(), Err(SessionError::Transport(_))));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(matches!(
            session.get_stats(),
            Err(SessionError::InvalidState { state: SessionState::Failed, .. })
        ));
    }
}
