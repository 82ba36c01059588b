//! End-to-end session tests against a scripted water system.

use std::sync::Arc;
use std::time::{Duration, Instant};

use valvelink_messenger::{
    schema, CommandTable, ProtocolError, ScriptedTransport, MAXIMUM_TRACE_LENGTH,
};
use valvelink_rig::{
    DispenseEvent, OperationMode, RigConfig, Session, SessionError, SessionState,
};

fn table() -> Arc<CommandTable> {
    Arc::new(schema::water_system_table().expect("schema should build"))
}

fn config() -> RigConfig {
    RigConfig {
        probe_timeout_ms: 40,
        stats_timeout_ms: 40,
        poll_interval_ms: 1,
        ..RigConfig::default()
    }
}

/// Build a `stats` frame with `slots` followed by junk padding.
fn stats_frame(reset_time: u32, count: i32, slots: &[(u32, bool)]) -> String {
    let mut text = format!("9,{},{}", reset_time, count);
    for i in 0..MAXIMUM_TRACE_LENGTH {
        let (timestamp, flag) = slots.get(i).copied().unwrap_or((4_000_000 + i as u32, true));
        text.push_str(&format!(",{},{}", timestamp, u8::from(flag)));
    }
    text.push_str(";\r\n");
    text
}

/// A device that identifies itself and answers `get_stats` after first
/// replaying a stale `probe_result` and a device error.
fn water_system(identity: &'static str) -> ScriptedTransport {
    ScriptedTransport::new().with_responder(move |frame| match frame {
        b"0;" => Some(format!("8,{};\r\n", identity).into_bytes()),
        b"7;" => {
            let mut reply = format!("8,{};\r\n10,busy/, retry;\r\n", identity);
            reply.push_str(&stats_frame(500, 2, &[(10, true), (20, false)]));
            Some(reply.into_bytes())
        }
        _ => None,
    })
}

#[test]
fn test_connect_syncs_valves() {
    let session = Session::connect(water_system("water_system_normal"), table(), config())
        .expect("connect should succeed");
    assert_eq!(session.state(), SessionState::Operating);
    assert_eq!(session.valve_state(), &[false, false, false]);

    let written = session.close().written_text();
    assert_eq!(written, vec!["0;", "6,0,0,0;"]);
}

#[test]
fn test_get_stats_skips_stale_frames_and_truncates_trace() {
    let mut session = Session::connect(water_system("water_system_normal"), table(), config())
        .expect("connect should succeed");

    let stats = session
        .get_stats()
        .expect("stats request should not fail")
        .expect("stats should arrive");

    assert_eq!(stats.reset_time, 500);
    assert_eq!(stats.dispensed_count, 2);
    assert_eq!(
        stats.trace,
        vec![
            DispenseEvent { timestamp: 10, flag: true },
            DispenseEvent { timestamp: 20, flag: false },
        ]
    );
}

#[test]
fn test_get_stats_timeout_is_not_fatal() {
    let device = ScriptedTransport::new()
        .with_responder(|frame| (frame == b"0;").then(|| b"8,water_system_normal;".to_vec()));
    let mut session = Session::connect(device, table(), config()).expect("connect should succeed");

    let start = Instant::now();
    let stats = session.get_stats().expect("timeout is not an error");
    assert!(stats.is_none());
    assert!(start.elapsed() >= Duration::from_millis(40));
    assert_eq!(session.state(), SessionState::Operating);

    // Still usable afterwards.
    session.reset_trace().expect("session should still accept commands");
}

#[test]
fn test_probe_without_answer_fails() {
    let mut session =
        Session::new(ScriptedTransport::new(), table(), config()).expect("session should build");

    match session.identify() {
        Err(SessionError::ProbeMismatch { expected, found }) => {
            assert_eq!(expected, "water_system_normal");
            assert_eq!(found, None);
        }
        other => panic!("expected probe mismatch, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Failed);
    assert!(matches!(
        session.start(),
        Err(SessionError::InvalidState { .. })
    ));
}

#[test]
fn test_probe_with_wrong_identity_fails() {
    let result = Session::connect(water_system("three_arm_water_system"), table(), config());
    match result {
        Err(SessionError::ProbeMismatch { found, .. }) => {
            assert_eq!(found.as_deref(), Some("three_arm_water_system"));
        }
        other => panic!("expected probe mismatch, got {other:?}"),
    }
}

#[test]
fn test_three_arm_variant_identifies() {
    let config = RigConfig::from_yaml_str("variant: three_arm\nprobe_timeout_ms: 40\npoll_interval_ms: 1\n")
        .expect("config should parse");
    let session = Session::connect(water_system("three_arm_water_system"), table(), config);
    assert!(session.is_ok());
}

#[test]
fn test_valve_arity_checked_before_writing() {
    let mut session = Session::connect(water_system("water_system_normal"), table(), config())
        .expect("connect should succeed");

    let err = session.set_valves_state(&[true, true]).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::ArityOrTypeMismatch { .. })
    ));
    assert_eq!(session.valve_state(), &[false, false, false]);
    assert_eq!(session.state(), SessionState::Operating);

    let written = session.close().written_text();
    assert_eq!(written.len(), 2, "nothing written after the failed call");
}

#[test]
fn test_full_operating_sequence() {
    let mut session = Session::connect(water_system("water_system_normal"), table(), config())
        .expect("connect should succeed");

    session.set_operation_mode(OperationMode::RewardDispensing).unwrap();
    session.set_dispensing_duration(80).unwrap();
    session.set_dispensing_probability(0.5).unwrap();
    session.set_beam_break_threshold(0.3).unwrap();
    session.set_valves_state(&[true, false, false]).unwrap();
    session.reset_trace().unwrap();

    let written = session.close().written_text();
    assert_eq!(
        &written[2..],
        &["2,1;", "4,80;", "5,0.5;", "3,0.3;", "6,1,0,0;", "1;"]
    );
}
