//! The water system command schema.
//!
//! This is the single declaration both endpoints are built against. Commands
//! (host → firmware) come first, then responses (firmware → host); ids follow
//! declaration order.

use crate::codec::FieldType;
use crate::constants::{MAXIMUM_TRACE_LENGTH, NUMBER_OF_VALVES};
use crate::error::ProtocolResult;
use crate::table::CommandTable;

/// Static declaration of one command or response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub signature: &'static [FieldType],
}

impl CommandSpec {
    pub const fn new(name: &'static str, signature: &'static [FieldType]) -> Self {
        CommandSpec { name, signature }
    }
}

// ============================================================================
// Names
// ============================================================================

pub const PROBE: &str = "probe";
pub const RESET_TRACE: &str = "reset_trace";
pub const SET_OPERATION_MODE: &str = "set_operation_mode";
pub const SET_BEAM_BREAK_THRESHOLD: &str = "set_beam_break_threshold";
pub const SET_DISPENSING_DURATION: &str = "set_dispensing_duration";
pub const SET_DISPENSING_PROBABILITY: &str = "set_dispensing_probability";
pub const SET_VALVES_STATE: &str = "set_valves_state";
pub const GET_STATS: &str = "get_stats";

pub const PROBE_RESULT: &str = "probe_result";
pub const STATS: &str = "stats";
pub const ERROR: &str = "error";

// ============================================================================
// Signatures
// ============================================================================

/// One trace entry: dispense timestamp (ms) and reward position flag.
pub const TRACE_ENTRY: &[FieldType] = &[FieldType::UInt32, FieldType::Bool];

/// The trace buffer as sent by `stats`.
pub const TRACE_ARRAY: FieldType = FieldType::BoundedArray(TRACE_ENTRY, MAXIMUM_TRACE_LENGTH);

/// Each valve state travels as its own integer field.
pub const VALVES_SIGNATURE: &[FieldType] = &[FieldType::Int32; NUMBER_OF_VALVES];

/// Host → firmware commands.
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(PROBE, &[]),
    CommandSpec::new(RESET_TRACE, &[]),
    CommandSpec::new(SET_OPERATION_MODE, &[FieldType::Int32]),
    CommandSpec::new(SET_BEAM_BREAK_THRESHOLD, &[FieldType::Float32]),
    CommandSpec::new(SET_DISPENSING_DURATION, &[FieldType::Int32]),
    CommandSpec::new(SET_DISPENSING_PROBABILITY, &[FieldType::Float32]),
    CommandSpec::new(SET_VALVES_STATE, VALVES_SIGNATURE),
    CommandSpec::new(GET_STATS, &[]),
];

/// Firmware → host responses.
pub const RESPONSES: &[CommandSpec] = &[
    CommandSpec::new(PROBE_RESULT, &[FieldType::String]),
    CommandSpec::new(STATS, &[FieldType::UInt32, FieldType::Int32, TRACE_ARRAY]),
    CommandSpec::new(ERROR, &[FieldType::String]),
];

/// Build the shared water system table.
pub fn water_system_table() -> ProtocolResult<CommandTable> {
    let specs: Vec<CommandSpec> = COMMANDS.iter().chain(RESPONSES.iter()).copied().collect();
    CommandTable::from_schema(&specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_order_ids() {
        let table = water_system_table().unwrap();
        let names: Vec<&str> = table.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "probe",
                "reset_trace",
                "set_operation_mode",
                "set_beam_break_threshold",
                "set_dispensing_duration",
                "set_dispensing_probability",
                "set_valves_state",
                "get_stats",
                "probe_result",
                "stats",
                "error",
            ]
        );
        assert_eq!(table.lookup_by_name(PROBE_RESULT).unwrap().id, 8);
        assert_eq!(table.lookup_by_name(STATS).unwrap().id, 9);
        assert_eq!(table.lookup_by_name(ERROR).unwrap().id, 10);
    }

    #[test]
    fn test_stats_token_layout() {
        let table = water_system_table().unwrap();
        let stats = table.lookup_by_name(STATS).unwrap();
        assert_eq!(stats.token_count(), 2 + 2 * MAXIMUM_TRACE_LENGTH);

        let valves = table.lookup_by_name(SET_VALVES_STATE).unwrap();
        assert_eq!(valves.signature.len(), NUMBER_OF_VALVES);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = water_system_table().unwrap();
        let b = water_system_table().unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
