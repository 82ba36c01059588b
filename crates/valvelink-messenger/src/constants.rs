//! Protocol constants
//!
//! Reserved characters, boolean sentinels and rig dimensions shared with the
//! water system firmware. Changing any of these requires reflashing the device.

// ============================================================================
// Reserved Characters
// ============================================================================

/// Separates the command identifier and each argument field.
pub const FIELD_SEPARATOR: u8 = b',';
/// Terminates a frame.
pub const COMMAND_TERMINATOR: u8 = b';';
/// Escapes a literal separator, terminator or escape inside a string field.
pub const ESCAPE_CHAR: u8 = b'/';

// ============================================================================
// Boolean Sentinels
// ============================================================================

/// Wire form of `false`.
pub const BOOL_FALSE: &str = "0";
/// Wire form of `true`.
pub const BOOL_TRUE: &str = "1";

// ============================================================================
// Rig Dimensions
// ============================================================================

/// Number of reward positions (one solenoid valve each).
pub const NUMBER_OF_VALVES: usize = 3;
/// Number of dispense events the firmware keeps in its trace buffer.
pub const MAXIMUM_TRACE_LENGTH: usize = 400;
/// Serial baud rate the firmware listens on.
pub const BAUD_RATE: u32 = 9600;

/// Returns true if `byte` must be escaped inside a string field.
pub const fn is_reserved(byte: u8) -> bool {
    matches!(byte, FIELD_SEPARATOR | COMMAND_TERMINATOR | ESCAPE_CHAR)
}
