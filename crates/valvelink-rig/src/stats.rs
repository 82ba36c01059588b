//! Dispensing statistics.
//!
//! The `stats` response carries the reset time, the number of rewards
//! dispensed, and the firmware's whole trace buffer. Only the first
//! `dispensed_count` entries of that buffer are real; the rest is whatever
//! the firmware's array held and is cut off here.

use serde::{Deserialize, Serialize};
use valvelink_messenger::{schema, DecodedResponse, ProtocolError, ProtocolResult, Value};

/// One dispense event from the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispenseEvent {
    /// Firmware `millis()` when the valve opened.
    pub timestamp: u32,
    /// Reward position flag.
    pub flag: bool,
}

/// Statistics since the last trace reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Firmware `millis()` at the last reset.
    pub reset_time: u32,
    /// Number of valid trace entries.
    pub dispensed_count: usize,
    /// Valid trace entries, oldest first.
    pub trace: Vec<DispenseEvent>,
}

impl Stats {
    /// Build statistics from a decoded `stats` response.
    ///
    /// The trace array is flattened into slots and regrouped into
    /// consecutive `(timestamp, flag)` pairs, stopping after
    /// `dispensed_count` pairs. A negative count gives an empty trace and a
    /// count beyond the array's capacity is clamped.
    pub fn from_response(response: &DecodedResponse) -> ProtocolResult<Stats> {
        let malformed = |detail: &str| {
            ProtocolError::MalformedFrame(format!("'{}' response {}", response.name, detail))
        };

        if response.name != schema::STATS {
            return Err(malformed("is not a stats response"));
        }

        let reset_time = response
            .value(0)
            .and_then(Value::as_u32)
            .ok_or_else(|| malformed("has no reset time"))?;
        let reported = response
            .value(1)
            .and_then(Value::as_i32)
            .ok_or_else(|| malformed("has no dispensed count"))?;
        let elements = response
            .value(2)
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("has no trace"))?;

        let slots: Vec<&Value> = elements.iter().flatten().collect();
        let count = usize::try_from(reported).unwrap_or(0).min(slots.len() / 2);

        let mut trace = Vec::with_capacity(count);
        for pair in slots[..count * 2].chunks_exact(2) {
            let timestamp = pair[0]
                .as_u32()
                .ok_or_else(|| malformed("has a non-integer trace timestamp"))?;
            let flag = pair[1]
                .as_bool()
                .ok_or_else(|| malformed("has a non-boolean trace flag"))?;
            trace.push(DispenseEvent { timestamp, flag });
        }

        Ok(Stats {
            reset_time,
            dispensed_count: trace.len(),
            trace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valvelink_messenger::MAXIMUM_TRACE_LENGTH;

    fn response(reset_time: u32, count: i32, slots: &[(u32, bool)]) -> DecodedResponse {
        let mut elements: Vec<Vec<Value>> = slots
            .iter()
            .map(|(t, f)| vec![Value::UInt32(*t), Value::Bool(*f)])
            .collect();
        while elements.len() < MAXIMUM_TRACE_LENGTH {
            elements.push(vec![Value::UInt32(99_999), Value::Bool(true)]);
        }
        DecodedResponse {
            name: schema::STATS.to_string(),
            id: 9,
            values: vec![
                Value::UInt32(reset_time),
                Value::Int32(count),
                Value::Array(elements),
            ],
        }
    }

    #[test]
    fn test_pairs_truncate_padding() {
        let stats = Stats::from_response(&response(500, 2, &[(10, true), (20, false)])).unwrap();
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
    fn test_zero_and_negative_counts() {
        assert!(Stats::from_response(&response(1, 0, &[])).unwrap().trace.is_empty());
        assert!(Stats::from_response(&response(1, -4, &[])).unwrap().trace.is_empty());
    }

    #[test]
    fn test_count_clamped_to_capacity() {
        let stats = Stats::from_response(&response(0, 10_000, &[])).unwrap();
        assert_eq!(stats.dispensed_count, MAXIMUM_TRACE_LENGTH);
    }

    #[test]
    fn test_rejects_other_responses() {
        let probe = DecodedResponse {
            name: schema::PROBE_RESULT.to_string(),
            id: 8,
            values: vec![Value::from("water_system_normal")],
        };
        assert!(matches!(
            Stats::from_response(&probe),
            Err(ProtocolError::MalformedFrame(_))
        ));
    }
}
