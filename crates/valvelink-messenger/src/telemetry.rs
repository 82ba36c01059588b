//! Metric names emitted by the protocol engine.
//!
//! Metrics go through the `metrics` facade; nothing is recorded unless the
//! host application installs a recorder.

use metrics::{describe_counter, Unit};

/// A counter declaration with its description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metric {
    pub name: &'static str,
    pub description: &'static str,
}

impl Metric {
    pub const fn counter(name: &'static str, description: &'static str) -> Self {
        Metric { name, description }
    }

    /// Register this metric's description with the installed recorder.
    pub fn describe(&self) {
        describe_counter!(self.name, Unit::Count, self.description);
    }
}

pub const FRAMES_SENT: Metric =
    Metric::counter("valvelink.frames.sent", "Frames written to the transport");
pub const FRAMES_RECEIVED: Metric =
    Metric::counter("valvelink.frames.received", "Frames decoded while polling");
pub const FRAMES_SKIPPED: Metric = Metric::counter(
    "valvelink.frames.skipped",
    "Decoded frames discarded because they did not match the expected response",
);
pub const FRAMES_MALFORMED: Metric = Metric::counter(
    "valvelink.frames.malformed",
    "Frames dropped because they failed to decode",
);
pub const RECEIVE_TIMEOUTS: Metric = Metric::counter(
    "valvelink.receive.timeouts",
    "Receive calls that ended without a matching frame",
);

/// Every metric the engine emits.
pub const ALL_METRICS: &[Metric] = &[
    FRAMES_SENT,
    FRAMES_RECEIVED,
    FRAMES_SKIPPED,
    FRAMES_MALFORMED,
    RECEIVE_TIMEOUTS,
];

/// Describe all metrics. Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in ALL_METRICS {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_unique() {
        let mut names: Vec<&str> = ALL_METRICS.iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_METRICS.len());
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
