//! Per-scope telemetry counters.
//!
//! Counters only ever increase for the life of the process. They are written
//! by the controller under the owning scope's lock and copied out for reads.

use serde::Serialize;

use crate::resilience::OutcomeClass;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TelemetryCounters {
    /// Terminal outcomes recorded.
    pub total_requests: u64,
    pub total_2xx: u64,
    pub total_4xx: u64,
    pub total_5xx: u64,
    pub total_429: u64,
    /// Re-attempts issued by the outbound retry loop.
    pub total_retries: u64,
    /// Acquires refused because the circuit was open.
    pub total_circuit_rejections: u64,
    /// Acquires refused because the bucket was empty.
    pub total_rate_limited: u64,
}

impl TelemetryCounters {
    pub(crate) fn record(&mut self, class: OutcomeClass) {
        self.total_requests += 1;
        let counter = match class {
            OutcomeClass::Success => &mut self.total_2xx,
            OutcomeClass::ClientError => &mut self.total_4xx,
            OutcomeClass::RateLimited => &mut self.total_429,
            OutcomeClass::ServerError => &mut self.total_5xx,
        };
        *counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_increments_total_and_class() {
        let mut t = TelemetryCounters::default();
        t.record(OutcomeClass::Success);
        t.record(OutcomeClass::Success);
        t.record(OutcomeClass::RateLimited);
        t.record(OutcomeClass::ServerError);
        t.record(OutcomeClass::ClientError);

        assert_eq!(t.total_requests, 5);
        assert_eq!(t.total_2xx, 2);
        assert_eq!(t.total_429, 1);
        assert_eq!(t.total_5xx, 1);
        assert_eq!(t.total_4xx, 1);
        assert_eq!(t.total_retries, 0);
    }
}
