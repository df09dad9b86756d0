use std::ops::AddAssign;

/// Counters produced by one `advance_time` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    pub generated: u64,
    pub expired: u64,
    pub dropped: u64,
}

/// Totals over an evaluation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatistics {
    pub generated: u64,
    pub transmitted: u64,
    pub expired: u64,
    pub dropped: u64,
}

impl RunStatistics {
    pub fn record_transmissions(&mut self, count: u64) {
        self.transmitted += count;
    }

    /// Share of generated units that were transmitted, in percent.
    pub fn success_rate(&self) -> f64 {
        if self.generated == 0 {
            return 0.0;
        }
        (self.transmitted as f64 / self.generated as f64) * 100.0
    }
}

impl AddAssign<StepStats> for RunStatistics {
    fn add_assign(&mut self, step: StepStats) {
        self.generated += step.generated;
        self.expired += step.expired;
        self.dropped += step.dropped;
    }
}
