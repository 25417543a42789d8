// ABOUTME: Per-database elapsed times collected during a run
// ABOUTME: Kept in execution order, ranked slowest-first only for the report

use std::fmt;
use std::time::Duration;

/// Number of entries shown in the slow-database report
pub const SLOWEST_REPORTED: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    pub label: String,
    pub duration: Duration,
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.2?}", self.label, self.duration)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimingLedger {
    records: Vec<Timing>,
}

impl TimingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, label: impl Into<String>, duration: Duration) {
        self.records.push(Timing {
            label: label.into(),
            duration,
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Labels in the order they were taken
    pub fn labels(&self) -> Vec<&str> {
        self.records.iter().map(|t| t.label.as_str()).collect()
    }

    /// Up to `n` records, longest first. Equal durations keep execution order.
    pub fn slowest(&self, n: usize) -> Vec<&Timing> {
        let mut ranked: Vec<&Timing> = self.records.iter().collect();
        ranked.sort_by(|a, b| b.duration.cmp(&a.duration));
        ranked.truncate(n);
        ranked
    }

    /// Multi-line slow-database report
    pub fn report(&self) -> String {
        let mut msg = String::from("Slowest dbs:\n");
        for timing in self.slowest(SLOWEST_REPORTED) {
            msg.push_str(&format!("- {}\n", timing));
        }
        msg
    }
}
