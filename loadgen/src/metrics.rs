//! Classification and aggregation of attempt results.
//!
//! [`RunAggregate`] keeps only counts and latency sums so partial aggregates can
//! be merged in any order. [`AggregateReport`] derives averages from it.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use seats::SeatId;
use serde::Serialize;

use crate::model::{AttemptOutcome, AttemptResult, ClientRun, Termination};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeClass {
    RequestFailure,
    ReservationSuccess,
    ReservationRejected,
}

impl OutcomeClass {
    /// No latency means no response, whatever the outcome says.
    pub fn of(attempt: &AttemptResult) -> Self {
        match (&attempt.outcome, attempt.latency()) {
            (_, None) | (AttemptOutcome::TransportFailure { .. }, _) => Self::RequestFailure,
            (AttemptOutcome::Success, Some(_)) => Self::ReservationSuccess,
            (AttemptOutcome::Rejected { .. }, Some(_)) => Self::ReservationRejected,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClassStats {
    pub count: u64,
    pub total_latency: Duration,
}

impl ClassStats {
    fn record(&mut self, latency: Option<Duration>) {
        self.count += 1;
        self.total_latency += latency.unwrap_or_default();
    }

    fn merge(&mut self, other: &ClassStats) {
        self.count += other.count;
        self.total_latency += other.total_latency;
    }

    /// Mean latency; `None` for an empty class.
    pub fn average(&self) -> Option<Duration> {
        if self.count == 0 {
            return None;
        }
        let nanos = self.total_latency.as_nanos() / u128::from(self.count);
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }
}

/// Mergeable raw totals over any number of client runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunAggregate {
    pub clients: u64,
    pub request_failures: ClassStats,
    pub successes: ClassStats,
    pub rejections: ClassStats,
    pub rejections_by_status: BTreeMap<u16, u64>,
    pub discarded_transport_failures: u64,
    pub discovery_failures: u64,
    pub terminations: BTreeMap<Termination, u64>,
    /// Grants per seat, to spot seats handed out twice.
    pub grants: BTreeMap<SeatId, u64>,
}

impl RunAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_runs<'a>(runs: impl IntoIterator<Item = &'a ClientRun>) -> Self {
        let mut agg = Self::new();
        runs.into_iter().for_each(|run| agg.consume(run));
        agg
    }

    pub fn consume(&mut self, run: &ClientRun) {
        self.clients += 1;
        self.discarded_transport_failures += run.discarded_transport_failures;
        self.discovery_failures += run.discovery_failures;
        *self.terminations.entry(run.termination).or_default() += 1;

        for attempt in &run.attempts {
            self.consume_attempt(attempt);
        }
        for seat in &run.seats_won {
            *self.grants.entry(*seat).or_default() += 1;
        }
    }

    pub fn consume_attempt(&mut self, attempt: &AttemptResult) {
        match OutcomeClass::of(attempt) {
            OutcomeClass::RequestFailure => self.request_failures.record(attempt.latency()),
            OutcomeClass::ReservationSuccess => self.successes.record(attempt.latency()),
            OutcomeClass::ReservationRejected => {
                self.rejections.record(attempt.latency());
                if let AttemptOutcome::Rejected { status } = attempt.outcome {
                    *self.rejections_by_status.entry(status).or_default() += 1;
                }
            }
        }
    }

    pub fn merge(&mut self, other: RunAggregate) {
        self.clients += other.clients;
        self.request_failures.merge(&other.request_failures);
        self.successes.merge(&other.successes);
        self.rejections.merge(&other.rejections);
        self.discarded_transport_failures += other.discarded_transport_failures;
        self.discovery_failures += other.discovery_failures;

        for (status, n) in other.rejections_by_status {
            *self.rejections_by_status.entry(status).or_default() += n;
        }
        for (termination, n) in other.terminations {
            *self.terminations.entry(termination).or_default() += n;
        }
        for (seat, n) in other.grants {
            *self.grants.entry(seat).or_default() += n;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassSummary {
    pub count: u64,
    pub avg_latency_ms: Option<f64>,
}

impl From<&ClassStats> for ClassSummary {
    fn from(stats: &ClassStats) -> Self {
        Self {
            count: stats.count,
            avg_latency_ms: stats.average().map(|d| d.as_nanos() as f64 / 1e6),
        }
    }
}

/// Final, human- and machine-readable view of a run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregateReport {
    pub clients: u64,
    pub request_failures: ClassSummary,
    pub successes: ClassSummary,
    pub rejections: ClassSummary,
    pub rejections_by_status: BTreeMap<u16, u64>,
    pub discarded_transport_failures: u64,
    pub discovery_failures: u64,
    pub terminations: BTreeMap<Termination, u64>,
    pub unique_seats_won: u64,
    /// Seats granted to more than one attempt. Anything but zero is a correctness bug.
    pub duplicate_grants: u64,
}

impl From<&RunAggregate> for AggregateReport {
    fn from(agg: &RunAggregate) -> Self {
        Self {
            clients: agg.clients,
            request_failures: (&agg.request_failures).into(),
            successes: (&agg.successes).into(),
            rejections: (&agg.rejections).into(),
            rejections_by_status: agg.rejections_by_status.clone(),
            discarded_transport_failures: agg.discarded_transport_failures,
            discovery_failures: agg.discovery_failures,
            terminations: agg.terminations.clone(),
            unique_seats_won: agg.grants.len() as u64,
            duplicate_grants: agg.grants.values().filter(|n| **n > 1).count() as u64,
        }
    }
}

fn fmt_avg(summary: &ClassSummary) -> String {
    summary
        .avg_latency_ms
        .map_or_else(|| "n/a".to_string(), |ms| format!("{ms:.2}ms"))
}

impl fmt::Display for AggregateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Load test results")?;
        writeln!(f, "  clients:                       {}", self.clients)?;
        writeln!(
            f,
            "  request failures (no reply):   {}",
            self.request_failures.count
        )?;
        writeln!(
            f,
            "  reservations succeeded:        {} (avg {})",
            self.successes.count,
            fmt_avg(&self.successes)
        )?;
        writeln!(
            f,
            "  reservations rejected:         {} (avg {})",
            self.rejections.count,
            fmt_avg(&self.rejections)
        )?;
        for (status, n) in &self.rejections_by_status {
            writeln!(f, "    status {status}: {n}")?;
        }
        writeln!(
            f,
            "  discarded transport failures:  {}",
            self.discarded_transport_failures
        )?;
        writeln!(f, "  discovery failures:            {}", self.discovery_failures)?;
        writeln!(f, "  simulators stopped by:")?;
        for (termination, n) in &self.terminations {
            writeln!(f, "    {}: {n}", termination.as_str())?;
        }
        writeln!(f, "  unique seats won:              {}", self.unique_seats_won)?;
        write!(f, "  duplicate grants:              {}", self.duplicate_grants)
    }
}
