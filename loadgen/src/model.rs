use std::time::Duration;

use seats::{SeatId, UserId};
use serde::Serialize;

/// What came back from one reservation round trip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// 2xx: the seat is ours.
    Success,
    /// A response arrived with a non-success status.
    Rejected { status: u16 },
    /// No response at all (timeout, connection error, ...).
    TransportFailure { error: String },
}

/// One recorded attempt. `latency` is present iff a response was received.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttemptResult {
    pub seat_id: Option<SeatId>,
    pub outcome: AttemptOutcome,
    latency: Option<Duration>,
}

impl AttemptResult {
    pub fn responded(seat_id: SeatId, status: u16, latency: Duration) -> Self {
        let outcome = if (200..300).contains(&status) {
            AttemptOutcome::Success
        } else {
            AttemptOutcome::Rejected { status }
        };

        Self {
            seat_id: Some(seat_id),
            outcome,
            latency: Some(latency),
        }
    }

    pub fn transport_failure(seat_id: Option<SeatId>, error: impl Into<String>) -> Self {
        Self {
            seat_id,
            outcome: AttemptOutcome::TransportFailure {
                error: error.into(),
            },
            latency: None,
        }
    }

    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }
}

/// Why a simulated user stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Discovery returned no seats.
    PoolExhausted,
    /// Bounded discovery retries ran out.
    DiscoveryGaveUp,
    DeadlineReached,
    /// The task never reported back.
    Lost,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::PoolExhausted => "pool_exhausted",
            Termination::DiscoveryGaveUp => "discovery_gave_up",
            Termination::DeadlineReached => "deadline_reached",
            Termination::Lost => "lost",
        }
    }
}

/// Everything one simulated user produced, handed over once at the end.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClientRun {
    pub user_id: UserId,
    /// Statistics-bearing attempts, in order. Never empty once the run is finished.
    pub attempts: Vec<AttemptResult>,
    /// Reserve calls that got no response; excluded from `attempts`.
    pub discarded_transport_failures: u64,
    pub discovery_failures: u64,
    pub seats_won: Vec<SeatId>,
    pub termination: Termination,
}

impl ClientRun {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            attempts: Vec::new(),
            discarded_transport_failures: 0,
            discovery_failures: 0,
            seats_won: Vec::new(),
            termination: Termination::PoolExhausted,
        }
    }

    /// Placeholder for a user whose task died before reporting.
    pub fn lost(user_id: UserId) -> Self {
        let mut run = Self::new(user_id);
        run.termination = Termination::Lost;
        run.ensure_nonempty();
        run
    }

    /// Adds the synthetic "no request succeeded" record when nothing was recorded,
    /// so an empty run still shows up in the aggregate.
    pub fn ensure_nonempty(&mut self) {
        if self.attempts.is_empty() {
            self.attempts.push(AttemptResult::transport_failure(
                None,
                format!("user {}: no request succeeded", self.user_id),
            ));
        }
    }
}
