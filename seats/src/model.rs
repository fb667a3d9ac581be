use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type SeatId = i64;
pub type UserId = i64;

/// Seats only ever move `Available -> Reserved`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Available,
    Reserved,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "available",
            SeatStatus::Reserved => "reserved",
        }
    }
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(SeatStatus::Available),
            "reserved" => Ok(SeatStatus::Reserved),
            other => Err(format!("unknown seat status '{other}'")),
        }
    }
}

/// One persisted seat. `owner_id` is `Some` iff `status == Reserved`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub seat_id: SeatId,
    pub status: SeatStatus,
    pub owner_id: Option<UserId>,
}

impl Seat {
    pub fn available(seat_id: SeatId) -> Self {
        Self {
            seat_id,
            status: SeatStatus::Available,
            owner_id: None,
        }
    }

    pub fn is_consistent(&self) -> bool {
        match self.status {
            SeatStatus::Available => self.owner_id.is_none(),
            SeatStatus::Reserved => self.owner_id.is_some(),
        }
    }
}

/// Result of a reserve call that reached the store and completed.
///
/// Infrastructure failures are reported separately as
/// [`StoreError`](crate::StoreError), so every call ends in exactly one of
/// `Granted`, `Conflict`, `NotFound` or an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReservationOutcome {
    Granted,
    /// The seat is already owned by someone else.
    Conflict,
    /// The seat id was never provisioned.
    NotFound,
}

impl ReservationOutcome {
    /// Log status for this outcome.
    pub fn status(&self) -> &'static str {
        match self {
            ReservationOutcome::Granted => "success",
            ReservationOutcome::Conflict => "seat_conflict",
            ReservationOutcome::NotFound => "seat_not_found",
        }
    }
}
