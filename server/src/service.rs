//! Stateless request layer between the HTTP surface and the seat store.
//!
//! Validates before touching the store, makes exactly one store call per
//! request and never retries; retry policy belongs to the caller.

use std::sync::Arc;

use seats::wire::ReserveRequest;
use seats::{ReservationOutcome, SeatId, SeatRepository, StoreError};
use tracing::{error, info, warn};

use crate::error::ReserveError;

pub struct ReservationService {
    repo: Arc<dyn SeatRepository>,
    max_listed: Option<usize>,
}

impl ReservationService {
    pub fn new(repo: Arc<dyn SeatRepository>, max_listed: Option<usize>) -> Self {
        Self { repo, max_listed }
    }

    /// Available seat ids, ascending. `requested` is capped by the configured maximum.
    pub async fn list_available(&self, requested: Option<usize>) -> Result<Vec<SeatId>, StoreError> {
        let limit = match (requested, self.max_listed) {
            (Some(r), Some(max)) => Some(r.min(max)),
            (r, max) => r.or(max),
        };

        match self.repo.list_available(limit).await {
            Ok(seats) => {
                info!(action = "available_seats", status = "ok", count = seats.len());
                Ok(seats)
            }
            Err(e) => {
                error!(action = "available_seats", status = "query_fail", error = %e);
                Err(e)
            }
        }
    }

    pub async fn reserve(&self, req: ReserveRequest) -> Result<(), ReserveError> {
        let ReserveRequest { user_id, seat_id } = req;

        if let Err(msg) = req.validate() {
            warn!(action = "reserve", user_id, seat_id, status = "invalid_request", error = %msg);
            return Err(ReserveError::Invalid(msg));
        }

        match self.repo.reserve(seat_id, user_id).await {
            Ok(outcome @ ReservationOutcome::Granted) => {
                info!(action = "reserve", user_id, seat_id, status = outcome.status());
                Ok(())
            }
            Ok(outcome @ ReservationOutcome::Conflict) => {
                info!(action = "reserve", user_id, seat_id, status = outcome.status());
                Err(ReserveError::Conflict(seat_id))
            }
            Ok(outcome @ ReservationOutcome::NotFound) => {
                warn!(action = "reserve", user_id, seat_id, status = outcome.status());
                Err(ReserveError::NotFound(seat_id))
            }
            Err(e) => {
                error!(action = "reserve", user_id, seat_id, status = e.stage(), error = %e);
                Err(ReserveError::Infra(e))
            }
        }
    }
}
