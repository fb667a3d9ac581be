use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{ReservationOutcome, Seat, SeatId, UserId};

/// Durable state of every seat.
///
/// Implementations must make `reserve` atomic per seat: the availability check
/// and the assignment happen under one exclusive, seat-scoped critical
/// section. Reserve calls on different seats never wait on each other.
#[async_trait]
pub trait SeatRepository: Send + Sync {
    /// Ids of seats currently available, ascending, at most `limit` of them.
    ///
    /// Not linearized with concurrent `reserve` calls.
    async fn list_available(&self, limit: Option<usize>) -> Result<Vec<SeatId>, StoreError>;

    /// Assigns `seat_id` to `user_id` if, and only if, it is still available.
    async fn reserve(
        &self,
        seat_id: SeatId,
        user_id: UserId,
    ) -> Result<ReservationOutcome, StoreError>;

    async fn fetch(&self, seat_id: SeatId) -> Result<Option<Seat>, StoreError>;

    /// Ensures seats `1..=total` exist. Existing rows are left untouched.
    /// Returns how many rows were created.
    async fn initialize(&self, total: u32) -> Result<u64, StoreError>;

    /// Releases the underlying resources. Every later call fails with
    /// [`StoreError::Closed`].
    async fn close(&self);
}
