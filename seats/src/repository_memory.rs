//! In-process seat store.
//!
//! Each seat sits behind its own mutex, so reserve calls on different seats
//! run in parallel and only calls on the same seat serialize.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::error::StoreError;
use crate::model::{ReservationOutcome, Seat, SeatId, SeatStatus, UserId};
use crate::repository::SeatRepository;

#[derive(Default)]
pub struct MemorySeatRepository {
    seats: RwLock<BTreeMap<SeatId, Arc<Mutex<Seat>>>>,
    closed: AtomicBool,
}

impl MemorySeatRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a pool of `total` available seats.
    pub fn with_seats(total: u32) -> Self {
        let repo = Self::new();
        repo.insert_missing(total);
        repo
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn slot(&self, seat_id: SeatId) -> Option<Arc<Mutex<Seat>>> {
        self.seats.read().get(&seat_id).cloned()
    }

    fn insert_missing(&self, total: u32) -> u64 {
        let mut seats = self.seats.write();
        let mut inserted = 0;
        for seat_id in 1..=SeatId::from(total) {
            seats.entry(seat_id).or_insert_with(|| {
                inserted += 1;
                Arc::new(Mutex::new(Seat::available(seat_id)))
            });
        }
        inserted
    }
}

#[async_trait]
impl SeatRepository for MemorySeatRepository {
    async fn list_available(&self, limit: Option<usize>) -> Result<Vec<SeatId>, StoreError> {
        self.ensure_open()?;

        let seats = self.seats.read();
        let available = seats
            .iter()
            .filter(|(_, slot)| slot.lock().status == SeatStatus::Available)
            .map(|(id, _)| *id);

        Ok(match limit {
            Some(n) => available.take(n).collect(),
            None => available.collect(),
        })
    }

    async fn reserve(
        &self,
        seat_id: SeatId,
        user_id: UserId,
    ) -> Result<ReservationOutcome, StoreError> {
        self.ensure_open()?;

        let Some(slot) = self.slot(seat_id) else {
            return Ok(ReservationOutcome::NotFound);
        };

        let mut seat = slot.lock();
        if seat.status == SeatStatus::Reserved {
            return Ok(ReservationOutcome::Conflict);
        }

        seat.status = SeatStatus::Reserved;
        seat.owner_id = Some(user_id);
        Ok(ReservationOutcome::Granted)
    }

    async fn fetch(&self, seat_id: SeatId) -> Result<Option<Seat>, StoreError> {
        self.ensure_open()?;
        Ok(self.slot(seat_id).map(|slot| slot.lock().clone()))
    }

    async fn initialize(&self, total: u32) -> Result<u64, StoreError> {
        self.ensure_open()?;
        Ok(self.insert_missing(total))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
