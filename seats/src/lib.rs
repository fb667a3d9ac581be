//! Seat reservation core.
//!
//! A fixed pool of seats, each owned by at most one user. All mutation goes
//! through [`SeatRepository::reserve`], which checks and assigns a single seat
//! atomically. Listings are best-effort snapshots.

pub mod db;
pub mod error;
pub mod model;
pub mod repository;
pub mod repository_memory;
pub mod repository_sqlx;
pub mod wire;

pub use error::StoreError;
pub use model::{ReservationOutcome, Seat, SeatId, SeatStatus, UserId};
pub use repository::SeatRepository;
