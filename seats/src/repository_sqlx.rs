use std::time::Duration;

use async_trait::async_trait;
use common::logger::warn_if_slow;
use sqlx::any::AnyRow;
use sqlx::{Any, Row, Transaction};
use tracing::{debug, instrument};

use crate::db::{Db, Dialect};
use crate::error::StoreError;
use crate::model::{ReservationOutcome, Seat, SeatId, SeatStatus, UserId};
use crate::repository::SeatRepository;

/// Rows per INSERT while provisioning the pool.
const INIT_BATCH: i64 = 500;

/// SQLx-backed implementation of SeatRepository.
/// Responsible only for persistence, locking and row mapping.
pub struct SqlxSeatRepository {
    db: Db,
}

impl SqlxSeatRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.db.pool.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Checks and assigns under the row's exclusive lock.
    async fn reserve_locked(
        tx: &mut Transaction<'static, Any>,
        seat_id: SeatId,
        user_id: UserId,
    ) -> Result<ReservationOutcome, StoreError> {
        let row = sqlx::query(r#"SELECT status FROM seats WHERE seat_id = $1 FOR UPDATE"#)
            .bind(seat_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(StoreError::Lock)?;

        let Some(row) = row else {
            return Ok(ReservationOutcome::NotFound);
        };

        if row_status(&row)? == SeatStatus::Reserved {
            return Ok(ReservationOutcome::Conflict);
        }

        let done = sqlx::query(
            r#"UPDATE seats SET status = 'reserved', owner_id = $1 WHERE seat_id = $2 AND status = 'available'"#,
        )
        .bind(user_id)
        .bind(seat_id)
        .execute(&mut **tx)
        .await
        .map_err(StoreError::Write)?;

        if done.rows_affected() != 1 {
            return Err(StoreError::Corrupt(format!(
                "seat {seat_id} changed while locked"
            )));
        }

        Ok(ReservationOutcome::Granted)
    }

    /// Assigns first, then explains a zero-row update by reading the row.
    /// The update itself takes the database write lock.
    async fn reserve_guarded(
        tx: &mut Transaction<'static, Any>,
        seat_id: SeatId,
        user_id: UserId,
    ) -> Result<ReservationOutcome, StoreError> {
        let done = sqlx::query(
            r#"UPDATE seats SET status = 'reserved', owner_id = $1 WHERE seat_id = $2 AND status = 'available'"#,
        )
        .bind(user_id)
        .bind(seat_id)
        .execute(&mut **tx)
        .await
        .map_err(StoreError::Write)?;

        if done.rows_affected() == 1 {
            return Ok(ReservationOutcome::Granted);
        }

        let row = sqlx::query(r#"SELECT status FROM seats WHERE seat_id = $1"#)
            .bind(seat_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(StoreError::Read)?;

        match row {
            None => Ok(ReservationOutcome::NotFound),
            Some(row) => match row_status(&row)? {
                SeatStatus::Reserved => Ok(ReservationOutcome::Conflict),
                SeatStatus::Available => Err(StoreError::Corrupt(format!(
                    "seat {seat_id} is available but could not be updated"
                ))),
            },
        }
    }
}

#[async_trait]
impl SeatRepository for SqlxSeatRepository {
    #[instrument(skip(self), target = "store")]
    async fn list_available(&self, limit: Option<usize>) -> Result<Vec<SeatId>, StoreError> {
        self.ensure_open()?;

        let rows = warn_if_slow("db_list_available", Duration::from_millis(200), async {
            match limit {
                Some(n) => {
                    sqlx::query(
                        r#"SELECT seat_id FROM seats WHERE status = 'available' ORDER BY seat_id LIMIT $1"#,
                    )
                    .bind(i64::try_from(n).unwrap_or(i64::MAX))
                    .fetch_all(&self.db.pool)
                    .await
                }
                None => {
                    sqlx::query(
                        r#"SELECT seat_id FROM seats WHERE status = 'available' ORDER BY seat_id"#,
                    )
                    .fetch_all(&self.db.pool)
                    .await
                }
            }
        })
        .await
        .map_err(StoreError::Query)?;

        rows.iter()
            .map(|r| {
                r.try_get::<i64, _>("seat_id")
                    .map_err(|e| StoreError::Corrupt(e.to_string()))
            })
            .collect()
    }

    #[instrument(skip(self), target = "store")]
    async fn reserve(
        &self,
        seat_id: SeatId,
        user_id: UserId,
    ) -> Result<ReservationOutcome, StoreError> {
        self.ensure_open()?;

        let mut tx = self.db.pool.begin().await.map_err(StoreError::Begin)?;

        let attempt = warn_if_slow("db_reserve", Duration::from_millis(100), async {
            match self.db.dialect {
                Dialect::Postgres => Self::reserve_locked(&mut tx, seat_id, user_id).await,
                Dialect::Sqlite => Self::reserve_guarded(&mut tx, seat_id, user_id).await,
            }
        })
        .await;

        match attempt {
            Ok(ReservationOutcome::Granted) => {
                tx.commit().await.map_err(StoreError::Commit)?;
                Ok(ReservationOutcome::Granted)
            }
            other => {
                rollback(tx).await;
                other
            }
        }
    }

    async fn fetch(&self, seat_id: SeatId) -> Result<Option<Seat>, StoreError> {
        self.ensure_open()?;

        let row = sqlx::query(r#"SELECT seat_id, status, owner_id FROM seats WHERE seat_id = $1"#)
            .bind(seat_id)
            .fetch_optional(&self.db.pool)
            .await
            .map_err(StoreError::Query)?;

        row.as_ref().map(row_to_seat).transpose()
    }

    #[instrument(skip(self), target = "store")]
    async fn initialize(&self, total: u32) -> Result<u64, StoreError> {
        self.ensure_open()?;

        let total = i64::from(total);
        let mut tx = self.db.pool.begin().await.map_err(StoreError::Begin)?;
        let mut inserted = 0;
        let mut start = 1;

        while start <= total {
            let end = (start + INIT_BATCH - 1).min(total);
            // Integers we generate ourselves; nothing caller-supplied is spliced in.
            let values = (start..=end)
                .map(|id| format!("({id}, 'available')"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "INSERT INTO seats (seat_id, status) VALUES {values} ON CONFLICT (seat_id) DO NOTHING"
            );

            let res = sqlx::query(&sql).execute(&mut *tx).await;
            let done = match res {
                Ok(done) => done,
                Err(e) => {
                    rollback(tx).await;
                    return Err(StoreError::Write(e));
                }
            };
            inserted += done.rows_affected();
            start = end + 1;
        }

        tx.commit().await.map_err(StoreError::Commit)?;
        debug!(inserted, total, "seat pool initialized");
        Ok(inserted)
    }

    async fn close(&self) {
        self.db.close().await;
    }
}

async fn rollback(tx: Transaction<'static, Any>) {
    if let Err(e) = tx.rollback().await {
        // The connection is discarded; the transaction never committed.
        debug!(error = %e, "rollback failed");
    }
}

/* =========================
Row mapping
========================= */

fn row_status(r: &AnyRow) -> Result<SeatStatus, StoreError> {
    let raw: String = r
        .try_get("status")
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
    raw.parse().map_err(StoreError::Corrupt)
}

fn row_to_seat(r: &AnyRow) -> Result<Seat, StoreError> {
    let seat = Seat {
        seat_id: r
            .try_get::<i64, _>("seat_id")
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        status: row_status(r)?,
        owner_id: r
            .try_get::<Option<i64>, _>("owner_id")
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
    };

    if !seat.is_consistent() {
        return Err(StoreError::Corrupt(format!(
            "seat {} is {} with owner {:?}",
            seat.seat_id, seat.status, seat.owner_id
        )));
    }
    Ok(seat)
}
