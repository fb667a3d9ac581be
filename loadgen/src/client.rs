use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use seats::wire::ReserveRequest;
use seats::{ReservationOutcome, SeatId, SeatRepository};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("backend error: {0}")]
    Backend(String),
}

/// The two calls a simulated user makes against the reservation authority.
#[async_trait]
pub trait SeatApi: Send + Sync {
    async fn list_available(&self) -> Result<Vec<SeatId>, ClientError>;

    /// Returns the HTTP status of the reply. `Err` means no reply arrived.
    async fn reserve(&self, req: ReserveRequest) -> Result<u16, ClientError>;
}

#[derive(Clone)]
pub struct HttpSeatApi {
    http: Client,
    available_url: String,
    reserve_url: String,
}

impl HttpSeatApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        let base = base_url.trim_end_matches('/');

        Ok(Self {
            http,
            available_url: format!("{base}/seats/available"),
            reserve_url: format!("{base}/reserve"),
        })
    }
}

#[async_trait]
impl SeatApi for HttpSeatApi {
    #[instrument(skip(self), level = "debug")]
    async fn list_available(&self) -> Result<Vec<SeatId>, ClientError> {
        let resp = self.http.get(&self.available_url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let seats: Vec<SeatId> = resp.json().await?;
        debug!(count = seats.len(), "available seats fetched");

        Ok(seats)
    }

    #[instrument(skip(self), fields(user_id = req.user_id, seat_id = req.seat_id), level = "debug")]
    async fn reserve(&self, req: ReserveRequest) -> Result<u16, ClientError> {
        let resp = self.http.post(&self.reserve_url).json(&req).send().await?;
        let status = resp.status().as_u16();

        // Drain so the connection goes back to the pool.
        let _ = resp.bytes().await;

        Ok(status)
    }
}

/// Talks to a repository in-process, answering with the statuses the HTTP
/// service would use. Lets the harness run without a network hop.
pub struct DirectSeatApi {
    repo: Arc<dyn SeatRepository>,
}

impl DirectSeatApi {
    pub fn new(repo: Arc<dyn SeatRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl SeatApi for DirectSeatApi {
    async fn list_available(&self) -> Result<Vec<SeatId>, ClientError> {
        self.repo
            .list_available(None)
            .await
            .map_err(|e| ClientError::Backend(e.to_string()))
    }

    async fn reserve(&self, req: ReserveRequest) -> Result<u16, ClientError> {
        if req.validate().is_err() {
            return Ok(400);
        }

        let status = match self.repo.reserve(req.seat_id, req.user_id).await {
            Ok(ReservationOutcome::Granted) => 200,
            Ok(ReservationOutcome::Conflict) => 409,
            Ok(ReservationOutcome::NotFound) => 404,
            Err(_) => 500,
        };

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seats::repository_memory::MemorySeatRepository;

    #[test]
    fn endpoint_urls_tolerate_trailing_slash() {
        let api = HttpSeatApi::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();

        assert_eq!(api.available_url, "http://localhost:8080/seats/available");
        assert_eq!(api.reserve_url, "http://localhost:8080/reserve");
    }

    #[tokio::test]
    async fn direct_api_maps_outcomes_to_http_statuses() {
        let api = DirectSeatApi::new(Arc::new(MemorySeatRepository::with_seats(3)));

        let req = |seat_id| ReserveRequest { user_id: 7, seat_id };
        assert_eq!(api.reserve(req(2)).await.unwrap(), 200);
        assert_eq!(api.reserve(req(2)).await.unwrap(), 409);
        assert_eq!(api.reserve(req(99)).await.unwrap(), 404);
        assert_eq!(api.reserve(req(0)).await.unwrap(), 400);
        assert_eq!(api.list_available().await.unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn direct_api_reports_closed_store() {
        let repo = Arc::new(MemorySeatRepository::with_seats(3));
        repo.close().await;
        let api = DirectSeatApi::new(repo);

        assert!(matches!(
            api.list_available().await,
            Err(ClientError::Backend(_))
        ));
        assert_eq!(
            api.reserve(ReserveRequest { user_id: 1, seat_id: 1 }).await.unwrap(),
            500
        );
    }
}
