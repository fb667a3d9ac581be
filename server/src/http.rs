//! HTTP surface.
//!
//! - `GET  /health`
//! - `GET  /seats/available[?limit=N]` -> JSON array of ids, ascending
//! - `POST /reserve` with `{"user_id": .., "seat_id": ..}`
//!   -> 200 / 400 / 404 / 409 / 415 / 500

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    routing::{get, post},
};
use common::logger::{TraceId, request_span};
use seats::SeatId;
use seats::wire::{ReserveRequest, ReserveResponse};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{Instrument, Span, warn};

use crate::error::ApiError;
use crate::service::ReservationService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReservationService>,
}

impl AppState {
    pub fn new(service: Arc<ReservationService>) -> Self {
        Self { service }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/seats/available", get(available_seats))
        .route("/reserve", post(reserve))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn available_seats(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<SeatId>>, ApiError> {
    let span = request_span("available_seats", &TraceId::new());

    async move {
        let Query(params) = params.map_err(reject_query)?;
        let seats = state.service.list_available(params.limit).await?;
        Ok::<_, ApiError>(Json(seats))
    }
    .instrument(span)
    .await
}

async fn reserve(
    State(state): State<AppState>,
    payload: Result<Json<ReserveRequest>, JsonRejection>,
) -> Result<Json<ReserveResponse>, ApiError> {
    let span = request_span("reserve", &TraceId::new());

    async move {
        let Json(req) = payload.map_err(reject_body)?;

        let span = Span::current();
        span.record("user_id", req.user_id);
        span.record("seat_id", req.seat_id);

        state.service.reserve(req).await?;
        Ok::<_, ApiError>(Json(ReserveResponse::success()))
    }
    .instrument(span)
    .await
}

fn reject_body(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            warn!(action = "reserve", status = "bad_content_type");
            ApiError::UnsupportedMediaType
        }
        other => {
            warn!(action = "reserve", status = "invalid_json", error = %other.body_text());
            ApiError::Validation("Invalid JSON".to_string())
        }
    }
}

fn reject_query(rejection: QueryRejection) -> ApiError {
    warn!(action = "available_seats", status = "invalid_request", error = %rejection.body_text());
    ApiError::Validation("Invalid query".to_string())
}
