use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::body::Bytes;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::engine::ledger::DEFAULT_CANCEL_REASON;
use crate::error::AppError;
use crate::models::cab::CabType;
use crate::models::location::Location;
use crate::models::ride::{CancelOutcome, Ride, RideStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rides/book", post(book_ride))
        .route("/rides/history/all", get(ride_history))
        .route("/rides/:ride_id", get(get_ride))
        .route("/rides/:ride_id/assign-driver", post(assign_driver))
        .route("/rides/:ride_id/status", patch(update_status))
        .route("/rides/:ride_id/cancel", post(cancel_ride))
}

#[derive(Deserialize)]
pub struct BookRideRequest {
    pub pickup: Location,
    pub dropoff: Location,
    pub cab_type: String,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct CancelRideRequest {
    #[serde(default = "default_reason")]
    pub reason: String,
}

fn default_reason() -> String {
    DEFAULT_CANCEL_REASON.to_string()
}

/// An empty body means the default reason; anything else must decode.
fn cancel_reason(body: &[u8]) -> Result<String, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(default_reason());
    }

    serde_json::from_slice::<CancelRideRequest>(body)
        .map(|request| request.reason)
        .map_err(|err| AppError::InvalidInput(format!("invalid cancel request body: {err}")))
}

async fn book_ride(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BookRideRequest>,
) -> Result<(StatusCode, Json<Ride>), AppError> {
    let cab_type: CabType = payload.cab_type.parse()?;
    let ride = state
        .ledger
        .book_ride(payload.pickup, payload.dropoff, cab_type)?;

    state
        .metrics
        .rides_booked_total
        .with_label_values(&[cab_type.code()])
        .inc();
    state.publish(&ride);

    Ok((StatusCode::CREATED, Json(ride)))
}

async fn get_ride(
    State(state): State<Arc<AppState>>,
    Path(ride_id): Path<String>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(state.ledger.get_ride(&ride_id)?))
}

async fn assign_driver(
    State(state): State<Arc<AppState>>,
    Path(ride_id): Path<String>,
) -> Result<Json<Ride>, AppError> {
    let ride = state.ledger.assign_driver(&ride_id)?;
    state.publish(&ride);
    Ok(Json(ride))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(ride_id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Ride>, AppError> {
    let target: RideStatus = payload.status.parse()?;
    let ride = state.ledger.update_status(&ride_id, target)?;

    if ride.status == RideStatus::Cancelled {
        state
            .metrics
            .cancellation_fees_total
            .inc_by(ride.fare.cancellation_fee);
    }
    state.publish(&ride);

    Ok(Json(ride))
}

async fn cancel_ride(
    State(state): State<Arc<AppState>>,
    Path(ride_id): Path<String>,
    body: Bytes,
) -> Result<Json<CancelOutcome>, AppError> {
    let reason = cancel_reason(&body)?;

    let outcome = state.ledger.cancel_ride(&ride_id, &reason)?;
    state
        .metrics
        .cancellation_fees_total
        .inc_by(outcome.cancellation_fee);

    let ride = state.ledger.get_ride(&ride_id)?;
    state.publish(&ride);

    Ok(Json(outcome))
}

async fn ride_history(State(state): State<Arc<AppState>>) -> Json<Vec<Ride>> {
    Json(state.ledger.list_history())
}
