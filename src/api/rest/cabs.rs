use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::engine::ledger::CabAvailability;
use crate::error::AppError;
use crate::models::cab::CabType;
use crate::models::fare::Fare;
use crate::models::location::Location;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cabs/available", post(available_cabs))
        .route("/fare/estimate", post(estimate_fare))
}

#[derive(Deserialize)]
pub struct AvailableCabsRequest {
    pub location: Location,
}

#[derive(Deserialize)]
pub struct FareEstimateRequest {
    pub pickup: Location,
    pub dropoff: Location,
    pub cab_type: String,
}

async fn available_cabs(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AvailableCabsRequest>,
) -> Result<Json<Vec<CabAvailability>>, AppError> {
    let cabs = state.ledger.query_availability(&payload.location)?;
    Ok(Json(cabs))
}

async fn estimate_fare(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FareEstimateRequest>,
) -> Result<Json<Fare>, AppError> {
    let cab_type: CabType = payload.cab_type.parse()?;
    let fare = state
        .ledger
        .estimate_fare(&payload.pickup, &payload.dropoff, cab_type)?;

    state.metrics.fare_estimates_total.inc();
    Ok(Json(fare))
}
