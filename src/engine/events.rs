use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ride::{Ride, RideStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideEvent {
    pub ride_id: String,
    pub status: RideStatus,
    pub driver_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl RideEvent {
    pub fn from_ride(ride: &Ride) -> Self {
        Self {
            ride_id: ride.ride_id.clone(),
            status: ride.status,
            driver_id: ride.driver.as_ref().map(|driver| driver.id.clone()),
            occurred_at: Utc::now(),
        }
    }
}
