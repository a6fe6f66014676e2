use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::cab::CabType;
use crate::models::driver::Driver;
use crate::models::fare::Fare;
use crate::models::location::Location;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Searching,
    Accepted,
    Arriving,
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub const ALL: [RideStatus; 6] = [
        RideStatus::Searching,
        RideStatus::Accepted,
        RideStatus::Arriving,
        RideStatus::InProgress,
        RideStatus::Completed,
        RideStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RideStatus::Searching => "searching",
            RideStatus::Accepted => "accepted",
            RideStatus::Arriving => "arriving",
            RideStatus::InProgress => "in_progress",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    /// The next state on the forward path, `None` for terminal states.
    pub fn next(self) -> Option<RideStatus> {
        match self {
            RideStatus::Searching => Some(RideStatus::Accepted),
            RideStatus::Accepted => Some(RideStatus::Arriving),
            RideStatus::Arriving => Some(RideStatus::InProgress),
            RideStatus::InProgress => Some(RideStatus::Completed),
            RideStatus::Completed | RideStatus::Cancelled => None,
        }
    }

    pub fn can_transition_to(self, target: RideStatus) -> bool {
        match target {
            RideStatus::Cancelled => !self.is_terminal(),
            _ => self.next() == Some(target),
        }
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RideStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        RideStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let valid: Vec<String> = RideStatus::ALL
                    .iter()
                    .map(|status| status.as_str().to_uppercase())
                    .collect();
                AppError::InvalidInput(format!(
                    "invalid status `{wanted}`, must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
    pub ride_id: String,
    pub cab_type: CabType,
    pub pickup: Location,
    pub dropoff: Location,
    pub status: RideStatus,
    pub driver: Option<Driver>,
    pub fare: Fare,
    pub distance_km: f64,
    pub duration_minutes: u32,
    pub eta_minutes: u32,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub arriving_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    #[serde(skip)]
    pub(crate) completion_seq: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOutcome {
    pub ride_id: String,
    pub status: RideStatus,
    pub reason: String,
    pub cancellation_fee: f64,
}
