//! Fare estimation and surge pricing.
//!
//! Distance is the haversine great-circle distance between pickup and
//! dropoff. Trip duration assumes a constant average speed.

use std::ops::RangeInclusive;

use crate::engine::random::RandomSource;
use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::cab::CabType;
use crate::models::fare::{Fare, round_to};
use crate::models::location::Location;

#[derive(Debug, Clone, PartialEq)]
pub struct PricingPolicy {
    pub average_speed_kmh: f64,
    pub cancellation_fee: f64,
    /// Inclusive local-hour bands that use the peak surge range.
    pub peak_hours: Vec<RangeInclusive<u32>>,
    pub peak_surge: (f64, f64),
    pub off_peak_surge: (f64, f64),
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            average_speed_kmh: 30.0,
            cancellation_fee: 50.0,
            peak_hours: vec![8..=10, 17..=20],
            peak_surge: (1.2, 2.0),
            off_peak_surge: (1.0, 1.3),
        }
    }
}

impl PricingPolicy {
    pub fn is_peak(&self, hour: u32) -> bool {
        self.peak_hours.iter().any(|band| band.contains(&hour))
    }

    pub fn surge_multiplier(&self, hour: u32, rng: &mut dyn RandomSource) -> f64 {
        let (low, high) = if self.is_peak(hour) {
            self.peak_surge
        } else {
            self.off_peak_surge
        };
        round_to(rng.float_in(low, high), 1).max(1.0)
    }

    pub fn duration_minutes(&self, distance_km: f64) -> f64 {
        distance_km / self.average_speed_kmh * 60.0
    }
}

/// Distance and duration of a trip, before any pricing is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripEstimate {
    pub distance_km: f64,
    pub duration_minutes: f64,
}

pub fn estimate_trip(
    policy: &PricingPolicy,
    pickup: &Location,
    dropoff: &Location,
) -> Result<TripEstimate, AppError> {
    pickup.validate("pickup")?;
    dropoff.validate("dropoff")?;

    let distance_km = haversine_km(pickup, dropoff);
    Ok(TripEstimate {
        distance_km,
        duration_minutes: policy.duration_minutes(distance_km),
    })
}

pub fn estimate_fare(
    policy: &PricingPolicy,
    pickup: &Location,
    dropoff: &Location,
    cab_type: CabType,
    hour: u32,
    rng: &mut dyn RandomSource,
) -> Result<Fare, AppError> {
    let trip = estimate_trip(policy, pickup, dropoff)?;
    Ok(price_trip(policy, &trip, cab_type, hour, rng))
}

pub fn price_trip(
    policy: &PricingPolicy,
    trip: &TripEstimate,
    cab_type: CabType,
    hour: u32,
    rng: &mut dyn RandomSource,
) -> Fare {
    let rates = cab_type.rates();
    Fare::new(
        rates.base_fare,
        trip.distance_km * rates.per_km,
        trip.duration_minutes * rates.per_min,
        policy.surge_multiplier(hour, rng),
    )
}
