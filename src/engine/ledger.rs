//! In-memory booking ledger.
//!
//! Every ride lives in a `DashMap`. Mutations hold the ride's entry guard for
//! their whole read-modify-write, so concurrent assignment and status updates
//! on one ride serialize. Rides are never removed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{Local, Timelike, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use tracing::{debug, info};

use crate::engine::pricing::{self, PricingPolicy};
use crate::engine::random::RandomSource;
use crate::engine::roster::{sample_driver, short_id};
use crate::error::AppError;
use crate::models::cab::CabType;
use crate::models::fare::{Fare, round_to};
use crate::models::location::Location;
use crate::models::ride::{CancelOutcome, Ride, RideStatus};

pub const DEFAULT_CANCEL_REASON: &str = "User cancelled";

/// Simulated supply for one cab type around a location.
#[derive(Debug, Clone, Serialize)]
pub struct CabAvailability {
    #[serde(rename = "type")]
    pub cab_type: CabType,
    pub name: &'static str,
    pub capacity: u8,
    pub available_count: u32,
    pub eta_minutes: u32,
    pub surge_multiplier: f64,
}

pub type HourClock = fn() -> u32;

fn local_hour() -> u32 {
    Local::now().hour()
}

pub struct BookingLedger {
    rides: DashMap<String, Ride>,
    policy: PricingPolicy,
    rng: Mutex<Box<dyn RandomSource>>,
    clock: HourClock,
    completions: AtomicU64,
}

impl BookingLedger {
    pub fn new(policy: PricingPolicy, rng: Box<dyn RandomSource>) -> Self {
        Self {
            rides: DashMap::new(),
            policy,
            rng: Mutex::new(rng),
            clock: local_hour,
            completions: AtomicU64::new(0),
        }
    }

    /// Replaces the local-time clock used to decide peak surge.
    pub fn with_clock(mut self, clock: HourClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.rides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rides.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.rides
            .iter()
            .filter(|entry| !entry.value().status.is_terminal())
            .count()
    }

    fn rng(&self) -> MutexGuard<'_, Box<dyn RandomSource>> {
        // a panic mid-draw leaves the generator usable
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn estimate_fare(
        &self,
        pickup: &Location,
        dropoff: &Location,
        cab_type: CabType,
    ) -> Result<Fare, AppError> {
        let hour = (self.clock)();
        let mut rng = self.rng();
        pricing::estimate_fare(&self.policy, pickup, dropoff, cab_type, hour, rng.as_mut())
    }

    pub fn query_availability(&self, location: &Location) -> Result<Vec<CabAvailability>, AppError> {
        location.validate("location")?;

        let hour = (self.clock)();
        let mut rng = self.rng();

        let cabs = CabType::ALL
            .into_iter()
            .map(|cab_type| {
                let rates = cab_type.rates();
                CabAvailability {
                    cab_type,
                    name: rates.display_name,
                    capacity: rates.capacity,
                    available_count: rng.int_in(2, 10),
                    eta_minutes: rng.int_in(2, 15),
                    surge_multiplier: self.policy.surge_multiplier(hour, rng.as_mut()),
                }
            })
            .collect();

        Ok(cabs)
    }

    pub fn book_ride(
        &self,
        pickup: Location,
        dropoff: Location,
        cab_type: CabType,
    ) -> Result<Ride, AppError> {
        let trip = pricing::estimate_trip(&self.policy, &pickup, &dropoff)?;
        let fare = {
            let hour = (self.clock)();
            let mut rng = self.rng();
            pricing::price_trip(&self.policy, &trip, cab_type, hour, rng.as_mut())
        };

        let mut ride = Ride {
            ride_id: String::new(),
            cab_type,
            pickup,
            dropoff,
            status: RideStatus::Searching,
            driver: None,
            fare,
            distance_km: round_to(trip.distance_km, 2),
            duration_minutes: trip.duration_minutes as u32,
            eta_minutes: 0,
            created_at: Utc::now(),
            accepted_at: None,
            arriving_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            completion_seq: None,
        };

        loop {
            let ride_id = short_id().to_uppercase();
            match self.rides.entry(ride_id.clone()) {
                Entry::Occupied(_) => {
                    debug!(ride_id = %ride_id, "ride id collision, regenerating");
                }
                Entry::Vacant(slot) => {
                    ride.ride_id = ride_id;
                    slot.insert(ride.clone());
                    break;
                }
            }
        }

        info!(
            ride_id = %ride.ride_id,
            cab_type = %cab_type,
            total = ride.fare.total,
            surge = ride.fare.surge_multiplier,
            "ride booked"
        );

        Ok(ride)
    }

    pub fn get_ride(&self, ride_id: &str) -> Result<Ride, AppError> {
        self.rides
            .get(ride_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| not_found(ride_id))
    }

    pub fn assign_driver(&self, ride_id: &str) -> Result<Ride, AppError> {
        let mut ride = self.rides.get_mut(ride_id).ok_or_else(|| not_found(ride_id))?;
        self.assign_locked(&mut ride)?;
        Ok(ride.clone())
    }

    fn assign_locked(&self, ride: &mut Ride) -> Result<(), AppError> {
        if ride.driver.is_some() {
            return Err(AppError::InvalidState(format!(
                "ride {} already has a driver assigned",
                ride.ride_id
            )));
        }
        if ride.status != RideStatus::Searching {
            return Err(AppError::InvalidState(format!(
                "ride {} is {}, drivers can only be assigned while searching",
                ride.ride_id, ride.status
            )));
        }

        let (driver, eta_minutes) = {
            let mut rng = self.rng();
            let driver = sample_driver(rng.as_mut(), ride.cab_type, &ride.pickup);
            (driver, rng.int_in(3, 10))
        };

        info!(
            ride_id = %ride.ride_id,
            driver_id = %driver.id,
            eta_minutes,
            "driver assigned"
        );

        ride.driver = Some(driver);
        ride.eta_minutes = eta_minutes;
        ride.status = RideStatus::Accepted;
        ride.accepted_at = Some(Utc::now());
        Ok(())
    }

    pub fn update_status(&self, ride_id: &str, target: RideStatus) -> Result<Ride, AppError> {
        if target == RideStatus::Cancelled {
            self.cancel_ride(ride_id, DEFAULT_CANCEL_REASON)?;
            return self.get_ride(ride_id);
        }

        let mut ride = self.rides.get_mut(ride_id).ok_or_else(|| not_found(ride_id))?;
        let current = ride.status;

        if !current.can_transition_to(target) {
            return Err(AppError::InvalidTransition(format!(
                "ride {ride_id} cannot move from {current} to {target}"
            )));
        }

        let now = Utc::now();
        match target {
            RideStatus::Accepted => self.assign_locked(&mut ride)?,
            RideStatus::Arriving => {
                ride.status = target;
                ride.arriving_at = Some(now);
            }
            RideStatus::InProgress => {
                ride.status = target;
                ride.started_at = Some(now);
            }
            RideStatus::Completed => {
                ride.status = target;
                ride.completed_at = Some(now);
                ride.completion_seq = Some(self.completions.fetch_add(1, Ordering::SeqCst));
            }
            RideStatus::Searching | RideStatus::Cancelled => {
                return Err(AppError::Internal(format!(
                    "unreachable transition {current} -> {target}"
                )));
            }
        }

        info!(ride_id = %ride_id, from = %current, to = %target, "ride status updated");
        Ok(ride.clone())
    }

    pub fn cancel_ride(&self, ride_id: &str, reason: &str) -> Result<CancelOutcome, AppError> {
        let mut ride = self.rides.get_mut(ride_id).ok_or_else(|| not_found(ride_id))?;

        if ride.status.is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "ride {ride_id} is already {} and cannot be cancelled",
                ride.status
            )));
        }

        let fee = if ride.driver.is_some() {
            self.policy.cancellation_fee
        } else {
            0.0
        };
        let reason = if reason.trim().is_empty() {
            DEFAULT_CANCEL_REASON.to_string()
        } else {
            reason.to_string()
        };

        let previous = ride.status;
        ride.status = RideStatus::Cancelled;
        ride.cancelled_at = Some(Utc::now());
        ride.cancellation_reason = Some(reason.clone());
        ride.fare.cancellation_fee = fee;

        info!(ride_id = %ride_id, from = %previous, fee, reason = %reason, "ride cancelled");

        Ok(CancelOutcome {
            ride_id: ride_id.to_string(),
            status: RideStatus::Cancelled,
            reason,
            cancellation_fee: fee,
        })
    }

    /// Completed rides in the order they completed.
    pub fn list_history(&self) -> Vec<Ride> {
        let mut completed: Vec<Ride> = self
            .rides
            .iter()
            .filter(|entry| entry.value().status == RideStatus::Completed)
            .map(|entry| entry.value().clone())
            .collect();

        completed.sort_by_key(|ride| ride.completion_seq);
        completed
    }
}

fn not_found(ride_id: &str) -> AppError {
    AppError::NotFound(format!("ride {ride_id} not found"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{BookingLedger, DEFAULT_CANCEL_REASON};
    use crate::engine::pricing::PricingPolicy;
    use crate::engine::random::{SeededRandom, SequenceRandom};
    use crate::error::AppError;
    use crate::models::cab::CabType;
    use crate::models::location::Location;
    use crate::models::ride::RideStatus;

    fn off_peak() -> u32 {
        13
    }

    fn ledger() -> BookingLedger {
        BookingLedger::new(PricingPolicy::default(), Box::new(SequenceRandom::lowest()))
            .with_clock(off_peak)
    }

    fn pickup() -> Location {
        Location::new(12.9716, 77.5946, "MG Road, Bangalore")
    }

    fn dropoff() -> Location {
        Location::new(12.9352, 77.6245, "Koramangala, Bangalore")
    }

    fn book(ledger: &BookingLedger) -> String {
        ledger
            .book_ride(pickup(), dropoff(), CabType::Sedan)
            .unwrap()
            .ride_id
    }

    fn drive_to(ledger: &BookingLedger, ride_id: &str, target: RideStatus) {
        for status in [
            RideStatus::Accepted,
            RideStatus::Arriving,
            RideStatus::InProgress,
            RideStatus::Completed,
        ] {
            ledger.update_status(ride_id, status).unwrap();
            if status == target {
                return;
            }
        }
    }

    #[test]
    fn booking_starts_searching_with_fare() {
        let ledger = ledger();
        let ride = ledger.book_ride(pickup(), dropoff(), CabType::Sedan).unwrap();

        assert_eq!(ride.status, RideStatus::Searching);
        assert_eq!(ride.ride_id.len(), 8);
        assert_eq!(ride.ride_id, ride.ride_id.to_uppercase());
        assert!(ride.driver.is_none());
        assert!(ride.fare.total >= 80.0);
        assert_eq!(ride.fare.surge_multiplier, 1.0);
        assert!((ride.distance_km - 5.18).abs() < 0.1);
        assert_eq!(ride.duration_minutes, 10);
        assert_eq!(ledger.get_ride(&ride.ride_id).unwrap().status, RideStatus::Searching);
    }

    #[test]
    fn booking_rejects_bad_coordinates() {
        let ledger = ledger();
        let bad = Location::new(f64::NAN, 0.0, "void");
        let result = ledger.book_ride(bad, dropoff(), CabType::Mini);

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(ledger.is_empty());
    }

    #[test]
    fn unknown_ride_is_not_found() {
        let ledger = ledger();
        assert!(matches!(ledger.get_ride("NOPE1234"), Err(AppError::NotFound(_))));
        assert!(matches!(ledger.assign_driver("NOPE1234"), Err(AppError::NotFound(_))));
        assert!(matches!(
            ledger.cancel_ride("NOPE1234", "x"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn second_assignment_is_invalid_state() {
        let ledger = ledger();
        let ride_id = book(&ledger);

        let ride = ledger.assign_driver(&ride_id).unwrap();
        assert_eq!(ride.status, RideStatus::Accepted);
        assert!(ride.driver.is_some());
        assert_eq!(ride.eta_minutes, 3);
        assert!(ride.accepted_at.is_some());

        let again = ledger.assign_driver(&ride_id);
        assert!(matches!(again, Err(AppError::InvalidState(_))));
    }

    #[test]
    fn accepting_through_status_update_assigns_driver() {
        let ledger = ledger();
        let ride_id = book(&ledger);

        let ride = ledger.update_status(&ride_id, RideStatus::Accepted).unwrap();
        assert!(ride.driver.is_some());
        assert!(matches!(
            ledger.assign_driver(&ride_id),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn status_moves_forward_one_step_at_a_time() {
        let ledger = ledger();
        let ride_id = book(&ledger);

        let skip = ledger.update_status(&ride_id, RideStatus::InProgress);
        assert!(matches!(skip, Err(AppError::InvalidTransition(_))));

        drive_to(&ledger, &ride_id, RideStatus::InProgress);
        let ride = ledger.get_ride(&ride_id).unwrap();
        assert_eq!(ride.status, RideStatus::InProgress);
        assert!(ride.arriving_at.is_some());
        assert!(ride.started_at.is_some());

        let back = ledger.update_status(&ride_id, RideStatus::Accepted);
        assert!(matches!(back, Err(AppError::InvalidTransition(_))));

        let repeat = ledger.update_status(&ride_id, RideStatus::InProgress);
        assert!(matches!(repeat, Err(AppError::InvalidTransition(_))));

        let done = ledger.update_status(&ride_id, RideStatus::Completed).unwrap();
        assert!(done.completed_at.is_some());

        let after = ledger.update_status(&ride_id, RideStatus::Searching);
        assert!(matches!(after, Err(AppError::InvalidTransition(_))));
    }

    #[test]
    fn assigning_after_searching_is_invalid_state() {
        let ledger = ledger();
        let ride_id = book(&ledger);
        ledger.cancel_ride(&ride_id, "changed plans").unwrap();

        assert!(matches!(
            ledger.assign_driver(&ride_id),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn cancel_fee_depends_on_driver_assignment() {
        let ledger = ledger();

        let unassigned = book(&ledger);
        let outcome = ledger.cancel_ride(&unassigned, "").unwrap();
        assert_eq!(outcome.cancellation_fee, 0.0);
        assert_eq!(outcome.reason, DEFAULT_CANCEL_REASON);
        assert_eq!(outcome.status, RideStatus::Cancelled);

        let assigned = book(&ledger);
        drive_to(&ledger, &assigned, RideStatus::Arriving);
        let outcome = ledger.cancel_ride(&assigned, "driver too far").unwrap();
        assert_eq!(outcome.cancellation_fee, 50.0);

        let ride = ledger.get_ride(&assigned).unwrap();
        assert_eq!(ride.status, RideStatus::Cancelled);
        assert_eq!(ride.fare.cancellation_fee, 50.0);
        assert!(ride.fare.total >= 80.0);
        assert_eq!(ride.cancellation_reason.as_deref(), Some("driver too far"));
    }

    #[test]
    fn terminal_rides_cannot_be_cancelled() {
        let ledger = ledger();
        let ride_id = book(&ledger);
        drive_to(&ledger, &ride_id, RideStatus::Completed);

        assert!(matches!(
            ledger.cancel_ride(&ride_id, "too late"),
            Err(AppError::InvalidTransition(_))
        ));

        let cancelled = book(&ledger);
        ledger.cancel_ride(&cancelled, "x").unwrap();
        assert!(matches!(
            ledger.update_status(&cancelled, RideStatus::Cancelled),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[test]
    fn status_update_to_cancelled_uses_default_reason() {
        let ledger = ledger();
        let ride_id = book(&ledger);

        let ride = ledger.update_status(&ride_id, RideStatus::Cancelled).unwrap();
        assert_eq!(ride.status, RideStatus::Cancelled);
        assert_eq!(ride.cancellation_reason.as_deref(), Some(DEFAULT_CANCEL_REASON));
    }

    #[test]
    fn history_lists_completed_rides_in_completion_order() {
        let ledger = ledger();
        let first = book(&ledger);
        let second = book(&ledger);
        let cancelled = book(&ledger);
        let in_flight = book(&ledger);

        drive_to(&ledger, &second, RideStatus::Completed);
        drive_to(&ledger, &first, RideStatus::Completed);
        drive_to(&ledger, &in_flight, RideStatus::Arriving);
        ledger.assign_driver(&cancelled).unwrap();
        ledger.cancel_ride(&cancelled, "x").unwrap();

        let history: Vec<String> = ledger
            .list_history()
            .into_iter()
            .map(|ride| ride.ride_id)
            .collect();

        assert_eq!(history, vec![second, first]);
        assert_eq!(ledger.len(), 4);
        assert_eq!(ledger.active_count(), 1);
    }

    #[test]
    fn availability_covers_every_cab_type() {
        let ledger = ledger();
        let cabs = ledger.query_availability(&pickup()).unwrap();

        assert_eq!(cabs.len(), 4);
        assert_eq!(cabs[2].cab_type, CabType::Suv);
        assert_eq!(cabs[2].capacity, 6);
        for cab in &cabs {
            assert_eq!(cab.available_count, 2);
            assert_eq!(cab.eta_minutes, 2);
            assert_eq!(cab.surge_multiplier, 1.0);
        }

        let bad = Location::new(95.0, 0.0, "beyond the pole");
        assert!(matches!(
            ledger.query_availability(&bad),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn concurrent_assignment_picks_exactly_one_winner() {
        let ledger = Arc::new(
            BookingLedger::new(PricingPolicy::default(), Box::new(SeededRandom::new(Some(1))))
                .with_clock(off_peak),
        );
        let ride_id = book(&ledger);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                let ride_id = ride_id.clone();
                std::thread::spawn(move || ledger.assign_driver(&ride_id).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
    }
}
