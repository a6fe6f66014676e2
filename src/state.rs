use tokio::sync::broadcast;
use tracing::debug;

use crate::config::Config;
use crate::engine::events::RideEvent;
use crate::engine::ledger::BookingLedger;
use crate::engine::random::SeededRandom;
use crate::models::ride::{Ride, RideStatus};
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub ledger: BookingLedger,
    pub ride_events_tx: broadcast::Sender<RideEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(ledger: BookingLedger, event_buffer_size: usize) -> Self {
        let (ride_events_tx, _unused_rx) = broadcast::channel(event_buffer_size.max(1));

        Self {
            ledger,
            ride_events_tx,
            metrics: Metrics::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let ledger = BookingLedger::new(
            config.pricing_policy(),
            Box::new(SeededRandom::new(config.rng_seed)),
        );
        Self::new(ledger, config.event_buffer_size)
    }

    /// Records a ride's new status in metrics and fans it out to subscribers.
    ///
    /// Call once per transition: `active_rides` moves up on booking and down
    /// when the ride turns terminal.
    pub fn publish(&self, ride: &Ride) {
        self.metrics
            .ride_transitions_total
            .with_label_values(&[ride.status.as_str()])
            .inc();
        if ride.status == RideStatus::Searching {
            self.metrics.active_rides.inc();
        } else if ride.status.is_terminal() {
            self.metrics.active_rides.dec();
        }

        if self.ride_events_tx.send(RideEvent::from_ride(ride)).is_err() {
            debug!(ride_id = %ride.ride_id, "no ride event subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AppState;
    use crate::engine::ledger::BookingLedger;
    use crate::engine::pricing::PricingPolicy;
    use crate::engine::random::SequenceRandom;
    use crate::models::cab::CabType;
    use crate::models::location::Location;
    use crate::models::ride::RideStatus;

    fn state() -> AppState {
        let ledger =
            BookingLedger::new(PricingPolicy::default(), Box::new(SequenceRandom::lowest()));
        AppState::new(ledger, 8)
    }

    #[test]
    fn active_rides_tracks_bookings_and_terminal_states() {
        let state = state();
        let pickup = Location::new(12.9716, 77.5946, "MG Road");
        let dropoff = Location::new(12.9352, 77.6245, "Koramangala");

        let first = state
            .ledger
            .book_ride(pickup.clone(), dropoff.clone(), CabType::Mini)
            .unwrap();
        state.publish(&first);
        let second = state.ledger.book_ride(pickup, dropoff, CabType::Suv).unwrap();
        state.publish(&second);
        assert_eq!(state.metrics.active_rides.get(), 2);

        let accepted = state.ledger.assign_driver(&first.ride_id).unwrap();
        state.publish(&accepted);
        assert_eq!(state.metrics.active_rides.get(), 2);

        let cancelled = state
            .ledger
            .update_status(&second.ride_id, RideStatus::Cancelled)
            .unwrap();
        state.publish(&cancelled);
        assert_eq!(state.metrics.active_rides.get(), 1);
        assert_eq!(state.ledger.active_count(), 1);
    }
}
