use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fare {
    pub base_fare: f64,
    pub distance_fare: f64,
    pub time_fare: f64,
    pub surge_multiplier: f64,
    pub total: f64,
    /// Set only when a ride is cancelled; never folded into `total`.
    pub cancellation_fee: f64,
}

impl Fare {
    pub fn new(base_fare: f64, distance_fare: f64, time_fare: f64, surge_multiplier: f64) -> Self {
        let subtotal = base_fare + distance_fare + time_fare;
        Self {
            base_fare,
            distance_fare,
            time_fare,
            surge_multiplier,
            total: round_to(subtotal * surge_multiplier, 2),
            cancellation_fee: 0.0,
        }
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::{Fare, round_to};

    #[test]
    fn total_applies_surge_to_subtotal() {
        let fare = Fare::new(80.0, 75.0, 25.0, 1.5);
        assert_eq!(fare.total, 270.0);
        assert_eq!(fare.cancellation_fee, 0.0);
    }

    #[test]
    fn total_is_rounded_to_cents() {
        let fare = Fare::new(50.0, 10.0 / 3.0, 0.0, 1.1);
        assert_eq!(fare.total, 58.67);
        assert_eq!(round_to(1.25, 1), 1.3);
    }
}
