use prometheus::{Counter, Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub rides_booked_total: IntCounterVec,
    pub ride_transitions_total: IntCounterVec,
    pub fare_estimates_total: IntCounter,
    pub cancellation_fees_total: Counter,
    pub active_rides: IntGauge,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let rides_booked_total = IntCounterVec::new(
            Opts::new("rides_booked_total", "Total rides booked by cab type"),
            &["cab_type"],
        )
        .expect("valid rides_booked_total metric");

        let ride_transitions_total = IntCounterVec::new(
            Opts::new(
                "ride_transitions_total",
                "Total ride status transitions by target status",
            ),
            &["status"],
        )
        .expect("valid ride_transitions_total metric");

        let fare_estimates_total =
            IntCounter::new("fare_estimates_total", "Total fare estimates served")
                .expect("valid fare_estimates_total metric");

        let cancellation_fees_total = Counter::new(
            "cancellation_fees_total",
            "Sum of cancellation fees charged, in currency units",
        )
        .expect("valid cancellation_fees_total metric");

        let active_rides = IntGauge::new("active_rides", "Rides not yet completed or cancelled")
            .expect("valid active_rides metric");

        registry
            .register(Box::new(rides_booked_total.clone()))
            .expect("register rides_booked_total");
        registry
            .register(Box::new(ride_transitions_total.clone()))
            .expect("register ride_transitions_total");
        registry
            .register(Box::new(fare_estimates_total.clone()))
            .expect("register fare_estimates_total");
        registry
            .register(Box::new(cancellation_fees_total.clone()))
            .expect("register cancellation_fees_total");
        registry
            .register(Box::new(active_rides.clone()))
            .expect("register active_rides");

        Self {
            registry,
            rides_booked_total,
            ride_transitions_total,
            fare_estimates_total,
            cancellation_fees_total,
            active_rides,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
