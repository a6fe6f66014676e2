use uuid::Uuid;

use crate::engine::random::RandomSource;
use crate::models::cab::CabType;
use crate::models::driver::Driver;
use crate::models::fare::round_to;
use crate::models::location::Location;

const FIRST_NAMES: [&str; 8] = [
    "Rajesh", "Amit", "Suresh", "Vijay", "Anil", "Rahul", "Sanjay", "Manoj",
];
const LAST_NAMES: [&str; 8] = [
    "Kumar", "Sharma", "Singh", "Patel", "Reddy", "Verma", "Gupta", "Joshi",
];
const PLATE_SERIES: [&str; 3] = ["A", "B", "C"];

/// Max offset in degrees between a sampled driver and the pickup point.
const NEARBY_JITTER_DEG: f64 = 0.01;

fn vehicles_for(cab_type: CabType) -> &'static [(&'static str, &'static str)] {
    match cab_type {
        CabType::Mini => &[("Swift", "White"), ("Etios", "Silver"), ("Alto", "Red")],
        CabType::Sedan => &[("Dzire", "Blue"), ("Etios", "Silver"), ("City", "White")],
        CabType::Suv => &[("Innova", "Grey"), ("XUV", "Black"), ("Scorpio", "Red")],
        CabType::Luxury => &[("Camry", "Black"), ("E-Class", "Silver")],
    }
}

fn pick<'a>(rng: &mut dyn RandomSource, pool: &[&'a str]) -> &'a str {
    pool[rng.index(pool.len())]
}

/// Samples a synthetic driver for `cab_type` somewhere near `pickup`.
pub fn sample_driver(rng: &mut dyn RandomSource, cab_type: CabType, pickup: &Location) -> Driver {
    let name = format!("{} {}", pick(rng, &FIRST_NAMES), pick(rng, &LAST_NAMES));

    let vehicles = vehicles_for(cab_type);
    let (vehicle_model, vehicle_color) = vehicles[rng.index(vehicles.len())];

    let current_location = Location::new(
        (pickup.latitude + rng.float_in(-NEARBY_JITTER_DEG, NEARBY_JITTER_DEG)).clamp(-90.0, 90.0),
        (pickup.longitude + rng.float_in(-NEARBY_JITTER_DEG, NEARBY_JITTER_DEG))
            .clamp(-180.0, 180.0),
        "Driver location",
    );

    let phone = format!(
        "+91-{}{:09}",
        rng.int_in(7, 9),
        rng.int_in(0, 999_999_999)
    );
    let vehicle_number = format!(
        "KA{}{}{}",
        rng.int_in(10, 99),
        pick(rng, &PLATE_SERIES),
        rng.int_in(1000, 9999)
    );

    Driver {
        id: short_id(),
        name,
        phone,
        rating: round_to(rng.float_in(4.0, 5.0), 1),
        total_trips: rng.int_in(100, 5000),
        vehicle_number,
        vehicle_model: vehicle_model.to_string(),
        vehicle_color: vehicle_color.to_string(),
        cab_type,
        current_location,
    }
}

/// First 8 hex chars of a v4 uuid.
pub fn short_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
