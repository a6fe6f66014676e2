use serde::{Deserialize, Serialize};

use crate::models::cab::CabType;
use crate::models::location::Location;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub rating: f64,
    pub total_trips: u32,
    pub vehicle_number: String,
    pub vehicle_model: String,
    pub vehicle_color: String,
    pub cab_type: CabType,
    pub current_location: Location,
}
