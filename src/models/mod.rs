pub mod cab;
pub mod driver;
pub mod fare;
pub mod location;
pub mod ride;
