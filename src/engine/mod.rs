pub mod events;
pub mod ledger;
pub mod pricing;
pub mod random;
pub mod roster;
