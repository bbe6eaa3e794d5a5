pub mod audit;
pub mod event_bus;
pub mod fuzzy;
