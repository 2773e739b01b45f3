//! Domain model: value objects, aggregates, lifecycle events and query filters.
pub mod aggregates;
pub mod events;
pub mod filters;
pub mod value_objects;
