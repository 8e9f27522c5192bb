//! Domain model: catalog entities, orders and carts, contacts
pub mod aggregates;
pub mod events;
pub mod value_objects;
