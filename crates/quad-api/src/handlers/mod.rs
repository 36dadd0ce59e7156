//! Route handlers, one module per resource family.

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod events;
pub mod notifications;
pub mod reports;
pub mod resources;
pub mod roles;
