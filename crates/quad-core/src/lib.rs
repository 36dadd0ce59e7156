//! Core types, the store trait, and the workflow engine for Quad.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod approval;
pub mod detect;
pub mod error;
pub mod event;
pub mod gateway;
pub mod identity;
pub mod lifecycle;
pub mod notify;
pub mod request;
pub mod resource;
pub mod store;

pub use error::{Error, Result};
