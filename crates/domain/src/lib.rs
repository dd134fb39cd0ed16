//! Domain layer for the shift trade backend.
//!
//! This crate contains:
//! - Domain models (User, Group, Membership, Trade)
//! - The storage contract the lifecycle engine is built on
//! - Business logic services (identity, trades, groups, users,
//!   notification fan-out, reminder sweep)
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use error::DomainError;
