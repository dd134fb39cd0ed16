//! Persistence layer for the shift trade backend.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - [`PgTradeStore`], the PostgreSQL implementation of
//!   [`domain::store::TradeStore`]

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
pub mod store;

pub use store::PgTradeStore;
