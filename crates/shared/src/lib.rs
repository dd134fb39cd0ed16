//! Shared utilities and common types for the shift trade backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Timing-safe credential comparison
//! - External identity shape validation
//! - Common request validation helpers

pub mod crypto;
pub mod validation;
