//! Custom Axum extractors.

pub mod auth;
pub mod body;

pub use auth::{AuthenticatedIdentity, CurrentUser};
pub use body::{JsonBody, PathParams};
