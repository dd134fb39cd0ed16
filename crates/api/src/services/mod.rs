//! External service integrations.

pub mod line_push;
pub mod line_verify;

pub use line_push::{ConsolePushGateway, LinePushGateway};
pub use line_verify::LineIdTokenVerifier;
