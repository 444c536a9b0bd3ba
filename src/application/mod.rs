//! Request-facing services: rendering and error reporting.

pub mod error;
pub mod render;
