//! Platform-facing abstractions: the relay port, its message model and the
//! throttling decorator.

pub mod port;
pub mod throttled;
pub mod types;
