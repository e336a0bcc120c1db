//! Core domain + application logic for the Telegram relay.
//!
//! This crate is intentionally framework-agnostic. The messaging platform lives
//! behind the [`messaging::port::RelayPort`] trait, implemented in adapter crates.

pub mod backfill;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod links;
pub mod logging;
pub mod messaging;
pub mod sanitize;
pub mod strategies;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
