//! Core domain + application logic for the channel relay bot.
//!
//! This crate is intentionally framework-agnostic. The Telegram binding lives
//! behind the messaging port (trait) implemented in the adapter crate.

pub mod auth;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod registry;
pub mod relay;

pub use errors::{Error, Result};
