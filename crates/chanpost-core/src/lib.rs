//! Core domain + application logic for the channel publishing bot.
//!
//! Framework-agnostic. Telegram, OpenRouter and Unsplash live behind ports
//! (traits) implemented in adapter crates.

pub mod commands;
pub mod config;
pub mod content;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod jobs;
pub mod ledger;
pub mod logging;
pub mod messaging;
pub mod ports;
pub mod publisher;
pub mod scheduler;
pub mod security;
pub mod sweeper;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
