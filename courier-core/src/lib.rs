//! Core types for courier
//!
//! This crate provides the reply model, per-conversation queues, the
//! delivery log, configuration and logging shared by the other courier crates.

pub mod config;
pub mod error;
pub mod history;
pub mod inbound;
pub mod locator;
pub mod logging;
pub mod queue;
pub mod reply;
pub mod utils;

pub use error::{Error, Result};
