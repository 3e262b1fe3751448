//! Core types for assistant-relay
//!
//! This crate provides the configuration schema and loader, logging setup
//! and the shared error type used by the other assistant-relay crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod utils;

pub use error::{Error, Result};
