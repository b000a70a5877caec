//! # parley_cli
//!
//! Terminal chat client for a Parley server. [`surface::ChatSurface`] holds
//! one session's state machine; [`terminal`] drives it from stdin.

// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

pub mod cli;
pub mod client;
pub mod logging;
pub mod surface;
pub mod terminal;
