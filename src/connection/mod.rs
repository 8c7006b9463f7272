//! Connection Management
//!
//! Printer settings persistence and the connection configuration derived from it.

mod config;
mod settings;

pub use config::*;
pub use settings::*;
