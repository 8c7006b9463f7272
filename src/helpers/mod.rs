//! Helper Utilities
//!
//! Common utilities used across the client.

mod fs;
mod time;

pub use fs::*;
pub use time::*;
