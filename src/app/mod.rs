//! Application
//!
//! Composition root: logging setup, signal handling and the single-threaded
//! loop that drives the client.

pub mod application;
pub mod logging;
