//! State Layer
//!
//! Bounded in-memory storage for HMS health events.

pub mod event_table;

pub use event_table::EventTable;
