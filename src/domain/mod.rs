//! Domain Models
//!
//! Plain data types shared by the services: printer settings, HMS codes and
//! events, severities and the scalar printer status.

pub mod config;
pub mod hms;
pub mod severity;
pub mod status;
