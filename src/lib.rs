//! Bambu Beacon Library
//!
//! Printer-side client of a desk status beacon for Bambu Lab printers: keeps a
//! TLS MQTT session to the printer's LAN broker, decodes its JSON reports and
//! tracks HMS health events in a small bounded table with TTL expiry.

pub mod app;
pub mod connection;
pub mod constants;
pub mod domain;
pub mod error;
pub mod helpers;
pub mod services;
pub mod state;
pub mod transport;
