//! Config - Persisted Printer Settings
//!
//! The settings record as stored on disk. The client never mutates it; it
//! derives a [`ClientConfig`](crate::connection::ClientConfig) from it on every
//! (re)configure.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_EVENT_CAPACITY, DEFAULT_HMS_TTL_MS, DEFAULT_RECONNECT_INTERVAL_MS,
    DEFAULT_TICK_INTERVAL_MS,
};

/// Printer connection and HMS settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrinterSettings {
    /// Printer LAN address
    pub printer_ip: String,
    /// Printer serial number (USN)
    pub serial: String,
    /// LAN access code shown on the printer screen
    pub access_code: String,
    /// Overrides the generated MQTT client id
    pub client_id: Option<String>,
    /// Time after which an unrefreshed health event turns inactive
    pub hms_ttl_ms: u32,
    /// Number of slots in the event table
    pub event_capacity: usize,
    /// Display codes (`HMS_xxxx_xxxx_xxxx_xxxx`) that are never tracked
    pub ignore_codes: Vec<String>,
    /// Fixed reconnect polling interval
    pub reconnect_interval_ms: u32,
    /// Period of the application tick
    pub tick_interval_ms: u64,
    /// Logging options
    pub logging: LoggingSettings,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            printer_ip: String::new(),
            serial: String::new(),
            access_code: String::new(),
            client_id: None,
            hms_ttl_ms: DEFAULT_HMS_TTL_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            ignore_codes: Vec::new(),
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            logging: LoggingSettings::default(),
        }
    }
}

/// Logging options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LoggingSettings {
    /// Directory for daily rolling log files; console only when unset
    pub directory: Option<String>,
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: PrinterSettings = toml::from_str(
            r#"
            printer_ip = "192.168.1.50"
            serial = "01P00A000000000"
            access_code = "12345678"
            ignore_codes = ["HMS_0300_0100_0001_0007"]

            [logging]
            level = "debug"
            "#,
        )
        .expect("parse settings");

        assert_eq!(settings.printer_ip, "192.168.1.50");
        assert_eq!(settings.hms_ttl_ms, DEFAULT_HMS_TTL_MS);
        assert_eq!(settings.event_capacity, DEFAULT_EVENT_CAPACITY);
        assert_eq!(settings.ignore_codes.len(), 1);
        assert_eq!(settings.logging.level.as_deref(), Some("debug"));
        assert_eq!(settings.logging.directory, None);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let settings: PrinterSettings = toml::from_str("").expect("parse settings");
        assert_eq!(settings, PrinterSettings::default());
    }
}
