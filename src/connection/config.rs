//! Client Configuration
//!
//! The connection identity derived from [`PrinterSettings`]. It is rebuilt in
//! full on every (re)configure and never patched field by field.

use ahash::AHashSet;
use tracing::warn;

use crate::constants::{
    CLIENT_ID_PREFIX, DEFAULT_EVENT_CAPACITY, DEFAULT_HMS_TTL_MS, DEFAULT_RECONNECT_INTERVAL_MS,
    MAX_EVENT_CAPACITY, PRINTER_MQTT_PORT, PRINTER_MQTT_USER,
};
use crate::domain::config::PrinterSettings;
use crate::error::{Error, Result};
use crate::helpers::Millis;

/// Derived printer connection configuration
#[derive(Clone)]
pub struct ClientConfig {
    /// Printer LAN address
    pub printer_ip: String,
    /// Printer serial number
    pub serial: String,
    /// Shared secret (LAN access code)
    pub access_code: String,
    /// MQTT client identity
    pub client_id: String,
    /// MQTT username
    pub username: &'static str,
    /// Broker port
    pub port: u16,
    /// `mqtts://<ip>:<port>`
    pub server_uri: String,
    /// `device/<serial>/report`
    pub topic_report: String,
    /// `device/<serial>/request`
    pub topic_request: String,
    /// Health event TTL
    pub hms_ttl_ms: Millis,
    /// Event table slots
    pub event_capacity: usize,
    /// Normalised display codes that are never tracked
    pub ignore_codes: AHashSet<String>,
    /// Fixed reconnect polling interval
    pub reconnect_interval_ms: Millis,
}

impl ClientConfig {
    /// Build the configuration from settings.
    ///
    /// Fails with [`Error::ConfigIncomplete`] when the address, serial or
    /// access code is empty.
    pub fn from_settings(settings: &PrinterSettings, default_client_id: &str) -> Result<Self> {
        let printer_ip = settings.printer_ip.trim().to_string();
        let serial = settings.serial.trim().to_string();
        let access_code = settings.access_code.trim().to_string();

        let missing: Vec<&'static str> = [
            ("printer_ip", printer_ip.is_empty()),
            ("serial", serial.is_empty()),
            ("access_code", access_code.is_empty()),
        ]
        .into_iter()
        .filter_map(|(name, empty)| empty.then_some(name))
        .collect();

        if !missing.is_empty() {
            return Err(Error::ConfigIncomplete { missing });
        }

        let client_id = settings
            .client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(default_client_id)
            .to_string();

        let hms_ttl_ms = match settings.hms_ttl_ms {
            0 => DEFAULT_HMS_TTL_MS,
            ttl => ttl,
        };
        let event_capacity = match settings.event_capacity {
            0 => DEFAULT_EVENT_CAPACITY,
            cap if cap > MAX_EVENT_CAPACITY => {
                warn!(
                    requested = cap,
                    max = MAX_EVENT_CAPACITY,
                    "Event capacity too large, clamping"
                );
                MAX_EVENT_CAPACITY
            }
            cap => cap,
        };
        let reconnect_interval_ms = match settings.reconnect_interval_ms {
            0 => DEFAULT_RECONNECT_INTERVAL_MS,
            interval => interval,
        };

        Ok(Self {
            server_uri: format!("mqtts://{printer_ip}:{PRINTER_MQTT_PORT}"),
            topic_report: format!("device/{serial}/report"),
            topic_request: format!("device/{serial}/request"),
            printer_ip,
            serial,
            access_code,
            client_id,
            username: PRINTER_MQTT_USER,
            port: PRINTER_MQTT_PORT,
            hms_ttl_ms,
            event_capacity,
            ignore_codes: normalize_ignore_codes(&settings.ignore_codes),
            reconnect_interval_ms,
        })
    }

    /// Generate display name (e.g., "01P00A000000000 (192.168.1.50:8883)")
    pub fn display_name(&self) -> String {
        format!("{} ({}:{})", self.serial, self.printer_ip, self.port)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_uri", &self.server_uri)
            .field("serial", &self.serial)
            .field("client_id", &self.client_id)
            .field("access_code", &"<redacted>")
            .field("topic_report", &self.topic_report)
            .field("hms_ttl_ms", &self.hms_ttl_ms)
            .field("event_capacity", &self.event_capacity)
            .field("ignored", &self.ignore_codes.len())
            .finish()
    }
}

/// Upper-case and trim ignore entries; an entry may hold several codes
/// separated by commas or whitespace.
pub fn normalize_ignore_codes(entries: &[String]) -> AHashSet<String> {
    entries
        .iter()
        .flat_map(|entry| entry.split(|c: char| c == ',' || c.is_whitespace()))
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_ascii_uppercase)
        .collect()
}

/// Generate a client id for this process (e.g., "bambubeacon-1a2b3c4d")
pub fn generate_client_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{CLIENT_ID_PREFIX}{}", &id[..8])
}
