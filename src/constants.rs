//! Client Constants
//!
//! Centralized defaults for the printer connection and the HMS event table.

/// Printer MQTT broker port (TLS)
pub const PRINTER_MQTT_PORT: u16 = 8883;

/// Fixed MQTT username used by the printer's local broker
pub const PRINTER_MQTT_USER: &str = "bblp";

/// Prefix of the generated MQTT client id
pub const CLIENT_ID_PREFIX: &str = "bambubeacon-";

/// Default time-to-live of an unrefreshed health event
pub const DEFAULT_HMS_TTL_MS: u32 = 20_000;

/// Default number of slots in the event table
pub const DEFAULT_EVENT_CAPACITY: usize = 20;

/// Largest event table accepted from settings; larger values are clamped
pub const MAX_EVENT_CAPACITY: usize = 255;

/// Fixed reconnect polling interval
pub const DEFAULT_RECONNECT_INTERVAL_MS: u32 = 2_000;

/// Interval of the periodic tick driven by the application loop
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// MQTT keep-alive towards the printer
pub const MQTT_KEEP_ALIVE_SECS: u64 = 30;

/// Request channel capacity of the MQTT client
pub const MQTT_REQUEST_CAPACITY: usize = 16;

/// Largest report payload accepted from the printer
pub const MQTT_MAX_PACKET_SIZE: usize = 64 * 1024;

/// Default bound of the report notification channel
pub const REPORT_CHANNEL_CAPACITY: usize = 4;

/// Upper bound on events returned in a status snapshot
pub const SNAPSHOT_MAX_EVENTS: usize = 20;
