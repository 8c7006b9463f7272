//! Service Layer
//!
//! The service layer drives the printer session: it decodes inbound reports,
//! tracks HMS health events and reconnects on a fixed interval. Transport I/O
//! runs on the shared tokio runtime; everything else runs on the caller's
//! thread.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      BeaconClient                            │
//! │  ┌──────────────┐  ┌─────────────┐  ┌──────────────────┐    │
//! │  │ReportDecoder │  │ EventTable  │  │    Supervisor    │    │
//! │  │ (json → hms) │  │  (health)   │  │ (state/reconnect)│    │
//! │  └──────────────┘  └─────────────┘  └──────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!          ▲ SessionEvent                  │ ReportNotice
//!          │                               ▼
//! ┌──────────────────┐          ┌──────────────────────────────┐
//! │   MqttSession    │          │  LED renderer / status API   │
//! └──────────────────┘          └──────────────────────────────┘
//! ```

mod client;
mod decoder;
mod events;
mod runtime;
mod supervisor;

pub use client::*;
pub use decoder::*;
pub use events::*;
pub use runtime::*;
pub use supervisor::*;
