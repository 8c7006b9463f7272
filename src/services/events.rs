//! Client Events
//!
//! Values handed from the client to its collaborators: the per-report
//! notification consumed by the LED renderer and the status snapshot served by
//! the web status API.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::domain::hms::HealthEvent;
use crate::domain::severity::Severity;
use crate::domain::status::PrinterStatus;
use crate::helpers::Millis;
use crate::services::supervisor::ConnectionState;

/// Sent after every successfully decoded report
#[derive(Clone, Debug)]
pub struct ReportNotice {
    /// Monotonic receive time
    pub received_at: Millis,
    /// Status after merging the report
    pub status: PrinterStatus,
    /// Highest active severity after the report was applied
    pub top_severity: Severity,
    /// Active events after the report was applied
    pub active_total: usize,
    /// The decoded report document
    pub document: Arc<Value>,
}

/// Active event counts per severity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub fatal: usize,
    pub error: usize,
    pub warning: usize,
    pub info: usize,
    pub none: usize,
}

/// Point-in-time view of the client for the status API
#[derive(Clone, Debug, Serialize)]
pub struct StatusSnapshot {
    pub generated_at: DateTime<Utc>,
    pub state: ConnectionState,
    pub connected: bool,
    pub printer: Option<String>,
    pub report_topic: Option<String>,
    pub status: PrinterStatus,
    pub top_severity: Severity,
    pub has_problem: bool,
    pub counts: SeverityCounts,
    pub active_total: usize,
    pub events: Vec<HealthEvent>,
}
