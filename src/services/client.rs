//! Beacon Client
//!
//! Connection lifecycle manager for one printer. Owns the derived
//! configuration, the session, the HMS event table and the last known status,
//! and is driven from a single thread by session events and a periodic tick.
//!
//! ```text
//! Unconfigured ──configure(valid)──► Ready ──connect──► Connecting ──established──► Connected
//!       ▲                              ▲                    ▲                          │
//!       └────configure(incomplete)─────┴──configure(valid)──┴───────session lost───────┘
//! ```

use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::connection::{ClientConfig, SettingsSource, generate_client_id};
use crate::constants::SNAPSHOT_MAX_EVENTS;
use crate::domain::config::PrinterSettings;
use crate::domain::hms::HealthEvent;
use crate::domain::severity::Severity;
use crate::domain::status::PrinterStatus;
use crate::error::{Error, Result};
use crate::helpers::Millis;
use crate::services::decoder::ReportDecoder;
use crate::services::events::{ReportNotice, SeverityCounts, StatusSnapshot};
use crate::services::supervisor::{ConnectionState, ReconnectPolicy};
use crate::state::event_table::EventTable;
use crate::transport::{Session, SessionEvent};

/// Telemetry and health-event client for one printer
pub struct BeaconClient<S> {
    session: S,
    default_client_id: String,
    config: Option<ClientConfig>,
    state: ConnectionState,
    subscribed: bool,
    reconnect: ReconnectPolicy,
    decoder: ReportDecoder,
    table: Option<EventTable>,
    status: PrinterStatus,
    reports: Option<Sender<ReportNotice>>,
}

impl<S: Session> BeaconClient<S> {
    /// Create an unconfigured client over `session`
    pub fn new(session: S) -> Self {
        Self::with_client_id(session, generate_client_id())
    }

    /// Create an unconfigured client with a fixed default client id
    pub fn with_client_id(session: S, default_client_id: impl Into<String>) -> Self {
        Self {
            session,
            default_client_id: default_client_id.into(),
            config: None,
            state: ConnectionState::Unconfigured,
            subscribed: false,
            reconnect: ReconnectPolicy::default(),
            decoder: ReportDecoder::default(),
            table: None,
            status: PrinterStatus::default(),
            reports: None,
        }
    }

    // ==================== Configuration ====================

    /// Rebuild the configuration from `settings`.
    ///
    /// Incomplete settings release the event table and leave the client
    /// `Unconfigured`. Valid settings reallocate the table, reset to `Ready`
    /// and try to connect right away.
    pub fn configure(&mut self, settings: &PrinterSettings) -> Result<()> {
        let built = ClientConfig::from_settings(settings, &self.default_client_id);

        // Any open session belongs to the previous configuration.
        if self.state != ConnectionState::Unconfigured {
            self.session.close();
        }
        self.subscribed = false;

        let config = match built {
            Ok(config) => config,
            Err(e) => {
                warn!("Printer settings incomplete, not connecting: {}", e);
                self.config = None;
                self.table = None;
                self.state = ConnectionState::Unconfigured;
                return Err(e);
            }
        };

        info!(
            printer = %config.display_name(),
            client_id = %config.client_id,
            ttl_ms = config.hms_ttl_ms,
            capacity = config.event_capacity,
            ignored = config.ignore_codes.len(),
            "Printer configured"
        );

        self.table = Some(EventTable::new(config.event_capacity));
        self.decoder = ReportDecoder::new(config.ignore_codes.clone());
        self.reconnect = ReconnectPolicy::new(config.reconnect_interval_ms);
        self.config = Some(config);
        self.state = ConnectionState::Ready;

        if self.session.link_up() {
            self.connect();
            if self.state == ConnectionState::Connecting {
                self.reconnect.record_untimed_attempt();
            }
        } else {
            info!("Network link down, will connect from tick");
        }
        Ok(())
    }

    /// Load settings from `source` and configure from them.
    ///
    /// A source that cannot be read leaves the current configuration intact.
    pub fn reload_from(&mut self, source: &impl SettingsSource) -> Result<()> {
        let settings = source.load().inspect_err(|e| {
            warn!("Settings reload failed, keeping current configuration: {}", e);
        })?;
        self.configure(&settings)?;
        info!("Settings reloaded");
        Ok(())
    }

    // ==================== Session Lifecycle ====================

    /// Start opening a session. No-op unless `Ready`/`Connecting` with the
    /// link up; repeated calls while opening are absorbed by the session.
    pub fn connect(&mut self) {
        if !self.state.can_connect() {
            return;
        }
        let Some(config) = &self.config else {
            return;
        };
        if !self.session.link_up() {
            debug!("Network link down, connect skipped");
            return;
        }

        info!(
            server = %config.server_uri,
            client_id = %config.client_id,
            "Connecting to printer"
        );
        match self.session.open(config) {
            Ok(()) => self.state = ConnectionState::Connecting,
            Err(e) => warn!("Failed to open session: {}", e),
        }
    }

    /// Close the session; reconnection continues from `tick`
    pub fn disconnect(&mut self) {
        self.session.close();
        self.subscribed = false;
        if self.state == ConnectionState::Connected {
            self.state = ConnectionState::Connecting;
        }
        info!("Disconnected from printer");
    }

    /// The broker accepted the session
    pub fn on_session_established(&mut self) {
        if self.state == ConnectionState::Unconfigured {
            debug!("Session established while unconfigured, closing");
            self.session.close();
            return;
        }

        self.state = ConnectionState::Connected;
        self.reconnect.reset();
        self.subscribed = false;
        info!("Connected to printer");
        self.subscribe_report_once();
    }

    /// The session ended. Tracked events are kept and age out through the TTL.
    pub fn on_session_lost(&mut self, reason: &str) {
        self.subscribed = false;
        if matches!(
            self.state,
            ConnectionState::Connected | ConnectionState::Connecting
        ) {
            self.state = ConnectionState::Connecting;
            warn!("Printer session lost: {}", reason);
        }
    }

    fn subscribe_report_once(&mut self) {
        if self.subscribed || self.state != ConnectionState::Connected {
            return;
        }
        let Some(config) = &self.config else {
            return;
        };

        info!(topic = %config.topic_report, "Subscribing to reports");
        match self.session.subscribe(&config.topic_report) {
            Ok(()) => self.subscribed = true,
            Err(e) => warn!("Report subscription failed: {}", e),
        }
    }

    /// Dispatch a session event
    pub fn handle_session_event(&mut self, event: SessionEvent, now: Millis) {
        match event {
            SessionEvent::Established => self.on_session_established(),
            SessionEvent::Lost { reason } => self.on_session_lost(&reason),
            SessionEvent::Message { topic, payload } => {
                // Decode failures are logged inside on_message.
                let _ = self.on_message(&topic, &payload, now);
            }
        }
    }

    // ==================== Report Handling ====================

    /// Handle an inbound publish.
    ///
    /// Reports are decoded, merged into the status and their HMS codes
    /// upserted, then the table is expired. A payload that fails to decode
    /// changes nothing.
    pub fn on_message(&mut self, topic: &str, payload: &[u8], now: Millis) -> Result<()> {
        let (Some(config), Some(table)) = (&self.config, &mut self.table) else {
            trace!(topic, "Message ignored, client unconfigured");
            return Ok(());
        };
        if topic != config.topic_report {
            trace!(topic, "Message on unexpected topic ignored");
            return Ok(());
        }

        let report = match self.decoder.decode(payload) {
            Ok(report) => report,
            Err(e) => {
                warn!(len = payload.len(), "Dropping report: {}", e);
                return Err(Error::from(e));
            }
        };

        if !report.fields.is_empty() {
            self.status.merge(&report.fields);
        }
        for code in &report.events {
            table.upsert(*code, now);
        }
        table.expire(now, config.hms_ttl_ms);

        debug!(
            events = report.events.len(),
            status = !report.fields.is_empty(),
            skipped = report.skipped,
            ignored = report.ignored,
            active = table.count_active_total(),
            "Report applied"
        );

        let notice = ReportNotice {
            received_at: now,
            status: self.status.clone(),
            top_severity: table.top_severity(),
            active_total: table.count_active_total(),
            document: Arc::new(report.document),
        };
        self.notify(notice);
        Ok(())
    }

    /// Periodic driver: reconnect when due and expire stale events, online or
    /// not.
    pub fn tick(&mut self, now: Millis) {
        if self.state == ConnectionState::Unconfigured {
            return;
        }

        // An attempt made by configure counts from the first tick after it.
        self.reconnect.stamp(now);

        if self.state == ConnectionState::Connected {
            self.subscribe_report_once();
        } else if self.session.link_up() && self.reconnect.due(now) {
            let attempt = self.reconnect.record_attempt(now);
            if attempt > 1 {
                debug!(attempt, "Reconnect attempt");
            }
            self.connect();
        }

        if let (Some(config), Some(table)) = (&self.config, &mut self.table) {
            table.expire(now, config.hms_ttl_ms);
        }
    }

    // ==================== Publishing ====================

    /// Publish `message` as JSON on the request topic.
    ///
    /// Returns false unless connected and the transport accepted the message.
    pub fn publish_request<T: Serialize + ?Sized>(&mut self, message: &T, retain: bool) -> bool {
        if self.state != ConnectionState::Connected {
            debug!("Publish skipped, not connected");
            return false;
        }
        let Some(config) = &self.config else {
            return false;
        };
        let payload = match serde_json::to_vec(message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Request serialization failed: {}", e);
                return false;
            }
        };

        let len = payload.len();
        match self.session.publish(&config.topic_request, payload, retain) {
            Ok(()) => {
                info!(topic = %config.topic_request, len, retain, "Request published");
                true
            }
            Err(e) => {
                warn!("Request publish failed: {}", e);
                false
            }
        }
    }

    // ==================== Notifications ====================

    /// Subscribe to report notifications through a bounded channel.
    ///
    /// Notices are dropped while the channel is full. A new subscription
    /// replaces the previous one.
    pub fn subscribe_reports(&mut self, capacity: usize) -> Receiver<ReportNotice> {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        self.reports = Some(tx);
        rx
    }

    fn notify(&mut self, notice: ReportNotice) {
        let Some(tx) = &self.reports else {
            return;
        };
        match tx.try_send(notice) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!("Report subscriber busy, notice dropped"),
            Err(TrySendError::Disconnected(_)) => {
                debug!("Report subscriber gone");
                self.reports = None;
            }
        }
    }

    // ==================== Getters ====================

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn config(&self) -> Option<&ClientConfig> {
        self.config.as_ref()
    }

    pub fn report_topic(&self) -> Option<&str> {
        self.config.as_ref().map(|c| c.topic_report.as_str())
    }

    pub fn request_topic(&self) -> Option<&str> {
        self.config.as_ref().map(|c| c.topic_request.as_str())
    }

    /// Last known scalar status
    pub fn status(&self) -> &PrinterStatus {
        &self.status
    }

    pub fn event_table(&self) -> Option<&EventTable> {
        self.table.as_ref()
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn top_severity(&self) -> Severity {
        self.table
            .as_ref()
            .map(EventTable::top_severity)
            .unwrap_or_default()
    }

    /// Any active event at Warning or above
    pub fn has_problem(&self) -> bool {
        self.top_severity().is_problem()
    }

    pub fn count_active(&self, severity: Severity) -> usize {
        self.table
            .as_ref()
            .map_or(0, |table| table.count_active(severity))
    }

    pub fn count_active_total(&self) -> usize {
        self.table.as_ref().map_or(0, EventTable::count_active_total)
    }

    /// Up to `max` active events in table order
    pub fn active_events(&self, max: usize) -> Vec<HealthEvent> {
        self.table
            .as_ref()
            .map(|table| table.list_active(max))
            .unwrap_or_default()
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        SeverityCounts {
            fatal: self.count_active(Severity::Fatal),
            error: self.count_active(Severity::Error),
            warning: self.count_active(Severity::Warning),
            info: self.count_active(Severity::Info),
            none: self.count_active(Severity::None),
        }
    }

    /// Status view for the web status API
    pub fn snapshot(&self, max_events: usize) -> StatusSnapshot {
        StatusSnapshot {
            generated_at: chrono::Utc::now(),
            state: self.state,
            connected: self.is_connected(),
            printer: self.config.as_ref().map(ClientConfig::display_name),
            report_topic: self.report_topic().map(str::to_string),
            status: self.status.clone(),
            top_severity: self.top_severity(),
            has_problem: self.has_problem(),
            counts: self.severity_counts(),
            active_total: self.count_active_total(),
            events: self.active_events(max_events.min(SNAPSHOT_MAX_EVENTS)),
        }
    }
}

impl<S> std::fmt::Debug for BeaconClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeaconClient")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("subscribed", &self.subscribed)
            .field("tracked", &self.table.as_ref().map(EventTable::tracked))
            .finish()
    }
}
