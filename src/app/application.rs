//! Application - Client Wiring and Main Loop
//!
//! Owns the [`BeaconClient`] and drives it from the current thread. Session
//! events, control commands and the periodic tick are multiplexed with
//! `crossbeam_channel::select!`.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvError, Sender, select};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::connection::SettingsSource;
use crate::constants::{DEFAULT_TICK_INTERVAL_MS, REPORT_CHANNEL_CAPACITY};
use crate::domain::severity::Severity;
use crate::error::{Error, Result};
use crate::helpers::{Clock, Millis, elapsed};
use crate::services::{BeaconClient, ReportNotice, spawn_named_in_tokio};
use crate::transport::mqtt::MqttSession;
use crate::transport::{Session, SessionEvent};

/// Commands accepted by the main loop
#[derive(Debug, Clone)]
pub enum ControlCommand {
    /// Re-read settings and reconfigure the client
    Reload,
    /// Publish a JSON request to the printer
    Publish { message: Value, retain: bool },
    /// Leave the main loop
    Shutdown,
}

enum Flow {
    Continue,
    Stop,
}

/// Main loop state around one client
pub struct Application<S, C> {
    client: BeaconClient<S>,
    source: C,
    events: Receiver<SessionEvent>,
    control: Receiver<ControlCommand>,
    notices: Receiver<ReportNotice>,
    clock: Clock,
    tick_interval: Duration,
    last_tick: Option<Millis>,
    last_severity: Severity,
}

impl<S: Session, C: SettingsSource> Application<S, C> {
    /// Wire `client` to its event and control channels and apply the
    /// initial settings from `source`.
    ///
    /// Incomplete settings are not fatal: the client stays unconfigured
    /// until a reload supplies them.
    pub fn new(
        mut client: BeaconClient<S>,
        source: C,
        events: Receiver<SessionEvent>,
        control: Receiver<ControlCommand>,
    ) -> Result<Self> {
        let settings = source.load()?;
        let tick_ms = match settings.tick_interval_ms {
            0 => DEFAULT_TICK_INTERVAL_MS,
            ms => ms,
        };

        match client.configure(&settings) {
            Ok(()) => {}
            Err(Error::ConfigIncomplete { .. }) => {
                info!("Waiting for printer settings (send SIGHUP to reload)");
            }
            Err(e) => return Err(e),
        }

        let notices = client.subscribe_reports(REPORT_CHANNEL_CAPACITY);
        Ok(Self {
            client,
            source,
            events,
            control,
            notices,
            clock: Clock::new(),
            tick_interval: Duration::from_millis(tick_ms),
            last_tick: None,
            last_severity: Severity::None,
        })
    }

    pub fn client(&self) -> &BeaconClient<S> {
        &self.client
    }

    /// Run until `Shutdown` arrives or every control sender is gone
    pub fn run(&mut self) {
        info!(tick_ms = self.tick_interval.as_millis() as u64, "Main loop started");
        while let Flow::Continue = self.step() {}
        self.client.disconnect();
        info!("Main loop stopped");
    }

    fn step(&mut self) -> Flow {
        let (events, control) = (self.events.clone(), self.control.clone());
        let flow = select! {
            recv(events) -> event => {
                if let Ok(event) = event {
                    let now = self.clock.now_ms();
                    self.client.handle_session_event(event, now);
                }
                Flow::Continue
            }
            recv(control) -> command => self.handle_control(command),
            default(self.tick_interval) => Flow::Continue,
        };

        self.tick_if_due();
        self.drain_notices();
        flow
    }

    fn handle_control(&mut self, command: Result<ControlCommand, RecvError>) -> Flow {
        let Ok(command) = command else {
            debug!("Control channel closed");
            return Flow::Stop;
        };

        match command {
            ControlCommand::Reload => {
                // Failures are logged by the client; the loop keeps running.
                let _ = self.client.reload_from(&self.source);
                Flow::Continue
            }
            ControlCommand::Publish { message, retain } => {
                if !self.client.publish_request(&message, retain) {
                    warn!("Request not sent");
                }
                Flow::Continue
            }
            ControlCommand::Shutdown => {
                info!("Shutdown requested");
                Flow::Stop
            }
        }
    }

    fn tick_if_due(&mut self) {
        let now = self.clock.now_ms();
        let interval = self.tick_interval.as_millis() as Millis;
        let due = self
            .last_tick
            .is_none_or(|last| elapsed(now, last) >= interval);
        if due {
            self.last_tick = Some(now);
            self.client.tick(now);
        }
    }

    fn drain_notices(&mut self) {
        for notice in self.notices.try_iter() {
            if notice.top_severity != self.last_severity {
                info!(
                    from = %self.last_severity,
                    to = %notice.top_severity,
                    active = notice.active_total,
                    state = %notice.status.gcode_state,
                    "Printer health changed"
                );
                self.last_severity = notice.top_severity;
            }
        }
    }
}

/// Forward process signals to the main loop
fn install_signal_handlers(control: Sender<ControlCommand>) {
    let shutdown = control.clone();
    spawn_named_in_tokio("signal-ctrl-c", async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        let _ = shutdown.send(ControlCommand::Shutdown);
    });

    #[cfg(unix)]
    spawn_named_in_tokio("signal-hup", async move {
        use tokio::signal::unix::{SignalKind, signal};

        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                warn!("Failed to listen for SIGHUP: {}", e);
                return;
            }
        };
        while hangup.recv().await.is_some() {
            info!("SIGHUP received, reloading settings");
            if control.send(ControlCommand::Reload).is_err() {
                break;
            }
        }
    });
}

/// Run the beacon against the printer's MQTT broker until shut down
pub fn run_app<C: SettingsSource>(source: C) -> Result<()> {
    let (session, events) = MqttSession::new();
    let client = BeaconClient::new(session);
    let (control_tx, control_rx) = crossbeam_channel::unbounded();

    install_signal_handlers(control_tx);

    let mut app = Application::new(client, source, events, control_rx)?;
    app.run();
    Ok(())
}
