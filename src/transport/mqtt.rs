//! MQTT Session
//!
//! [`Session`] over the printer's local MQTT broker (rumqttc, TLS). The event
//! loop runs as a task on the shared tokio runtime and forwards
//! [`SessionEvent`]s through a crossbeam channel. The pump stops on the first
//! connection error; reconnecting is left to the client's backoff.
//!
//! Every `open` starts a new epoch. A pump only delivers while its epoch is
//! current, and `close` discards whatever the retired pump left queued, so the
//! owner never sees events of a previous session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, TlsConfiguration, Transport,
};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio::task::JoinHandle;

use crate::connection::ClientConfig;
use crate::constants::{MQTT_KEEP_ALIVE_SECS, MQTT_MAX_PACKET_SIZE, MQTT_REQUEST_CAPACITY};
use crate::services::spawn_named_in_tokio;
use crate::transport::{Session, SessionEvent, TransportError};

/// Serialises event delivery against session teardown
#[derive(Debug)]
struct EventGate {
    epoch: Mutex<u64>,
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
}

impl EventGate {
    fn lock(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> u64 {
        *self.lock()
    }

    /// Deliver `event` if `epoch` is still current
    fn forward(&self, epoch: u64, event: SessionEvent) -> bool {
        let current = self.lock();
        *current == epoch && self.tx.send(event).is_ok()
    }

    /// End the current epoch and drop its undelivered events
    fn retire(&self) -> usize {
        let mut current = self.lock();
        *current = current.wrapping_add(1);
        self.rx.try_iter().count()
    }
}

/// rumqttc-backed printer session
pub struct MqttSession {
    gate: Arc<EventGate>,
    client: Option<AsyncClient>,
    pump: Option<JoinHandle<()>>,
}

impl MqttSession {
    /// Create a session and the receiver its events are delivered on
    pub fn new() -> (Self, Receiver<SessionEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let gate = EventGate {
            epoch: Mutex::new(0),
            tx,
            rx: rx.clone(),
        };
        let session = Self {
            gate: Arc::new(gate),
            client: None,
            pump: None,
        };
        (session, rx)
    }

    /// Whether an event loop task is currently running
    pub fn is_running(&self) -> bool {
        self.pump.as_ref().is_some_and(|pump| !pump.is_finished())
    }

    fn client(&self) -> Result<&AsyncClient, TransportError> {
        match &self.client {
            Some(client) if self.is_running() => Ok(client),
            Some(_) => Err(TransportError::Closed),
            None => Err(TransportError::NotConnected),
        }
    }
}

impl Session for MqttSession {
    /// The host network stack manages the link; connection failures surface
    /// as lost sessions instead.
    fn link_up(&self) -> bool {
        true
    }

    fn open(&mut self, config: &ClientConfig) -> Result<(), TransportError> {
        if self.is_running() {
            return Ok(());
        }
        self.close();

        let (client, eventloop) = AsyncClient::new(mqtt_options(config), MQTT_REQUEST_CAPACITY);
        let epoch = self.gate.current();
        let pump = spawn_named_in_tokio(
            "mqtt-pump",
            pump_events(eventloop, Arc::clone(&self.gate), epoch),
        );

        self.client = Some(client);
        self.pump = Some(pump);
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.client()?
            .try_subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| TransportError::Rejected {
                message: e.to_string(),
            })
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
    ) -> Result<(), TransportError> {
        self.client()?
            .try_publish(topic, QoS::AtMostOnce, retain, payload)
            .map_err(|e| TransportError::Rejected {
                message: e.to_string(),
            })
    }

    fn close(&mut self) {
        if let Some(client) = self.client.take() {
            let _ = client.try_disconnect();
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        let dropped = self.gate.retire();
        if dropped > 0 {
            tracing::debug!(dropped, "Discarded events of closed session");
        }
    }
}

impl Drop for MqttSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for MqttSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttSession")
            .field("running", &self.is_running())
            .field("epoch", &self.gate.current())
            .finish()
    }
}

fn mqtt_options(config: &ClientConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.printer_ip, config.port);
    options.set_credentials(config.username, &config.access_code);
    options.set_keep_alive(Duration::from_secs(MQTT_KEEP_ALIVE_SECS));
    options.set_clean_session(true);
    options.set_max_packet_size(MQTT_MAX_PACKET_SIZE, MQTT_MAX_PACKET_SIZE);
    options.set_transport(Transport::tls_with_config(TlsConfiguration::Rustls(
        Arc::new(insecure_tls_config()),
    )));
    options
}

/// Forward broker events until the connection fails or the epoch is retired
async fn pump_events(mut eventloop: EventLoop, gate: Arc<EventGate>, epoch: u64) {
    loop {
        let event = match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => SessionEvent::Established,
            Ok(Event::Incoming(Packet::Publish(publish))) => SessionEvent::Message {
                topic: publish.topic.as_str().into(),
                payload: Arc::from(&publish.payload[..]),
            },
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                tracing::debug!(pkid = ack.pkid, "MQTT subscription acknowledged");
                continue;
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                gate.forward(
                    epoch,
                    SessionEvent::Lost {
                        reason: "broker sent disconnect".into(),
                    },
                );
                return;
            }
            Ok(_) => continue,
            Err(e) => {
                gate.forward(
                    epoch,
                    SessionEvent::Lost {
                        reason: e.to_string().into(),
                    },
                );
                return;
            }
        };

        if !gate.forward(epoch, event) {
            return;
        }
    }
}

/// The printer presents a self-signed certificate and no CA bundle is
/// configured, so the server certificate is not verified.
fn insecure_tls_config() -> rustls::ClientConfig {
    rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
        .with_no_client_auth()
}

#[derive(Debug)]
struct AcceptAnyServerCert;

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_fail_before_open() {
        let (mut session, rx) = MqttSession::new();
        assert!(!session.is_running());
        assert_eq!(
            session.subscribe("device/X/report"),
            Err(TransportError::NotConnected)
        );
        assert_eq!(
            session.publish("device/X/request", b"{}".to_vec(), false),
            Err(TransportError::NotConnected)
        );
        session.close();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_requests_fail_after_pump_exit() {
        let (mut session, _rx) = MqttSession::new();
        let (client, _eventloop) =
            AsyncClient::new(MqttOptions::new("test", "127.0.0.1", 1883), 1);
        let pump = spawn_named_in_tokio("finished-pump", async {});
        while !pump.is_finished() {
            std::thread::sleep(Duration::from_millis(1));
        }
        session.client = Some(client);
        session.pump = Some(pump);

        assert_eq!(
            session.publish("device/X/request", b"{}".to_vec(), false),
            Err(TransportError::Closed)
        );
        assert_eq!(
            session.subscribe("device/X/report"),
            Err(TransportError::Closed)
        );
    }

    #[test]
    fn test_close_discards_queued_events() {
        let (mut session, rx) = MqttSession::new();
        let epoch = session.gate.current();
        assert!(session.gate.forward(epoch, SessionEvent::Established));

        session.close();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_retired_epoch_cannot_deliver() {
        let (mut session, rx) = MqttSession::new();
        let stale = session.gate.current();
        session.close();

        assert!(!session.gate.forward(stale, SessionEvent::Established));
        assert!(rx.try_recv().is_err());

        let current = session.gate.current();
        assert_ne!(current, stale);
        assert!(session.gate.forward(current, SessionEvent::Established));
        assert_eq!(rx.try_recv(), Ok(SessionEvent::Established));
    }

    #[test]
    fn test_tls_config_builds() {
        let config = insecure_tls_config();
        assert!(config.alpn_protocols.is_empty());
    }
}
