//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt Konfiguration und Vermittlung als Arc-Referenzen, die sicher
//! zwischen tokio-Tasks geteilt werden koennen. TCP- und WebSocket-
//! Verbindungen teilen sich denselben Zustand und damit dieselbe
//! Warteschlange.

use std::sync::Arc;
use tandem_observability::TandemMetrics;
use tandem_protocol::wire::DEFAULT_MAX_FRAME_SIZE;

use crate::registry::SEND_QUEUE_GROESSE;
use crate::vermittlung::Vermittlung;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale gleichzeitige Verbindungen (TCP + WebSocket)
    pub max_clients: usize,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Groesse der Send-Queue pro Sitzung
    pub send_queue_groesse: usize,
    /// Maximale Frame-Groesse fuer TCP in Bytes
    pub max_frame_groesse: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_clients: 512,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            send_queue_groesse: SEND_QUEUE_GROESSE,
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Vermittlung (Warteschlange, Paarungen, Register)
    pub vermittlung: Arc<Vermittlung>,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig, metriken: TandemMetrics) -> Arc<Self> {
        let vermittlung =
            Vermittlung::mit_limit(config.send_queue_groesse, config.max_clients, metriken);
        Arc::new(Self {
            config: Arc::new(config),
            vermittlung,
        })
    }
}
