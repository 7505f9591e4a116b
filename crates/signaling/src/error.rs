//! Fehlertypen fuer den Signaling-Service
//!
//! Betrifft nur Transport und Registrierung. Vermittlung und Relay kennen
//! keine Fehler: veraltete Kandidaten, fehlende Partner und fremde Ziele
//! werden lokal behandelt und nur geloggt.

use tandem_core::types::SessionId;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Sitzungs-ID ist bereits registriert
    #[error("Sitzung bereits registriert: {0}")]
    DoppelteSitzung(SessionId),

    /// Verbindung wurde getrennt
    #[error("Verbindung getrennt")]
    VerbindungGetrennt,

    /// Protokollfehler (ungueltiges Frame, WebSocket-Fehler)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Maximale Anzahl gleichzeitiger Verbindungen erreicht
    #[error("Server ist voll")]
    ServerVoll,
}

impl SignalingError {
    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
