//! Ereignis-Protokoll (WebSocket und TCP)
//!
//! Definiert alle Ereignisse zwischen Client und Server.
//!
//! ## Design
//! - Jedes Ereignis ist ein JSON-Objekt `{"event": <name>, "data": <inhalt>}`
//! - Ereignisnamen in kebab-case, identisch fuer WebSocket und TCP
//! - Signaling-Inhalte (Offer/Answer/Candidate) sind opak und werden als
//!   `serde_json::Value` unveraendert durchgereicht

use serde::{Deserialize, Serialize};
use tandem_core::types::SessionId;

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Fehler-Codes fuer `error`-Ereignisse
///
/// Werden nur fuer Transportprobleme verwendet. Vermittlungs- und
/// Relay-Bedingungen erzeugen nie ein Fehler-Ereignis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FehlerCode {
    InvalidRequest,
    ServerFull,
    InternalError,
}

// ---------------------------------------------------------------------------
// Rollen
// ---------------------------------------------------------------------------

/// Rolle innerhalb einer Paarung
///
/// Genau eine Seite ist Initiator (erstellt das Offer), die andere Responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rolle {
    #[serde(rename = "caller")]
    Initiator,
    #[serde(rename = "callee")]
    Responder,
}

impl Rolle {
    /// Gibt die Gegenrolle zurueck
    pub fn gegenteil(self) -> Self {
        match self {
            Self::Initiator => Self::Responder,
            Self::Responder => Self::Initiator,
        }
    }
}

impl std::fmt::Display for Rolle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initiator => f.write_str("caller"),
            Self::Responder => f.write_str("callee"),
        }
    }
}

// ---------------------------------------------------------------------------
// Signaling-Phasen
// ---------------------------------------------------------------------------

/// Grobe Einordnung eines opaken Signaling-Inhalts
///
/// Dient nur Logging und Metriken. Der Inhalt selbst wird nie validiert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalArt {
    Offer,
    Answer,
    Candidate,
    Sonstiges,
}

impl SignalArt {
    /// Ordnet einen Signaling-Inhalt einer Phase zu
    pub fn klassifizieren(signal: &serde_json::Value) -> Self {
        match signal.get("type").and_then(|t| t.as_str()) {
            Some("offer") => Self::Offer,
            Some("answer") => Self::Answer,
            _ if signal.get("candidate").is_some() => Self::Candidate,
            _ => Self::Sonstiges,
        }
    }

    /// Label fuer Logs und Metriken
    pub fn als_str(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Candidate => "candidate",
            Self::Sonstiges => "other",
        }
    }
}

// ---------------------------------------------------------------------------
// Nutzdaten
// ---------------------------------------------------------------------------

/// Signaling-Anfrage vom Client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalAnfrage {
    /// Vom Client angegebenes Ziel (nur Hinweis, massgeblich ist die Paarung)
    #[serde(default)]
    pub target: Option<SessionId>,
    /// Opaker Signaling-Inhalt
    pub signal: serde_json::Value,
}

/// Weitergeleitetes Signal an den Partner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalWeiterleitung {
    pub sender: SessionId,
    pub signal: serde_json::Value,
}

/// Begruessung nach dem Verbindungsaufbau
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Willkommen {
    pub session_id: SessionId,
}

/// Keepalive-Ping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingNachricht {
    pub timestamp_ms: u64,
}

/// Keepalive-Pong
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PongNachricht {
    pub echo_timestamp_ms: u64,
    pub server_timestamp_ms: u64,
}

/// Fehler-Antwort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FehlerNachricht {
    pub code: FehlerCode,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Ereignisse vom Client an den Server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Partner suchen (auch "Skip" wenn bereits gepaart)
    FindPartner,
    /// Warteschlange verlassen, bestehende Paarung bleibt unberuehrt
    CancelSearch,
    /// Suche beenden und Paarung aufloesen
    StopSearch,
    /// Signaling-Inhalt an den Partner
    Signal(SignalAnfrage),
    /// Text-Nachricht an den Partner
    SendMessage(String),
    /// Keepalive vom Client
    Ping(PingNachricht),
    /// Antwort auf einen Server-Ping
    Pong(PongNachricht),
}

impl ClientEvent {
    /// Serialisiert das Ereignis als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert ein Ereignis aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Ereignisse vom Server an den Client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Eigene Sitzungs-ID nach dem Verbindungsaufbau
    Welcome(Willkommen),
    /// Partner gefunden
    MatchFound(SessionId),
    /// Rolle fuer den Handshake
    Role(Rolle),
    /// Partner hat die Paarung verlassen
    PartnerDisconnected,
    /// Signal vom Partner
    Signal(SignalWeiterleitung),
    /// Text vom Partner
    ReceiveMessage(String),
    /// Keepalive vom Server
    Ping(PingNachricht),
    /// Antwort auf einen Client-Ping
    Pong(PongNachricht),
    /// Transportfehler
    Error(FehlerNachricht),
}

impl ServerEvent {
    /// Erstellt ein Fehler-Ereignis
    pub fn error(code: FehlerCode, message: impl Into<String>) -> Self {
        Self::Error(FehlerNachricht {
            code,
            message: message.into(),
        })
    }

    /// Erstellt ein Ping-Ereignis
    pub fn ping(timestamp_ms: u64) -> Self {
        Self::Ping(PingNachricht { timestamp_ms })
    }

    /// Erstellt eine Pong-Antwort
    pub fn pong(echo_timestamp_ms: u64, server_timestamp_ms: u64) -> Self {
        Self::Pong(PongNachricht {
            echo_timestamp_ms,
            server_timestamp_ms,
        })
    }

    /// Kurzname fuer Logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Welcome(_) => "welcome",
            Self::MatchFound(_) => "match-found",
            Self::Role(_) => "role",
            Self::PartnerDisconnected => "partner-disconnected",
            Self::Signal(_) => "signal",
            Self::ReceiveMessage(_) => "receive-message",
            Self::Ping(_) => "ping",
            Self::Pong(_) => "pong",
            Self::Error(_) => "error",
        }
    }

    /// Serialisiert das Ereignis als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert ein Ereignis aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Aktuelle Zeit in Millisekunden seit Unix-Epoche (fuer Ping/Pong)
pub fn jetzt_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
