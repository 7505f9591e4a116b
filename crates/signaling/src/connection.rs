//! Client-Connection – Verwaltet eine einzelne Verbindung
//!
//! Jede Verbindung (TCP oder WebSocket) bekommt eine `ClientConnection` in
//! einem eigenen tokio-Task. Der Transport liefert nur einen Strom von
//! [`Eingang`] und eine Senke fuer `ServerEvent`, die Schleife selbst ist
//! transportunabhaengig.
//!
//! ## Ablauf
//! 1. Neue `SessionId`, Registrierung, `welcome` an den Client
//!    (bei vollem Server stattdessen `error {SERVER_FULL}` und Ende)
//! 2. Schleife ueber eingehende Ereignisse, Send-Queue, Keepalive, Shutdown
//! 3. Beim Verlassen der Schleife immer: Verbindungsverlust melden
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen Ping
//! - Jeder empfangene Frame zaehlt als Lebenszeichen
//! - Nach `verbindungs_timeout_sek` ohne Lebenszeichen wird getrennt

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tandem_core::types::SessionId;
use tandem_protocol::{jetzt_ms, ClientEvent, FehlerCode, ServerEvent};

use crate::dispatcher::EventDispatcher;
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;

// ---------------------------------------------------------------------------
// Eingang
// ---------------------------------------------------------------------------

/// Ein vom Transport gelesenes Element
#[derive(Debug, Clone, PartialEq)]
pub enum Eingang {
    /// Dekodiertes Client-Ereignis
    Ereignis(ClientEvent),
    /// Frame, das kein gueltiges Ereignis war (Text fuer die Fehlerantwort)
    Ungueltig(String),
    /// Transport-Lebenszeichen ohne Ereignis (z.B. WebSocket-Pong)
    Lebenszeichen,
}

// ---------------------------------------------------------------------------
// ClientConnection
// ---------------------------------------------------------------------------

/// Verarbeitet eine einzelne Verbindung
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer: String,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState>, peer: impl Into<String>) -> Self {
        Self {
            state,
            peer: peer.into(),
        }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, der Timeout greift oder ein
    /// Shutdown-Signal eingeht. Gibt die vergebene Sitzungs-ID zurueck.
    pub async fn verarbeiten<S, K>(
        self,
        eingang: S,
        ausgang: K,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> SignalingResult<SessionId>
    where
        S: Stream<Item = SignalingResult<Eingang>>,
        K: Sink<ServerEvent>,
        K::Error: Display,
    {
        tokio::pin!(eingang);
        tokio::pin!(ausgang);

        let peer = self.peer;
        let keepalive_intervall = Duration::from_secs(self.state.config.keepalive_sek.max(1));
        let timeout_dauer = Duration::from_secs(self.state.config.verbindungs_timeout_sek);
        let vermittlung = Arc::clone(&self.state.vermittlung);

        let session = SessionId::new();
        let mut sende_rx = match vermittlung.verbinden(session) {
            Ok(rx) => rx,
            Err(SignalingError::ServerVoll) => {
                tracing::warn!(
                    peer = %peer,
                    max = self.state.config.max_clients,
                    "Server voll, Verbindung abgelehnt"
                );
                let abgelehnt = ServerEvent::error(FehlerCode::ServerFull, "Server ist voll");
                let _ = ausgang.send(abgelehnt).await;
                let _ = ausgang.close().await;
                return Err(SignalingError::ServerVoll);
            }
            Err(e) => return Err(e),
        };
        let dispatcher = EventDispatcher::neu(Arc::clone(&vermittlung), session);

        tracing::info!(peer = %peer, session = %session, "Neue Verbindung");

        // Zeitpunkt des letzten empfangenen Frames
        let mut letzter_empfang = Instant::now();
        // Zeitpunkt des naechsten Ping
        let mut naechster_ping = Instant::now() + keepalive_intervall;

        loop {
            let jetzt = Instant::now();

            // Timeout-Pruefung
            if jetzt.duration_since(letzter_empfang) > timeout_dauer {
                tracing::warn!(peer = %peer, session = %session, "Verbindungs-Timeout");
                break;
            }

            // Naechsten Ping-Zeitpunkt berechnen
            let ping_verzoegerung = if jetzt < naechster_ping {
                naechster_ping.duration_since(jetzt)
            } else {
                Duration::from_millis(1)
            };

            tokio::select! {
                // Eingehendes Element vom Client
                element = eingang.next() => {
                    match element {
                        Some(Ok(Eingang::Ereignis(ereignis))) => {
                            letzter_empfang = Instant::now();
                            tracing::trace!(session = %session, ?ereignis, "Ereignis empfangen");

                            if let Some(antwort) = dispatcher.dispatch(ereignis) {
                                if let Err(e) = ausgang.send(antwort).await {
                                    tracing::warn!(session = %session, fehler = %e, "Senden fehlgeschlagen");
                                    break;
                                }
                            }
                        }
                        Some(Ok(Eingang::Ungueltig(grund))) => {
                            letzter_empfang = Instant::now();
                            tracing::debug!(session = %session, grund = %grund, "Ungueltiges Ereignis");
                            let fehler = ServerEvent::error(FehlerCode::InvalidRequest, grund);
                            if let Err(e) = ausgang.send(fehler).await {
                                tracing::warn!(session = %session, fehler = %e, "Senden fehlgeschlagen");
                                break;
                            }
                        }
                        Some(Ok(Eingang::Lebenszeichen)) => {
                            letzter_empfang = Instant::now();
                        }
                        Some(Err(SignalingError::VerbindungGetrennt)) | None => {
                            tracing::info!(peer = %peer, session = %session, "Verbindung vom Client getrennt");
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(peer = %peer, session = %session, fehler = %e, "Lesefehler");
                            break;
                        }
                    }
                }

                // Ausgehendes Ereignis aus dem Register
                ausgehend = sende_rx.recv() => {
                    let Some(ausgehend) = ausgehend else {
                        tracing::debug!(session = %session, "Send-Queue geschlossen");
                        break;
                    };
                    if let Err(e) = ausgang.send(ausgehend).await {
                        tracing::warn!(session = %session, fehler = %e, "Zustellung fehlgeschlagen");
                        break;
                    }
                }

                // Keepalive-Ping
                _ = tokio::time::sleep(ping_verzoegerung) => {
                    if Instant::now() >= naechster_ping {
                        if let Err(e) = ausgang.send(ServerEvent::ping(jetzt_ms())).await {
                            tracing::warn!(session = %session, fehler = %e, "Ping-Senden fehlgeschlagen");
                            break;
                        }
                        naechster_ping = Instant::now() + keepalive_intervall;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(session = %session, "Shutdown-Signal – Verbindung wird getrennt");
                        let abschied = ServerEvent::error(
                            FehlerCode::InternalError,
                            "Server wird heruntergefahren",
                        );
                        let _ = ausgang.send(abschied).await;
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende
        vermittlung.verbindung_verloren(&session);
        let _ = ausgang.close().await;

        tracing::info!(peer = %peer, session = %session, "Verbindungs-Task beendet");
        Ok(session)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
