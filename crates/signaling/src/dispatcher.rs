//! Event-Dispatcher – Routet ClientEvents an die Vermittlung
//!
//! Jedes eingehende Ereignis fuehrt genau einen Aufruf der `Vermittlung`
//! aus. Antworten an den Absender selbst (nur `pong`) werden zurueckgegeben
//! und von der Verbindung direkt geschrieben, alles andere laeuft ueber das
//! Verbindungsregister.

use std::sync::Arc;
use tandem_core::types::SessionId;
use tandem_protocol::{events::SignalAnfrage, jetzt_ms, ClientEvent, ServerEvent};

use crate::vermittlung::Vermittlung;

/// Zentraler Event-Dispatcher einer Verbindung
pub struct EventDispatcher {
    vermittlung: Arc<Vermittlung>,
    session: SessionId,
}

impl EventDispatcher {
    /// Erstellt einen Dispatcher fuer eine Sitzung
    pub fn neu(vermittlung: Arc<Vermittlung>, session: SessionId) -> Self {
        Self {
            vermittlung,
            session,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Verarbeitet ein eingehendes Ereignis
    ///
    /// Gibt `Some` zurueck wenn dem Absender direkt geantwortet werden soll.
    pub fn dispatch(&self, ereignis: ClientEvent) -> Option<ServerEvent> {
        let id = self.session;

        match ereignis {
            ClientEvent::FindPartner => {
                let ergebnis = self.vermittlung.partner_suchen(id);
                tracing::debug!(session = %id, ergebnis = ?ergebnis, "find-partner");
                None
            }

            ClientEvent::CancelSearch => {
                self.vermittlung.warten_abbrechen(&id);
                None
            }

            ClientEvent::StopSearch => {
                self.vermittlung.suche_stoppen(&id);
                None
            }

            ClientEvent::Signal(SignalAnfrage { target, signal }) => {
                self.vermittlung.signal_weiterleiten(id, target, signal);
                None
            }

            ClientEvent::SendMessage(text) => {
                self.vermittlung.text_weiterleiten(id, text);
                None
            }

            ClientEvent::Ping(ping) => Some(ServerEvent::pong(ping.timestamp_ms, jetzt_ms())),

            ClientEvent::Pong(pong) => {
                tracing::trace!(
                    session = %id,
                    rtt_ms = jetzt_ms().saturating_sub(pong.echo_timestamp_ms),
                    "Pong empfangen"
                );
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
