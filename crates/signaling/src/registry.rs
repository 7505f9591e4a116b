//! Verbindungsregister – Wer ist gerade erreichbar?
//!
//! Das Register haelt fuer jede verbundene Sitzung die Send-Queue ihrer
//! Transportverbindung. Es ist die einzige Quelle fuer die Frage "ist
//! dieser Client noch erreichbar".
//!
//! Zustellung ist fire-and-forget: eine volle oder geschlossene Queue
//! verwirft das Ereignis, es gibt weder Puffer noch Wiederholung.

use dashmap::DashMap;
use std::sync::Arc;
use tandem_core::types::SessionId;
use tandem_protocol::ServerEvent;
use tokio::sync::mpsc;

use crate::error::{SignalingError, SignalingResult};

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standard-Groesse der Send-Queue pro Sitzung
pub const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer verbundenen Sitzung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub session: SessionId,
    pub tx: mpsc::Sender<ServerEvent>,
}

impl ClientSender {
    /// Sendet ein Ereignis nicht-blockierend an die Sitzung
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, ereignis: ServerEvent) -> bool {
        match self.tx.try_send(ereignis) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(verworfen)) => {
                tracing::warn!(
                    session = %self.session,
                    ereignis = verworfen.name(),
                    "Send-Queue voll – Ereignis verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(session = %self.session, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Verbindungsregister
// ---------------------------------------------------------------------------

/// Register aller erreichbaren Sitzungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct Verbindungsregister {
    inner: Arc<RegisterInner>,
}

struct RegisterInner {
    clients: DashMap<SessionId, ClientSender>,
    queue_groesse: usize,
}

impl Verbindungsregister {
    /// Erstellt ein neues Register mit Standard-Queue-Groesse
    pub fn neu() -> Self {
        Self::mit_queue_groesse(SEND_QUEUE_GROESSE)
    }

    /// Erstellt ein neues Register mit eigener Queue-Groesse pro Sitzung
    pub fn mit_queue_groesse(queue_groesse: usize) -> Self {
        Self {
            inner: Arc::new(RegisterInner {
                clients: DashMap::new(),
                queue_groesse: queue_groesse.max(1),
            }),
        }
    }

    /// Registriert eine Sitzung und gibt ihre Empfangs-Queue zurueck
    ///
    /// Die Verbindung liest aus dieser Queue und schreibt in den Transport.
    pub fn registrieren(&self, session: SessionId) -> SignalingResult<mpsc::Receiver<ServerEvent>> {
        use dashmap::mapref::entry::Entry;

        match self.inner.clients.entry(session) {
            Entry::Occupied(_) => Err(SignalingError::DoppelteSitzung(session)),
            Entry::Vacant(frei) => {
                let (tx, rx) = mpsc::channel(self.inner.queue_groesse);
                frei.insert(ClientSender { session, tx });
                tracing::debug!(session = %session, "Sitzung registriert");
                Ok(rx)
            }
        }
    }

    /// Entfernt eine Sitzung aus dem Register (idempotent)
    pub fn entfernen(&self, session: &SessionId) -> bool {
        let entfernt = self.inner.clients.remove(session).is_some();
        if entfernt {
            tracing::debug!(session = %session, "Sitzung aus Register entfernt");
        }
        entfernt
    }

    /// Sendet ein Ereignis an eine einzelne Sitzung
    ///
    /// Gibt `true` zurueck wenn die Sitzung gefunden und das Ereignis eingereiht wurde.
    pub fn senden(&self, session: &SessionId, ereignis: ServerEvent) -> bool {
        match self.inner.clients.get(session) {
            Some(sender) => sender.senden(ereignis),
            None => {
                tracing::debug!(session = %session, "Senden an unbekannte Sitzung");
                false
            }
        }
    }

    /// Prueft ob eine Sitzung erreichbar ist
    pub fn ist_verbunden(&self, session: &SessionId) -> bool {
        self.inner.clients.contains_key(session)
    }

    /// Gibt die Anzahl der registrierten Sitzungen zurueck
    pub fn anzahl(&self) -> usize {
        self.inner.clients.len()
    }
}

impl Default for Verbindungsregister {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registrieren_und_senden() {
        let register = Verbindungsregister::neu();
        let id = SessionId::new();

        let mut rx = register.registrieren(id).unwrap();
        assert!(register.ist_verbunden(&id));
        assert_eq!(register.anzahl(), 1);

        assert!(register.senden(&id, ServerEvent::PartnerDisconnected));
        let empfangen = rx.try_recv().expect("Ereignis muss vorhanden sein");
        assert_eq!(empfangen, ServerEvent::PartnerDisconnected);
    }

    #[test]
    fn doppelte_registrierung_wird_abgelehnt() {
        let register = Verbindungsregister::neu();
        let id = SessionId::new();

        let _rx = register.registrieren(id).unwrap();
        let fehler = register.registrieren(id).unwrap_err();
        assert!(matches!(fehler, SignalingError::DoppelteSitzung(s) if s == id));
    }

    #[test]
    fn entfernen_ist_idempotent() {
        let register = Verbindungsregister::neu();
        let id = SessionId::new();
        let _rx = register.registrieren(id).unwrap();

        assert!(register.entfernen(&id));
        assert!(!register.entfernen(&id));
        assert!(!register.ist_verbunden(&id));
        assert!(!register.senden(&id, ServerEvent::PartnerDisconnected));
    }

    #[test]
    fn volle_queue_verwirft_ereignis() {
        let register = Verbindungsregister::mit_queue_groesse(1);
        let id = SessionId::new();
        let mut rx = register.registrieren(id).unwrap();

        assert!(register.senden(&id, ServerEvent::ReceiveMessage("a".into())));
        assert!(!register.senden(&id, ServerEvent::ReceiveMessage("b".into())));

        assert_eq!(rx.try_recv().unwrap(), ServerEvent::ReceiveMessage("a".into()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn geschlossene_queue_verwirft_ereignis() {
        let register = Verbindungsregister::neu();
        let id = SessionId::new();
        let rx = register.registrieren(id).unwrap();
        drop(rx);

        assert!(!register.senden(&id, ServerEvent::PartnerDisconnected));
        // Sitzung bleibt registriert bis zum Verbindungsabbau
        assert!(register.ist_verbunden(&id));
    }
}
