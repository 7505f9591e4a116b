//! Sitzungs-Lebenszyklus – Suche stoppen und Verbindungsverlust
//!
//! Beide Ausloeser teilen denselben Abbau:
//! 1. Sitzung aus der Warteschlange nehmen (no-op wenn nicht wartend)
//! 2. Bestehende Paarung in beide Richtungen aufloesen und den Partner mit
//!    `partner-disconnected` benachrichtigen. Der Partner wird nicht
//!    automatisch neu eingereiht.
//! 3. Nur bei Verbindungsverlust: Sitzung vergessen
//!
//! Das Entfernen aus dem Verbindungsregister uebernimmt die `Vermittlung`.

use tandem_core::types::SessionId;
use tandem_protocol::ServerEvent;

use crate::matchmaker::{Ausgang, Vermittler};

impl Vermittler {
    /// Beendet Suche und Paarung von `id` (explizites Stoppen)
    ///
    /// Fuer eine Sitzung im Leerlauf ist das ein no-op ohne Bestaetigung.
    pub fn suche_stoppen(&mut self, id: &SessionId) -> Ausgang {
        if !self.zustaende.contains_key(id) {
            return Ausgang::leer();
        }
        let ausgang = self.abbauen(id);
        debug_assert!(self.invarianten_pruefen().is_ok());
        ausgang
    }

    /// Raeumt alles auf, was `id` gehalten hat, und vergisst die Sitzung
    ///
    /// Ein zweiter Aufruf fuer dieselbe Sitzung hat keine Wirkung.
    pub fn verbindung_verloren(&mut self, id: &SessionId) -> Ausgang {
        let ausgang = self.abbauen(id);
        if self.zustaende.remove(id).is_some() {
            tracing::debug!(session = %id, "Sitzung vergessen");
        }
        debug_assert!(self.invarianten_pruefen().is_ok());
        ausgang
    }

    fn abbauen(&mut self, id: &SessionId) -> Ausgang {
        let mut ausgang = Ausgang::leer();

        self.warteschlange.entfernen(id);

        if let Some(partner) = self.paarungen.trennen(id) {
            tracing::info!(session = %id, partner = %partner, "Paarung aufgeloest");
            ausgang.push(partner, ServerEvent::PartnerDisconnected);
            self.zustand_aktualisieren(partner);
        }

        self.zustand_aktualisieren(*id);
        ausgang
    }
}
