//! Vermittler – Zustandsmaschine fuer Warteschlange und Paarungen
//!
//! Der `Vermittler` besitzt Warteschlange und Paarungstabelle exklusiv.
//! Er ist rein synchron und kennt keinen Transport: jede Operation gibt
//! einen [`Ausgang`] zurueck, also die geordnete Liste der Ereignisse, die
//! der Aufrufer zustellen soll.
//!
//! ## Zustaende einer Sitzung
//! ```text
//! Leerlauf --partner_suchen (leer)--> Wartend --gefunden--> Gepaart
//! Gepaart  --partner_suchen (Skip)--> Wartend | Gepaart (neuer Partner)
//! Gepaart  --suche_stoppen----------> Leerlauf
//! Gepaart  --Partner geht-----------> Leerlauf (benachrichtigt)
//! Wartend  --warten_abbrechen-------> Leerlauf
//! beliebig --verbindung_verloren----> (entfernt)
//! ```
//!
//! Teardown und Relay liegen in `lifecycle` bzw. `relay`.

use std::collections::HashMap;
use tandem_core::types::SessionId;
use tandem_protocol::{Rolle, ServerEvent};

use crate::pairing::Paarungstabelle;
use crate::pool::Warteschlange;

// ---------------------------------------------------------------------------
// Sitzungszustand
// ---------------------------------------------------------------------------

/// Vermittlungszustand einer verbundenen Sitzung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SitzungsZustand {
    /// Verbunden, sucht nicht
    Leerlauf,
    /// In der Warteschlange
    Wartend,
    /// Mit genau einem Partner gepaart
    Gepaart,
}

// ---------------------------------------------------------------------------
// Ausgang
// ---------------------------------------------------------------------------

/// Ein zuzustellendes Ereignis
#[derive(Debug, Clone, PartialEq)]
pub struct Zustellung {
    pub an: SessionId,
    pub ereignis: ServerEvent,
}

/// Geordnete Liste zuzustellender Ereignisse
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Ausgang {
    zustellungen: Vec<Zustellung>,
}

impl Ausgang {
    pub fn leer() -> Self {
        Self::default()
    }

    pub fn push(&mut self, an: SessionId, ereignis: ServerEvent) {
        self.zustellungen.push(Zustellung { an, ereignis });
    }

    pub fn len(&self) -> usize {
        self.zustellungen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zustellungen.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Zustellung> {
        self.zustellungen.iter()
    }

    /// Alle Ereignisse fuer eine Sitzung, in Zustellreihenfolge
    pub fn an(&self, id: &SessionId) -> Vec<&ServerEvent> {
        self.zustellungen
            .iter()
            .filter(|z| z.an == *id)
            .map(|z| &z.ereignis)
            .collect()
    }

    /// Anzahl der `partner-disconnected`-Benachrichtigungen
    pub fn partner_verlassen_anzahl(&self) -> usize {
        self.zustellungen
            .iter()
            .filter(|z| z.ereignis == ServerEvent::PartnerDisconnected)
            .count()
    }
}

impl IntoIterator for Ausgang {
    type Item = Zustellung;
    type IntoIter = std::vec::IntoIter<Zustellung>;

    fn into_iter(self) -> Self::IntoIter {
        self.zustellungen.into_iter()
    }
}

// ---------------------------------------------------------------------------
// Suchergebnis
// ---------------------------------------------------------------------------

/// Ausgang einer Partnersuche
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuchErgebnis {
    /// Gepaart mit dem genannten Partner
    Gepaart(SessionId),
    /// Kein Kandidat, Sitzung wartet jetzt
    Wartet,
    /// Sitzung ist nicht angemeldet, nichts geschehen
    Ignoriert,
}

/// Ergebnis von [`Vermittler::partner_suchen`]
#[derive(Debug, Clone, PartialEq)]
pub struct Suche {
    pub ausgang: Ausgang,
    pub ergebnis: SuchErgebnis,
    /// Verworfene Kandidaten, die beim Entnehmen nicht mehr erreichbar waren
    pub veraltete_kandidaten: usize,
}

// ---------------------------------------------------------------------------
// Vermittler
// ---------------------------------------------------------------------------

/// Besitzer von Warteschlange, Paarungstabelle und Sitzungszustaenden
#[derive(Debug, Default)]
pub struct Vermittler {
    pub(crate) warteschlange: Warteschlange,
    pub(crate) paarungen: Paarungstabelle,
    pub(crate) zustaende: HashMap<SessionId, SitzungsZustand>,
}

impl Vermittler {
    /// Erstellt einen leeren Vermittler
    pub fn neu() -> Self {
        Self::default()
    }

    /// Meldet eine neu verbundene Sitzung an (Zustand `Leerlauf`)
    pub fn anmelden(&mut self, id: SessionId) {
        self.zustaende.entry(id).or_insert(SitzungsZustand::Leerlauf);
    }

    /// Gibt den Zustand einer angemeldeten Sitzung zurueck
    pub fn zustand(&self, id: &SessionId) -> Option<SitzungsZustand> {
        self.zustaende.get(id).copied()
    }

    pub fn partner_von(&self, id: &SessionId) -> Option<SessionId> {
        self.paarungen.partner_von(id)
    }

    pub fn rolle_von(&self, id: &SessionId) -> Option<Rolle> {
        self.paarungen.rolle_von(id)
    }

    pub fn wartend_anzahl(&self) -> usize {
        self.warteschlange.len()
    }

    pub fn paar_anzahl(&self) -> usize {
        self.paarungen.paar_anzahl()
    }

    pub fn angemeldet_anzahl(&self) -> usize {
        self.zustaende.len()
    }

    /// Wartende Sitzungen, aelteste zuerst
    pub fn wartende(&self) -> &[SessionId] {
        self.warteschlange.ids()
    }

    /// Sucht einen Partner fuer `id`
    ///
    /// Eine bestehende Paarung wird vorher aufgeloest und der alte Partner
    /// benachrichtigt. Kandidaten werden LIFO entnommen; nicht mehr
    /// erreichbare Kandidaten (laut `ist_erreichbar`) werden verworfen, bis
    /// ein erreichbarer gefunden oder die Warteschlange leer ist. Jede
    /// Iteration verkleinert die Warteschlange, die Schleife terminiert also.
    ///
    /// Rollen: der entnommene Kandidat wird Initiator, `id` Responder.
    pub fn partner_suchen<F>(&mut self, id: SessionId, ist_erreichbar: F) -> Suche
    where
        F: Fn(&SessionId) -> bool,
    {
        if !self.zustaende.contains_key(&id) {
            tracing::debug!(session = %id, "Partnersuche fuer unbekannte Sitzung ignoriert");
            return Suche {
                ausgang: Ausgang::leer(),
                ergebnis: SuchErgebnis::Ignoriert,
                veraltete_kandidaten: 0,
            };
        }

        let mut ausgang = Ausgang::leer();

        // Skip: alte Paarung zuerst aufloesen
        if let Some(alter_partner) = self.paarungen.trennen(&id) {
            tracing::debug!(session = %id, partner = %alter_partner, "Skip – alte Paarung aufgeloest");
            ausgang.push(alter_partner, ServerEvent::PartnerDisconnected);
            self.zustand_aktualisieren(alter_partner);
        }

        // Erneute Suche aus der Warteschlange heraus darf nicht sich selbst finden
        self.warteschlange.entfernen(&id);

        let mut veraltet = 0;
        let mut gefunden = None;
        while let Some(kandidat) = self.warteschlange.juengsten_entnehmen() {
            if ist_erreichbar(&kandidat) && self.zustaende.contains_key(&kandidat) {
                gefunden = Some(kandidat);
                break;
            }
            veraltet += 1;
            tracing::debug!(session = %id, kandidat = %kandidat, "Veralteter Kandidat verworfen");
            self.zustand_aktualisieren(kandidat);
        }

        let ergebnis = match gefunden {
            Some(kandidat) => {
                self.paarungen.verbinden(kandidat, id);
                self.zustand_aktualisieren(kandidat);
                self.zustand_aktualisieren(id);

                ausgang.push(id, ServerEvent::MatchFound(kandidat));
                ausgang.push(kandidat, ServerEvent::MatchFound(id));
                ausgang.push(id, ServerEvent::Role(Rolle::Responder));
                ausgang.push(kandidat, ServerEvent::Role(Rolle::Initiator));

                tracing::info!(initiator = %kandidat, responder = %id, "Paarung hergestellt");
                SuchErgebnis::Gepaart(kandidat)
            }
            None => {
                self.warteschlange.einreihen(id);
                self.zustand_aktualisieren(id);
                tracing::debug!(session = %id, "Kein Kandidat – Sitzung wartet");
                SuchErgebnis::Wartet
            }
        };

        debug_assert!(self.invarianten_pruefen().is_ok());

        Suche {
            ausgang,
            ergebnis,
            veraltete_kandidaten: veraltet,
        }
    }

    /// Nimmt `id` aus der Warteschlange (no-op wenn nicht wartend)
    ///
    /// Gibt `true` zurueck wenn die Sitzung gewartet hat.
    pub fn warten_abbrechen(&mut self, id: &SessionId) -> bool {
        let entfernt = self.warteschlange.entfernen(id);
        if entfernt {
            self.zustand_aktualisieren(*id);
            tracing::debug!(session = %id, "Warten abgebrochen");
        }
        entfernt
    }

    /// Prueft alle Invarianten von Warteschlange, Tabelle und Zustaenden
    pub fn invarianten_pruefen(&self) -> Result<(), String> {
        if !self.paarungen.ist_symmetrisch() {
            return Err("Paarungstabelle ist nicht symmetrisch".into());
        }

        for id in self.warteschlange.ids() {
            if self.paarungen.ist_gepaart(id) {
                return Err(format!("{id} ist gleichzeitig wartend und gepaart"));
            }
        }

        let mut gesehen = std::collections::HashSet::new();
        for id in self.warteschlange.ids() {
            if !gesehen.insert(id) {
                return Err(format!("{id} steht doppelt in der Warteschlange"));
            }
        }

        for (id, zustand) in &self.zustaende {
            let erwartet = self.zustand_berechnen(id);
            if *zustand != erwartet {
                return Err(format!(
                    "{id} hat Zustand {zustand:?}, erwartet {erwartet:?}"
                ));
            }
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    fn zustand_berechnen(&self, id: &SessionId) -> SitzungsZustand {
        if self.paarungen.ist_gepaart(id) {
            SitzungsZustand::Gepaart
        } else if self.warteschlange.enthaelt(id) {
            SitzungsZustand::Wartend
        } else {
            SitzungsZustand::Leerlauf
        }
    }

    /// Leitet den gespeicherten Zustand neu aus der Mitgliedschaft ab
    ///
    /// Nur fuer angemeldete Sitzungen.
    pub(crate) fn zustand_aktualisieren(&mut self, id: SessionId) {
        let neu = self.zustand_berechnen(&id);
        if let Some(zustand) = self.zustaende.get_mut(&id) {
            *zustand = neu;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn immer(_: &SessionId) -> bool {
        true
    }

    fn angemeldet(vermittler: &mut Vermittler) -> SessionId {
        let id = SessionId::new();
        vermittler.anmelden(id);
        id
    }

    #[test]
    fn erste_suche_wartet() {
        let mut v = Vermittler::neu();
        let x = angemeldet(&mut v);

        let suche = v.partner_suchen(x, immer);
        assert_eq!(suche.ergebnis, SuchErgebnis::Wartet);
        assert!(suche.ausgang.is_empty());
        assert_eq!(v.zustand(&x), Some(SitzungsZustand::Wartend));
        assert_eq!(v.wartende(), &[x]);
    }

    #[test]
    fn zweite_suche_paart_mit_rollen_und_reihenfolge() {
        let mut v = Vermittler::neu();
        let x = angemeldet(&mut v);
        let y = angemeldet(&mut v);

        v.partner_suchen(x, immer);
        let suche = v.partner_suchen(y, immer);

        assert_eq!(suche.ergebnis, SuchErgebnis::Gepaart(x));
        let ereignisse: Vec<_> = suche.ausgang.iter().cloned().collect();
        assert_eq!(
            ereignisse,
            vec![
                Zustellung { an: y, ereignis: ServerEvent::MatchFound(x) },
                Zustellung { an: x, ereignis: ServerEvent::MatchFound(y) },
                Zustellung { an: y, ereignis: ServerEvent::Role(Rolle::Responder) },
                Zustellung { an: x, ereignis: ServerEvent::Role(Rolle::Initiator) },
            ]
        );
        assert_eq!(v.rolle_von(&x), Some(Rolle::Initiator));
        assert_eq!(v.rolle_von(&y), Some(Rolle::Responder));
        assert_eq!(v.wartend_anzahl(), 0);
        assert_eq!(v.zustand(&x), Some(SitzungsZustand::Gepaart));
        assert_eq!(v.zustand(&y), Some(SitzungsZustand::Gepaart));
    }

    #[test]
    fn juengster_kandidat_wird_bevorzugt() {
        let mut v = Vermittler::neu();
        let alt = angemeldet(&mut v);
        let jung = angemeldet(&mut v);
        // Zwei Wartende direkt einreihen, sonst wuerden sie sich gegenseitig finden
        v.warteschlange.einreihen(alt);
        v.warteschlange.einreihen(jung);
        v.zustand_aktualisieren(alt);
        v.zustand_aktualisieren(jung);

        let z = angemeldet(&mut v);
        let suche = v.partner_suchen(z, immer);
        assert_eq!(suche.ergebnis, SuchErgebnis::Gepaart(jung));
        assert_eq!(v.wartende(), &[alt]);
    }

    #[test]
    fn veraltete_kandidaten_werden_uebersprungen() {
        let mut v = Vermittler::neu();
        let lebendig = angemeldet(&mut v);
        let tot1 = angemeldet(&mut v);
        let tot2 = angemeldet(&mut v);
        for id in [lebendig, tot1, tot2] {
            v.warteschlange.einreihen(id);
            v.zustand_aktualisieren(id);
        }

        let z = angemeldet(&mut v);
        let suche = v.partner_suchen(z, |id| *id != tot1 && *id != tot2);

        assert_eq!(suche.ergebnis, SuchErgebnis::Gepaart(lebendig));
        assert_eq!(suche.veraltete_kandidaten, 2);
        assert!(suche.ausgang.an(&tot1).is_empty());
        assert_eq!(v.zustand(&tot1), Some(SitzungsZustand::Leerlauf));
        assert_eq!(v.wartend_anzahl(), 0);
    }

    #[test]
    fn nur_veraltete_kandidaten_fuehrt_zum_warten() {
        let mut v = Vermittler::neu();
        let tot = angemeldet(&mut v);
        v.partner_suchen(tot, immer);

        let z = angemeldet(&mut v);
        let suche = v.partner_suchen(z, |id| *id != tot);
        assert_eq!(suche.ergebnis, SuchErgebnis::Wartet);
        assert_eq!(suche.veraltete_kandidaten, 1);
        assert_eq!(v.wartende(), &[z]);
    }

    #[test]
    fn skip_loest_alte_paarung_vor_neuer_suche() {
        let mut v = Vermittler::neu();
        let x = angemeldet(&mut v);
        let y = angemeldet(&mut v);
        let z = angemeldet(&mut v);
        v.partner_suchen(x, immer);
        v.partner_suchen(y, immer);
        v.partner_suchen(z, immer);

        let suche = v.partner_suchen(x, immer);
        assert_eq!(suche.ergebnis, SuchErgebnis::Gepaart(z));
        assert_eq!(suche.ausgang.an(&y), vec![&ServerEvent::PartnerDisconnected]);
        // Abmeldung des alten Partners kommt vor allen Paarungs-Ereignissen
        assert_eq!(suche.ausgang.iter().next().map(|z| z.an), Some(y));
        assert_eq!(v.partner_von(&x), Some(z));
        assert_eq!(v.zustand(&y), Some(SitzungsZustand::Leerlauf));
        assert_eq!(v.paar_anzahl(), 1);
    }

    #[test]
    fn skip_ohne_kandidat_wartet() {
        let mut v = Vermittler::neu();
        let x = angemeldet(&mut v);
        let y = angemeldet(&mut v);
        v.partner_suchen(x, immer);
        v.partner_suchen(y, immer);

        let suche = v.partner_suchen(x, immer);
        assert_eq!(suche.ergebnis, SuchErgebnis::Wartet);
        assert_eq!(suche.ausgang.partner_verlassen_anzahl(), 1);
        // Der verlassene Partner wird nicht automatisch eingereiht
        assert_eq!(v.wartende(), &[x]);
        assert_eq!(v.zustand(&y), Some(SitzungsZustand::Leerlauf));
    }

    #[test]
    fn wiederholte_suche_waehrend_warten_findet_nicht_sich_selbst() {
        let mut v = Vermittler::neu();
        let x = angemeldet(&mut v);
        v.partner_suchen(x, immer);

        let suche = v.partner_suchen(x, immer);
        assert_eq!(suche.ergebnis, SuchErgebnis::Wartet);
        assert_eq!(v.wartende(), &[x]);
        assert_eq!(v.paar_anzahl(), 0);
    }

    #[test]
    fn unbekannte_sitzung_wird_ignoriert() {
        let mut v = Vermittler::neu();
        let suche = v.partner_suchen(SessionId::new(), immer);
        assert_eq!(suche.ergebnis, SuchErgebnis::Ignoriert);
        assert_eq!(v.wartend_anzahl(), 0);
    }

    #[test]
    fn warten_abbrechen_ist_idempotent() {
        let mut v = Vermittler::neu();
        let x = angemeldet(&mut v);
        assert!(!v.warten_abbrechen(&x));

        v.partner_suchen(x, immer);
        assert!(v.warten_abbrechen(&x));
        assert!(!v.warten_abbrechen(&x));
        assert_eq!(v.zustand(&x), Some(SitzungsZustand::Leerlauf));
        assert!(v.invarianten_pruefen().is_ok());
    }

    #[test]
    fn warten_abbrechen_laesst_paarung_unberuehrt() {
        let mut v = Vermittler::neu();
        let x = angemeldet(&mut v);
        let y = angemeldet(&mut v);
        v.partner_suchen(x, immer);
        v.partner_suchen(y, immer);

        assert!(!v.warten_abbrechen(&x));
        assert_eq!(v.partner_von(&x), Some(y));
    }

    #[test]
    fn invariantenpruefung_erkennt_divergenz() {
        let mut v = Vermittler::neu();
        let x = angemeldet(&mut v);
        v.warteschlange.einreihen(x);
        // Zustand absichtlich nicht aktualisiert
        assert!(v.invarianten_pruefen().is_err());
        v.zustand_aktualisieren(x);
        assert!(v.invarianten_pruefen().is_ok());
    }
}
