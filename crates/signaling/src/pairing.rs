//! Paarungstabelle – Wer darf an wen weiterleiten?
//!
//! Symmetrische Abbildung Sitzung -> Partner. Eine Paarung ist eine logische
//! Einheit aus zwei Eintraegen, die nur gemeinsam angelegt und gemeinsam
//! entfernt werden.

use std::collections::HashMap;
use tandem_core::types::SessionId;
use tandem_protocol::Rolle;

/// Eine Richtung einer Paarung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paarung {
    pub partner: SessionId,
    /// Rolle der Sitzung, unter deren Schluessel dieser Eintrag liegt
    pub rolle: Rolle,
}

/// Symmetrische Paarungstabelle
#[derive(Debug, Default, Clone)]
pub struct Paarungstabelle {
    eintraege: HashMap<SessionId, Paarung>,
}

impl Paarungstabelle {
    /// Erstellt eine leere Tabelle
    pub fn neu() -> Self {
        Self::default()
    }

    /// Legt beide Richtungen einer Paarung an
    ///
    /// Gibt `false` zurueck und aendert nichts, wenn eine der beiden Sitzungen
    /// bereits gepaart ist oder beide identisch sind.
    pub fn verbinden(&mut self, initiator: SessionId, responder: SessionId) -> bool {
        if initiator == responder
            || self.eintraege.contains_key(&initiator)
            || self.eintraege.contains_key(&responder)
        {
            return false;
        }

        self.eintraege.insert(
            initiator,
            Paarung {
                partner: responder,
                rolle: Rolle::Initiator,
            },
        );
        self.eintraege.insert(
            responder,
            Paarung {
                partner: initiator,
                rolle: Rolle::Responder,
            },
        );
        true
    }

    /// Entfernt beide Richtungen der Paarung von `id`
    ///
    /// Gibt den bisherigen Partner zurueck.
    pub fn trennen(&mut self, id: &SessionId) -> Option<SessionId> {
        let paarung = self.eintraege.remove(id)?;
        self.eintraege.remove(&paarung.partner);
        Some(paarung.partner)
    }

    pub fn partner_von(&self, id: &SessionId) -> Option<SessionId> {
        self.eintraege.get(id).map(|p| p.partner)
    }

    pub fn rolle_von(&self, id: &SessionId) -> Option<Rolle> {
        self.eintraege.get(id).map(|p| p.rolle)
    }

    pub fn ist_gepaart(&self, id: &SessionId) -> bool {
        self.eintraege.contains_key(id)
    }

    /// Anzahl der Paarungen (nicht der Eintraege)
    pub fn paar_anzahl(&self) -> usize {
        self.eintraege.len() / 2
    }

    /// Alle gepaarten Sitzungen
    pub fn sitzungen(&self) -> impl Iterator<Item = &SessionId> {
        self.eintraege.keys()
    }

    /// Prueft Symmetrie und gegensaetzliche Rollen aller Eintraege
    pub fn ist_symmetrisch(&self) -> bool {
        self.eintraege.iter().all(|(id, paarung)| {
            self.eintraege
                .get(&paarung.partner)
                .is_some_and(|gegenueber| {
                    gegenueber.partner == *id && gegenueber.rolle == paarung.rolle.gegenteil()
                })
        })
    }
}
