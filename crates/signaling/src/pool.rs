//! Warteschlange – Sitzungen die einen Partner suchen
//!
//! Geordnete Folge ohne Duplikate. Entnommen wird immer die zuletzt
//! eingereihte Sitzung (LIFO).

use tandem_core::types::SessionId;

/// Geordnete Warteschlange wartender Sitzungen
#[derive(Debug, Default, Clone)]
pub struct Warteschlange {
    ids: Vec<SessionId>,
}

impl Warteschlange {
    /// Erstellt eine leere Warteschlange
    pub fn neu() -> Self {
        Self::default()
    }

    /// Reiht eine Sitzung ein
    ///
    /// Gibt `false` zurueck wenn sie bereits wartet.
    pub fn einreihen(&mut self, id: SessionId) -> bool {
        if self.enthaelt(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Entnimmt die zuletzt eingereihte Sitzung
    pub fn juengsten_entnehmen(&mut self) -> Option<SessionId> {
        self.ids.pop()
    }

    /// Entfernt eine Sitzung (no-op wenn nicht vorhanden)
    pub fn entfernen(&mut self, id: &SessionId) -> bool {
        let vorher = self.ids.len();
        self.ids.retain(|wartend| wartend != id);
        self.ids.len() != vorher
    }

    pub fn enthaelt(&self, id: &SessionId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn ist_leer(&self) -> bool {
        self.ids.is_empty()
    }

    /// Alle wartenden Sitzungen, aelteste zuerst
    pub fn ids(&self) -> &[SessionId] {
        &self.ids
    }
}
