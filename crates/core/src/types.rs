//! Identifikationstypen fuer Tandem
//!
//! Eine Sitzung ist genau eine Transportverbindung. Die ID wird beim
//! Verbindungsaufbau vergeben und bleibt fuer die Lebensdauer der
//! Verbindung stabil.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Sitzungs-ID (eine pro Transportverbindung)
///
/// Auf dem Draht als nackter UUID-String serialisiert, damit Clients die ID
/// unveraendert in `signal.target` zurueckgeben koennen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Erstellt eine neue zufaellige SessionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim_start_matches("session:")).map(Self)
    }
}
