//! Fehlertypen fuer Tandem
//!
//! Zentraler Fehler-Enum fuer Zustaende, die ausserhalb der Vermittlung
//! auftreten. Vermittlungs- und Relay-Bedingungen wie "kein Partner" sind
//! keine Fehler.

use thiserror::Error;

/// Globaler Result-Alias fuer Tandem
pub type Result<T> = std::result::Result<T, TandemError>;

/// Alle moeglichen Fehler im Tandem-System
#[derive(Debug, Error)]
pub enum TandemError {
    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),
}
