//! tandem-signaling – Vermittlung und Signaling-Relay
//!
//! Dieser Crate paart anonyme Sitzungen zu Zweierpaaren und leitet
//! Signaling-Inhalte und Textnachrichten zwischen den Partnern weiter.
//! Der eigentliche Medienstrom laeuft spaeter direkt zwischen den Clients.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)     WebSocket (/ws, axum)
//!     |                                   |
//!     +----------------+------------------+
//!                      v
//! ClientConnection (pro Verbindung ein Task)
//!     |
//!     v
//! EventDispatcher
//!     |
//!     v
//! Vermittlung (ein Mutex, Zustellung unter dem Lock)
//!     +-- Vermittler
//!     |     +-- Warteschlange   (LIFO, keine Duplikate)
//!     |     +-- Paarungstabelle (symmetrisch, mit Rollen)
//!     |     +-- relay / lifecycle
//!     +-- Verbindungsregister   (Send-Queue pro Sitzung)
//! ```

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod matchmaker;
pub mod pairing;
pub mod pool;
pub mod registry;
pub mod relay;
pub mod server_state;
pub mod tcp;
pub mod vermittlung;
pub mod ws;

// Bequeme Re-Exporte
pub use connection::{ClientConnection, Eingang};
pub use dispatcher::EventDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use matchmaker::{Ausgang, SitzungsZustand, SuchErgebnis, Vermittler, Zustellung};
pub use registry::Verbindungsregister;
pub use relay::{Verwerfungsgrund, Weiterleitung};
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::SignalingServer;
pub use vermittlung::Vermittlung;
pub use ws::ws_router;
