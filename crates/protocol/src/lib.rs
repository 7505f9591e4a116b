//! tandem-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Ereignisse die zwischen Client und Server
//! ausgetauscht werden, sowie das Frame-Format fuer TCP-Verbindungen.

pub mod events;
pub mod wire;

pub use events::{jetzt_ms, ClientEvent, FehlerCode, Rolle, ServerEvent, SignalArt};
pub use wire::{ClientCodec, FrameCodec, ServerCodec};
