//! Relay – Weiterleitung zwischen genau zwei gepaarten Sitzungen
//!
//! Das einzige massgebliche Ziel ist der Partner laut Paarungstabelle.
//! Ein vom Client angegebenes Ziel ist nur ein Hinweis: weicht es vom
//! eingetragenen Partner ab, wird die Nachricht verworfen, genau wie bei
//! fehlendem Partner. Inhalte werden nie geprueft oder veraendert.

use tandem_core::types::SessionId;
use tandem_protocol::{events::SignalWeiterleitung, ServerEvent};

use crate::matchmaker::{Vermittler, Zustellung};

/// Grund fuer eine verworfene Weiterleitung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verwerfungsgrund {
    /// Absender hat keinen Partner (mehr)
    OhnePartner,
    /// Angegebenes Ziel ist nicht der eingetragene Partner
    FremdesZiel,
}

impl Verwerfungsgrund {
    /// Label fuer Metriken
    pub fn als_str(self) -> &'static str {
        match self {
            Self::OhnePartner => "unpaired",
            Self::FremdesZiel => "unknown_target",
        }
    }
}

/// Ergebnis einer Weiterleitung
#[derive(Debug, Clone, PartialEq)]
pub enum Weiterleitung {
    Zustellen(Zustellung),
    Verworfen(Verwerfungsgrund),
}

impl Vermittler {
    /// Leitet einen opaken Signaling-Inhalt an den Partner von `sender` weiter
    pub fn signal_weiterleiten(
        &self,
        sender: SessionId,
        angegebenes_ziel: Option<SessionId>,
        signal: serde_json::Value,
    ) -> Weiterleitung {
        let Some(partner) = self.paarungen.partner_von(&sender) else {
            tracing::debug!(session = %sender, "Signal ohne Partner verworfen");
            return Weiterleitung::Verworfen(Verwerfungsgrund::OhnePartner);
        };

        if let Some(ziel) = angegebenes_ziel {
            if ziel != partner {
                tracing::debug!(
                    session = %sender,
                    ziel = %ziel,
                    partner = %partner,
                    "Signal an fremdes Ziel verworfen"
                );
                return Weiterleitung::Verworfen(Verwerfungsgrund::FremdesZiel);
            }
        }

        Weiterleitung::Zustellen(Zustellung {
            an: partner,
            ereignis: ServerEvent::Signal(SignalWeiterleitung { sender, signal }),
        })
    }

    /// Leitet einen Text unveraendert an den Partner von `sender` weiter
    pub fn text_weiterleiten(&self, sender: SessionId, text: String) -> Weiterleitung {
        match self.paarungen.partner_von(&sender) {
            Some(partner) => Weiterleitung::Zustellen(Zustellung {
                an: partner,
                ereignis: ServerEvent::ReceiveMessage(text),
            }),
            None => {
                tracing::debug!(session = %sender, "Text ohne Partner verworfen");
                Weiterleitung::Verworfen(Verwerfungsgrund::OhnePartner)
            }
        }
    }
}
