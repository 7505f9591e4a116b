//! Vermittlung – Serialisierender Dienst um den `Vermittler`
//!
//! Alle Verbindungs-Tasks teilen sich eine `Vermittlung`. Jede Operation
//! laeuft unter einem einzigen Mutex: Zustandsaenderung und Zustellung des
//! resultierenden [`Ausgang`] passieren in derselben kritischen Sektion.
//! Damit sieht jeder Client die Ereignisse einer Paarung in der Reihenfolge,
//! in der der Vermittler sie erzeugt hat, auch wenn mehrere Tasks
//! gleichzeitig zugreifen. Die Zustellung selbst blockiert nie (`try_send`).

use parking_lot::Mutex;
use std::sync::Arc;
use tandem_core::types::SessionId;
use tandem_observability::{StatistikQuelle, TandemMetrics, VermittlungsStatistik};
use tandem_protocol::{events::Willkommen, ServerEvent, SignalArt};
use tokio::sync::mpsc;

use crate::error::{SignalingError, SignalingResult};
use crate::matchmaker::{Ausgang, SitzungsZustand, SuchErgebnis, Vermittler};
use crate::registry::Verbindungsregister;
use crate::relay::Weiterleitung;

/// Geteilter Vermittlungsdienst
pub struct Vermittlung {
    vermittler: Mutex<Vermittler>,
    register: Verbindungsregister,
    metriken: TandemMetrics,
    max_verbindungen: usize,
}

impl Vermittlung {
    /// Erstellt eine neue Vermittlung ohne Verbindungslimit
    pub fn neu(queue_groesse: usize, metriken: TandemMetrics) -> Arc<Self> {
        Self::mit_limit(queue_groesse, usize::MAX, metriken)
    }

    /// Erstellt eine neue Vermittlung, die hoechstens `max_verbindungen`
    /// Sitzungen gleichzeitig annimmt
    pub fn mit_limit(
        queue_groesse: usize,
        max_verbindungen: usize,
        metriken: TandemMetrics,
    ) -> Arc<Self> {
        Arc::new(Self {
            vermittler: Mutex::new(Vermittler::neu()),
            register: Verbindungsregister::mit_queue_groesse(queue_groesse),
            metriken,
            max_verbindungen,
        })
    }

    // -----------------------------------------------------------------------
    // Verbindungen
    // -----------------------------------------------------------------------

    /// Registriert eine neue Sitzung und stellt ihr `welcome` zu
    ///
    /// Die Sitzung ist danach erreichbar und im Zustand `Leerlauf`. Limit-Pruefung
    /// und Registrierung laufen unter demselben Lock, gleichzeitige Verbindungen
    /// koennen das Limit also nicht ueberschreiten.
    pub fn verbinden(&self, id: SessionId) -> SignalingResult<mpsc::Receiver<ServerEvent>> {
        let mut vermittler = self.vermittler.lock();
        if self.register.anzahl() >= self.max_verbindungen {
            return Err(SignalingError::ServerVoll);
        }
        let rx = self.register.registrieren(id)?;
        vermittler.anmelden(id);
        self.register
            .senden(&id, ServerEvent::Welcome(Willkommen { session_id: id }));
        self.gauges_setzen(&vermittler);
        tracing::info!(session = %id, "Sitzung verbunden");
        Ok(rx)
    }

    /// Verbindungsverlust: Abbau, Partner benachrichtigen, Sitzung vergessen
    ///
    /// Idempotent, ein zweiter Aufruf hat keine Wirkung.
    pub fn verbindung_verloren(&self, id: &SessionId) {
        let mut vermittler = self.vermittler.lock();
        // Erst unerreichbar machen, dann abbauen
        let war_registriert = self.register.entfernen(id);
        let ausgang = vermittler.verbindung_verloren(id);
        self.zustellen(ausgang);
        self.gauges_setzen(&vermittler);
        if war_registriert {
            tracing::info!(session = %id, "Sitzung getrennt");
        }
    }

    // -----------------------------------------------------------------------
    // Vermittlung
    // -----------------------------------------------------------------------

    /// Partner suchen (request-match, auch Skip)
    pub fn partner_suchen(&self, id: SessionId) -> SuchErgebnis {
        let mut vermittler = self.vermittler.lock();
        let register = &self.register;
        let suche = vermittler.partner_suchen(id, |kandidat| register.ist_verbunden(kandidat));

        self.metriken
            .stale_candidates_total
            .inc_by(suche.veraltete_kandidaten as u64);
        if matches!(suche.ergebnis, SuchErgebnis::Gepaart(_)) {
            self.metriken.matches_total.inc();
        }
        self.zustellen(suche.ausgang);
        self.gauges_setzen(&vermittler);
        suche.ergebnis
    }

    /// Warteschlange verlassen (cancel-wait)
    pub fn warten_abbrechen(&self, id: &SessionId) -> bool {
        let mut vermittler = self.vermittler.lock();
        let entfernt = vermittler.warten_abbrechen(id);
        self.gauges_setzen(&vermittler);
        entfernt
    }

    /// Suche beenden und Paarung aufloesen (explicit-stop)
    pub fn suche_stoppen(&self, id: &SessionId) {
        let mut vermittler = self.vermittler.lock();
        let ausgang = vermittler.suche_stoppen(id);
        self.zustellen(ausgang);
        self.gauges_setzen(&vermittler);
    }

    // -----------------------------------------------------------------------
    // Relay
    // -----------------------------------------------------------------------

    /// Leitet ein Signal an den Partner von `sender` weiter
    ///
    /// Gibt `true` zurueck wenn das Signal zugestellt wurde.
    pub fn signal_weiterleiten(
        &self,
        sender: SessionId,
        ziel: Option<SessionId>,
        signal: serde_json::Value,
    ) -> bool {
        let art = SignalArt::klassifizieren(&signal);
        let vermittler = self.vermittler.lock();
        let weiterleitung = vermittler.signal_weiterleiten(sender, ziel, signal);
        tracing::trace!(session = %sender, art = art.als_str(), "Signal");
        self.weiterleitung_abschliessen(weiterleitung, art.als_str())
    }

    /// Leitet einen Text an den Partner von `sender` weiter
    pub fn text_weiterleiten(&self, sender: SessionId, text: String) -> bool {
        let vermittler = self.vermittler.lock();
        let weiterleitung = vermittler.text_weiterleiten(sender, text);
        self.weiterleitung_abschliessen(weiterleitung, "text")
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    pub fn zustand(&self, id: &SessionId) -> Option<SitzungsZustand> {
        self.vermittler.lock().zustand(id)
    }

    pub fn partner_von(&self, id: &SessionId) -> Option<SessionId> {
        self.vermittler.lock().partner_von(id)
    }

    /// Prueft die Invarianten von Vermittler und Register
    pub fn invarianten_pruefen(&self) -> Result<(), String> {
        let vermittler = self.vermittler.lock();
        vermittler.invarianten_pruefen()?;
        for id in vermittler.wartende() {
            if !self.register.ist_verbunden(id) {
                return Err(format!("{id} wartet, ist aber nicht registriert"));
            }
        }
        Ok(())
    }

    pub fn register(&self) -> &Verbindungsregister {
        &self.register
    }

    pub fn metriken(&self) -> &TandemMetrics {
        &self.metriken
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden (Aufruf nur unter dem Lock)
    // -----------------------------------------------------------------------

    fn zustellen(&self, ausgang: Ausgang) {
        self.metriken
            .partner_left_total
            .inc_by(ausgang.partner_verlassen_anzahl() as u64);
        for zustellung in ausgang {
            self.register.senden(&zustellung.an, zustellung.ereignis);
        }
    }

    fn weiterleitung_abschliessen(&self, weiterleitung: Weiterleitung, art: &str) -> bool {
        match weiterleitung {
            Weiterleitung::Zustellen(zustellung) => {
                self.metriken.relayed_total.with_label_values(&[art]).inc();
                self.register.senden(&zustellung.an, zustellung.ereignis)
            }
            Weiterleitung::Verworfen(grund) => {
                self.metriken
                    .dropped_relays_total
                    .with_label_values(&[grund.als_str()])
                    .inc();
                false
            }
        }
    }

    fn gauges_setzen(&self, vermittler: &Vermittler) {
        self.metriken
            .connected_sessions
            .set(self.register.anzahl() as i64);
        self.metriken
            .waiting_sessions
            .set(vermittler.wartend_anzahl() as i64);
        self.metriken
            .active_pairs
            .set(vermittler.paar_anzahl() as i64);
    }
}

impl StatistikQuelle for Vermittlung {
    fn statistik(&self) -> VermittlungsStatistik {
        let vermittler = self.vermittler.lock();
        VermittlungsStatistik {
            verbunden: self.register.anzahl(),
            wartend: vermittler.wartend_anzahl(),
            paare: vermittler.paar_anzahl(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
