//! Integration-Tests fuer die Vermittlung (Szenarien ueber echte Send-Queues)

use std::sync::Arc;

use serde_json::json;
use tandem_core::types::SessionId;
use tandem_observability::{StatistikQuelle, TandemMetrics};
use tandem_protocol::{events::SignalWeiterleitung, Rolle, ServerEvent};
use tandem_signaling::{SitzungsZustand, SuchErgebnis, Vermittlung};
use tokio::sync::mpsc;

struct Client {
    id: SessionId,
    rx: mpsc::Receiver<ServerEvent>,
}

impl Client {
    /// Alle bisher zugestellten Ereignisse (ohne das welcome)
    fn ereignisse(&mut self) -> Vec<ServerEvent> {
        let mut alle = Vec::new();
        while let Ok(e) = self.rx.try_recv() {
            alle.push(e);
        }
        alle
    }
}

fn vermittlung() -> Arc<Vermittlung> {
    Vermittlung::neu(64, TandemMetrics::neu().expect("Metriken"))
}

fn verbinden(v: &Vermittlung) -> Client {
    let id = SessionId::new();
    let mut rx = v.verbinden(id).expect("Registrierung fehlgeschlagen");
    assert!(matches!(rx.try_recv(), Ok(ServerEvent::Welcome(_))));
    Client { id, rx }
}

fn invarianten(v: &Vermittlung) {
    if let Err(e) = v.invarianten_pruefen() {
        panic!("Invariante verletzt: {e}");
    }
}

#[test]
fn szenario_1_zweiter_sucher_paart_mit_erstem() {
    let v = vermittlung();
    let mut x = verbinden(&v);
    let mut y = verbinden(&v);

    assert_eq!(v.partner_suchen(x.id), SuchErgebnis::Wartet);
    invarianten(&v);
    assert_eq!(v.zustand(&x.id), Some(SitzungsZustand::Wartend));
    assert!(x.ereignisse().is_empty());

    assert_eq!(v.partner_suchen(y.id), SuchErgebnis::Gepaart(x.id));
    invarianten(&v);

    let fuer_x = x.ereignisse();
    let fuer_y = y.ereignisse();
    assert_eq!(fuer_x[0], ServerEvent::MatchFound(y.id));
    assert_eq!(fuer_y[0], ServerEvent::MatchFound(x.id));

    let rolle = |ereignisse: &[ServerEvent]| match ereignisse.get(1) {
        Some(ServerEvent::Role(r)) => *r,
        andere => panic!("role erwartet, erhalten {:?}", andere),
    };
    assert_eq!(rolle(&fuer_x), rolle(&fuer_y).gegenteil());
    assert_eq!(rolle(&fuer_x), Rolle::Initiator);
    assert_eq!(v.statistik().wartend, 0);
}

#[test]
fn szenario_2_wartender_trennt_vor_treffer() {
    let v = vermittlung();
    let x = verbinden(&v);
    v.partner_suchen(x.id);

    v.verbindung_verloren(&x.id);
    invarianten(&v);
    assert_eq!(v.statistik().wartend, 0);

    let mut z = verbinden(&v);
    assert_eq!(v.partner_suchen(z.id), SuchErgebnis::Wartet);
    assert!(z.ereignisse().is_empty());
    invarianten(&v);
}

#[test]
fn szenario_3_text_geht_nur_an_partner() {
    let v = vermittlung();
    let mut x = verbinden(&v);
    let mut y = verbinden(&v);
    v.partner_suchen(x.id);
    v.partner_suchen(y.id);
    x.ereignisse();
    y.ereignisse();

    assert!(v.text_weiterleiten(x.id, "hi".into()));
    assert_eq!(y.ereignisse(), vec![ServerEvent::ReceiveMessage("hi".into())]);
    assert!(x.ereignisse().is_empty());

    assert!(v.text_weiterleiten(y.id, "hallo".into()));
    assert_eq!(x.ereignisse(), vec![ServerEvent::ReceiveMessage("hallo".into())]);
}

#[test]
fn szenario_4_partner_trennt_keine_neueinreihung() {
    let v = vermittlung();
    let mut x = verbinden(&v);
    let y = verbinden(&v);
    v.partner_suchen(x.id);
    v.partner_suchen(y.id);
    x.ereignisse();

    v.verbindung_verloren(&y.id);
    invarianten(&v);
    assert_eq!(x.ereignisse(), vec![ServerEvent::PartnerDisconnected]);
    assert_eq!(v.zustand(&x.id), Some(SitzungsZustand::Leerlauf));
    assert_eq!(v.statistik().wartend, 0);

    // Erneute Suche funktioniert unabhaengig
    let mut w = verbinden(&v);
    assert_eq!(v.partner_suchen(x.id), SuchErgebnis::Wartet);
    assert_eq!(v.partner_suchen(w.id), SuchErgebnis::Gepaart(x.id));
    assert_eq!(w.ereignisse()[0], ServerEvent::MatchFound(x.id));
    invarianten(&v);
}

#[test]
fn szenario_5_skip_paart_sofort_mit_wartendem() {
    let v = vermittlung();
    let mut x = verbinden(&v);
    let mut y = verbinden(&v);
    let mut z = verbinden(&v);
    v.partner_suchen(x.id);
    v.partner_suchen(y.id);
    v.partner_suchen(z.id);
    x.ereignisse();
    y.ereignisse();
    assert_eq!(v.zustand(&z.id), Some(SitzungsZustand::Wartend));

    assert_eq!(v.partner_suchen(x.id), SuchErgebnis::Gepaart(z.id));
    invarianten(&v);

    assert_eq!(y.ereignisse(), vec![ServerEvent::PartnerDisconnected]);
    assert_eq!(x.ereignisse()[0], ServerEvent::MatchFound(z.id));
    assert_eq!(z.ereignisse()[0], ServerEvent::MatchFound(x.id));
    assert_eq!(v.partner_von(&x.id), Some(z.id));
    assert_eq!(v.partner_von(&y.id), None);
    assert_eq!(v.statistik().paare, 1);
}

#[test]
fn signal_vor_paarung_wird_verworfen_nicht_gepuffert() {
    let v = vermittlung();
    let x = verbinden(&v);
    let mut y = verbinden(&v);

    assert!(!v.signal_weiterleiten(x.id, Some(y.id), json!({"type": "offer"})));
    v.partner_suchen(x.id);
    v.partner_suchen(y.id);

    let fuer_y = y.ereignisse();
    assert_eq!(fuer_y.len(), 2, "nur match-found und role, kein altes Signal");
}

#[test]
fn signal_wird_unveraendert_mit_absender_zugestellt() {
    let v = vermittlung();
    let mut x = verbinden(&v);
    let y = verbinden(&v);
    v.partner_suchen(x.id);
    v.partner_suchen(y.id);
    x.ereignisse();

    let kandidat = json!({"candidate": "candidate:1 1 udp 2122260223 10.0.0.1 54321 typ host", "sdpMLineIndex": 0});
    assert!(v.signal_weiterleiten(y.id, None, kandidat.clone()));
    assert_eq!(
        x.ereignisse(),
        vec![ServerEvent::Signal(SignalWeiterleitung {
            sender: y.id,
            signal: kandidat
        })]
    );
}

#[test]
fn idempotenz_von_abbrechen_und_trennen() {
    let v = vermittlung();
    let mut x = verbinden(&v);
    let y = verbinden(&v);

    assert!(!v.warten_abbrechen(&x.id));
    v.partner_suchen(x.id);
    v.partner_suchen(y.id);
    x.ereignisse();

    v.verbindung_verloren(&y.id);
    v.verbindung_verloren(&y.id);
    assert_eq!(x.ereignisse(), vec![ServerEvent::PartnerDisconnected]);
    assert_eq!(v.metriken().partner_left_total.get(), 1);
    invarianten(&v);
}

#[test]
fn stoppen_im_leerlauf_ohne_bestaetigung() {
    let v = vermittlung();
    let mut x = verbinden(&v);
    v.suche_stoppen(&x.id);
    assert!(x.ereignisse().is_empty());
    assert_eq!(v.zustand(&x.id), Some(SitzungsZustand::Leerlauf));
}
