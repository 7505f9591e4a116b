//! Integration-Tests fuer Lebendigkeit und gleichzeitige Zugriffe

use std::collections::HashSet;
use std::sync::Arc;

use tandem_core::types::SessionId;
use tandem_observability::{StatistikQuelle, TandemMetrics};
use tandem_protocol::ServerEvent;
use tandem_signaling::{SitzungsZustand, Vermittlung};
use tokio::sync::mpsc;

fn vermittlung() -> Arc<Vermittlung> {
    Vermittlung::neu(64, TandemMetrics::neu().expect("Metriken"))
}

fn verbinden(v: &Vermittlung, n: usize) -> Vec<(SessionId, mpsc::Receiver<ServerEvent>)> {
    (0..n)
        .map(|_| {
            let id = SessionId::new();
            let rx = v.verbinden(id).expect("Registrierung");
            (id, rx)
        })
        .collect()
}

#[test]
fn lebendigkeit_warteschlange_konvergiert() {
    for n in [2usize, 6, 10, 31] {
        let v = vermittlung();
        let sitzungen = verbinden(&v, n);

        for (id, _) in &sitzungen {
            v.partner_suchen(*id);
            v.invarianten_pruefen().expect("Invariante");
        }

        let statistik = v.statistik();
        assert_eq!(statistik.wartend, n % 2, "n = {n}");
        assert_eq!(statistik.paare, n / 2, "n = {n}");
    }
}

#[test]
fn skip_ergibt_immer_genau_eine_paarung() {
    let v = vermittlung();
    let sitzungen = verbinden(&v, 5);
    for (id, _) in &sitzungen {
        v.partner_suchen(*id);
    }

    // Jede gepaarte Sitzung skippt reihum
    for (id, _) in &sitzungen {
        if v.zustand(id) == Some(SitzungsZustand::Gepaart) {
            v.partner_suchen(*id);
            v.invarianten_pruefen().expect("Invariante");
            let partner = v.partner_von(id);
            if let Some(p) = partner {
                assert_eq!(v.partner_von(&p), Some(*id));
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn gleichzeitige_suchen_paaren_keinen_kandidaten_doppelt() {
    const N: usize = 200;

    let v = vermittlung();
    let sitzungen = verbinden(&v, N);
    let ids: Vec<SessionId> = sitzungen.iter().map(|(id, _)| *id).collect();

    let mut tasks = Vec::new();
    for id in ids.clone() {
        let v = Arc::clone(&v);
        tasks.push(tokio::spawn(async move {
            v.partner_suchen(id);
        }));
    }
    for task in tasks {
        task.await.expect("Task abgebrochen");
    }

    v.invarianten_pruefen().expect("Invariante");
    let statistik = v.statistik();
    assert_eq!(statistik.paare, N / 2);
    assert_eq!(statistik.wartend, 0);

    // Jede Sitzung hat genau einen Partner, und keiner taucht doppelt auf
    let mut gesehen = HashSet::new();
    for id in &ids {
        let partner = v.partner_von(id).expect("jede Sitzung ist gepaart");
        assert_eq!(v.partner_von(&partner), Some(*id));
        let (a, b) = (id.to_string(), partner.to_string());
        gesehen.insert(if a < b { (a, b) } else { (b, a) });
    }
    assert_eq!(gesehen.len(), N / 2);

    // Jede Sitzung hat match-found vor role erhalten
    for (id, mut rx) in sitzungen {
        let mut ereignisse = Vec::new();
        while let Ok(e) = rx.try_recv() {
            ereignisse.push(e);
        }
        assert!(matches!(ereignisse[0], ServerEvent::Welcome(_)), "{id}");
        assert!(matches!(ereignisse[1], ServerEvent::MatchFound(_)), "{id}");
        assert!(matches!(ereignisse[2], ServerEvent::Role(_)), "{id}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn gleichzeitige_trennungen_hinterlassen_konsistenten_zustand() {
    const N: usize = 100;

    let v = vermittlung();
    let sitzungen = verbinden(&v, N);
    for (id, _) in &sitzungen {
        v.partner_suchen(*id);
    }

    let mut tasks = Vec::new();
    for (i, (id, _)) in sitzungen.iter().enumerate() {
        let v = Arc::clone(&v);
        let id = *id;
        tasks.push(tokio::spawn(async move {
            if i % 3 == 0 {
                v.verbindung_verloren(&id);
            } else {
                v.partner_suchen(id);
            }
        }));
    }
    for task in tasks {
        task.await.expect("Task abgebrochen");
    }

    v.invarianten_pruefen().expect("Invariante");
    let statistik = v.statistik();
    assert_eq!(statistik.verbunden, N - (0..N).filter(|i| i % 3 == 0).count());
    assert!(statistik.wartend <= 1);
}
