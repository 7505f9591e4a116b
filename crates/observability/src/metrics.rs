//! Prometheus-kompatible Metriken fuer Tandem
//!
//! Registrierte Metriken:
//! - `tandem_connected_sessions` – Gauge: Aktuell verbundene Sitzungen
//! - `tandem_waiting_sessions` – Gauge: Sitzungen in der Warteschlange
//! - `tandem_active_pairs` – Gauge: Bestehende Paarungen
//! - `tandem_matches_total` – Counter: Hergestellte Paarungen
//! - `tandem_stale_candidates_total` – Counter: Verworfene, nicht mehr erreichbare Kandidaten
//! - `tandem_relayed_total` – Counter: Weitergeleitete Nachrichten (kind)
//! - `tandem_dropped_relays_total` – Counter: Verworfene Weiterleitungen (reason)
//! - `tandem_partner_left_total` – Counter: Versendete `partner-disconnected`

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle Tandem-Prometheus-Metriken
///
/// Jede Instanz hat eine eigene Registry, Clone teilt sie.
#[derive(Clone)]
pub struct TandemMetrics {
    pub registry: Arc<Registry>,

    // Zustand
    pub connected_sessions: IntGauge,
    pub waiting_sessions: IntGauge,
    pub active_pairs: IntGauge,

    // Ereignisse
    pub matches_total: IntCounter,
    pub stale_candidates_total: IntCounter,
    pub relayed_total: IntCounterVec,
    pub dropped_relays_total: IntCounterVec,
    pub partner_left_total: IntCounter,
}

impl TandemMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let connected_sessions = IntGauge::with_opts(Opts::new(
            "tandem_connected_sessions",
            "Anzahl aktuell verbundener Sitzungen",
        ))?;
        registry.register(Box::new(connected_sessions.clone()))?;

        let waiting_sessions = IntGauge::with_opts(Opts::new(
            "tandem_waiting_sessions",
            "Anzahl wartender Sitzungen",
        ))?;
        registry.register(Box::new(waiting_sessions.clone()))?;

        let active_pairs = IntGauge::with_opts(Opts::new(
            "tandem_active_pairs",
            "Anzahl bestehender Paarungen",
        ))?;
        registry.register(Box::new(active_pairs.clone()))?;

        let matches_total = IntCounter::with_opts(Opts::new(
            "tandem_matches_total",
            "Gesamtanzahl hergestellter Paarungen",
        ))?;
        registry.register(Box::new(matches_total.clone()))?;

        let stale_candidates_total = IntCounter::with_opts(Opts::new(
            "tandem_stale_candidates_total",
            "Verworfene Kandidaten, die beim Entnehmen nicht mehr verbunden waren",
        ))?;
        registry.register(Box::new(stale_candidates_total.clone()))?;

        let relayed_total = IntCounterVec::new(
            Opts::new("tandem_relayed_total", "Weitergeleitete Nachrichten"),
            &["kind"],
        )?;
        registry.register(Box::new(relayed_total.clone()))?;

        let dropped_relays_total = IntCounterVec::new(
            Opts::new("tandem_dropped_relays_total", "Verworfene Weiterleitungen"),
            &["reason"],
        )?;
        registry.register(Box::new(dropped_relays_total.clone()))?;

        let partner_left_total = IntCounter::with_opts(Opts::new(
            "tandem_partner_left_total",
            "Versendete partner-disconnected-Benachrichtigungen",
        ))?;
        registry.register(Box::new(partner_left_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            connected_sessions,
            waiting_sessions,
            active_pairs,
            matches_total,
            stale_candidates_total,
            relayed_total,
            dropped_relays_total,
            partner_left_total,
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: TandemMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<TandemMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = TandemMetrics::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn zwei_instanzen_kollidieren_nicht() {
        let a = TandemMetrics::neu().unwrap();
        let b = TandemMetrics::neu().unwrap();
        a.matches_total.inc();
        assert_eq!(a.matches_total.get(), 1);
        assert_eq!(b.matches_total.get(), 0);
    }

    #[test]
    fn counter_mit_labels() {
        let metriken = TandemMetrics::neu().unwrap();
        metriken.relayed_total.with_label_values(&["offer"]).inc();
        metriken.relayed_total.with_label_values(&["offer"]).inc();
        metriken
            .dropped_relays_total
            .with_label_values(&["unpaired"])
            .inc();

        assert_eq!(metriken.relayed_total.with_label_values(&["offer"]).get(), 2);
        assert_eq!(
            metriken
                .dropped_relays_total
                .with_label_values(&["unpaired"])
                .get(),
            1
        );
    }

    #[test]
    fn metriken_export_prometheus_format() {
        let metriken = TandemMetrics::neu().unwrap();
        metriken.connected_sessions.set(5);
        metriken.matches_total.inc();

        let output = metriken.exportieren().unwrap();
        assert!(output.contains("tandem_connected_sessions 5"));
        assert!(output.contains("tandem_matches_total 1"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }
}
