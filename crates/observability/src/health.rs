//! Health-Check-Endpunkt fuer Tandem
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und Vermittlungs-Statistik

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Momentaufnahme der Vermittlung
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VermittlungsStatistik {
    /// Verbundene Sitzungen
    pub verbunden: usize,
    /// Sitzungen in der Warteschlange
    pub wartend: usize,
    /// Bestehende Paarungen
    pub paare: usize,
}

/// Liefert die aktuelle Statistik fuer den Health-Check
pub trait StatistikQuelle: Send + Sync + 'static {
    fn statistik(&self) -> VermittlungsStatistik;
}

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Maximale Clientanzahl erreicht, neue Verbindungen werden abgelehnt
    Degraded,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    #[serde(flatten)]
    pub statistik: VermittlungsStatistik,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Arc<Instant>,
    pub quelle: Arc<dyn StatistikQuelle>,
    pub max_clients: usize,
}

impl HealthState {
    pub fn neu(quelle: Arc<dyn StatistikQuelle>, max_clients: usize) -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            quelle,
            max_clients,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Erstellt die Antwort fuer den aktuellen Zeitpunkt
    pub fn antwort(&self) -> HealthResponse {
        let statistik = self.quelle.statistik();
        let status = if statistik.verbunden >= self.max_clients {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            statistik,
        }
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
///
/// Auch `degraded` antwortet mit 200, die Probe soll nicht fehlschlagen.
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.antwort()))
}
