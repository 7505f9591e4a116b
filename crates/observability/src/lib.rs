//! # tandem-observability
//!
//! Observability-Crate fuer Tandem:
//! - Prometheus-kompatible Metriken (`/metrics`)
//! - Health-Check-Endpunkt (`/health`)
//! - Structured Logging via tracing-subscriber
//! - Request-Tracing fuer die HTTP-Routen

pub mod health;
pub mod logging;
pub mod metrics;

pub use health::{
    health_router, HealthResponse, HealthState, HealthStatus, StatistikQuelle,
    VermittlungsStatistik,
};
pub use logging::logging_initialisieren;
pub use metrics::{metrics_router, TandemMetrics};

use axum::Router;
use std::sync::Arc;

/// Erstellt den Tracing-Layer fuer HTTP-Anfragen.
///
/// Loggt jede Anfrage mit Methode, Pfad, Statuscode und Dauer.
pub fn request_timing_layer() -> tower_http::trace::TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
> {
    tower_http::trace::TraceLayer::new_for_http()
}

/// Router mit `/metrics` und `/health`
pub fn observability_router(
    metriken: TandemMetrics,
    quelle: Arc<dyn StatistikQuelle>,
    max_clients: usize,
) -> Router {
    Router::new()
        .merge(metrics_router(metriken))
        .merge(health_router(HealthState::neu(quelle, max_clients)))
}
