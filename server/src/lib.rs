//! tandem-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tandem_observability::{
    observability_router, request_timing_layer, StatistikQuelle, TandemMetrics,
};
use tandem_signaling::{ws_router, SignalingServer, SignalingState};
use tokio::net::TcpListener;

use config::ServerConfig;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Baut den HTTP-Router (WebSocket, optional Health und Metriken)
    pub fn http_router(
        &self,
        state: &Arc<SignalingState>,
        shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> Router {
        let mut router = ws_router(Arc::clone(state), shutdown_rx);

        if self.config.observability.aktiviert {
            let quelle: Arc<dyn StatistikQuelle> = state.vermittlung.clone();
            router = router.merge(observability_router(
                state.vermittlung.metriken().clone(),
                quelle,
                self.config.server.max_clients,
            ));
        }

        router.layer(request_timing_layer())
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Metriken und Signaling-Zustand erstellen
    /// 2. TCP-Listener starten (Frame-Transport)
    /// 3. HTTP-Listener starten (WebSocket, Health, Metriken)
    /// 4. Auf Ctrl-C warten, dann alle Verbindungen beenden
    pub async fn starten(self) -> Result<()> {
        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %self.config.tcp_bind_adresse(),
            http = %self.config.http_bind_adresse(),
            max_clients = self.config.server.max_clients,
            "Server startet"
        );

        let metriken =
            TandemMetrics::neu().context("Metriken konnten nicht registriert werden")?;
        let state = SignalingState::neu(self.config.signaling_config(), metriken);
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        // TCP-Transport
        let tcp_adresse = self.config.tcp_bind_adresse();
        let tcp_listener = TcpListener::bind(&tcp_adresse)
            .await
            .with_context(|| format!("TCP-Bind auf {tcp_adresse} fehlgeschlagen"))?;
        let tcp_addr = tcp_listener.local_addr()?;
        let tcp_server = SignalingServer::neu(Arc::clone(&state), tcp_addr);
        let tcp_task = tokio::spawn(tcp_server.mit_listener(tcp_listener, shutdown_rx.clone()));

        // HTTP-Transport
        let http_adresse = self.config.http_bind_adresse();
        let http_listener = TcpListener::bind(&http_adresse)
            .await
            .with_context(|| format!("HTTP-Bind auf {http_adresse} fehlgeschlagen"))?;
        tracing::info!(adresse = %http_listener.local_addr()?, "HTTP-Server gestartet (/ws)");

        let router = self.http_router(&state, shutdown_rx.clone());
        let mut http_shutdown_rx = shutdown_rx.clone();
        let http_task = tokio::spawn(async move {
            axum::serve(http_listener, router)
                .with_graceful_shutdown(async move {
                    let _ = http_shutdown_rx.wait_for(|stop| *stop).await;
                })
                .await
        });

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
        let _ = shutdown_tx.send(true);

        match tcp_task.await {
            Ok(Err(e)) => tracing::warn!(fehler = %e, "TCP-Server mit Fehler beendet"),
            Err(e) => tracing::warn!(fehler = %e, "TCP-Task abgebrochen"),
            Ok(Ok(())) => {}
        }
        match http_task.await {
            Ok(Err(e)) => tracing::warn!(fehler = %e, "HTTP-Server mit Fehler beendet"),
            Err(e) => tracing::warn!(fehler = %e, "HTTP-Task abgebrochen"),
            Ok(Ok(())) => {}
        }

        tracing::info!("Server beendet");
        Ok(())
    }
}
