//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `SignalingServer` bindet einen TCP-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen tokio-Task mit einer `ClientConnection`.
//! Frames werden mit dem `ServerCodec` (Laenge + JSON) gelesen und geschrieben.

use futures_util::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tandem_protocol::ServerCodec;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use crate::connection::{ClientConnection, Eingang};
use crate::error::SignalingError;
use crate::server_state::SignalingState;

/// TCP-Signaling-Server
///
/// Bindet einen TCP-Socket und akzeptiert Verbindungen in einer Loop.
pub struct SignalingServer {
    state: Arc<SignalingState>,
    bind_addr: SocketAddr,
}

impl SignalingServer {
    /// Erstellt einen neuen SignalingServer
    pub fn neu(state: Arc<SignalingState>, bind_addr: SocketAddr) -> Self {
        Self { state, bind_addr }
    }

    /// Startet den TCP-Listener und akzeptiert Verbindungen
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(
        self,
        shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.mit_listener(listener, shutdown_rx).await
    }

    /// Akzeptiert Verbindungen auf einem bereits gebundenen Listener
    pub async fn mit_listener(
        self,
        listener: TcpListener,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let lokale_addr = listener.local_addr()?;

        tracing::info!(
            adresse = %lokale_addr,
            "TCP Signaling-Server gestartet"
        );

        loop {
            tokio::select! {
                // Neue eingehende Verbindung
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let state = Arc::clone(&self.state);
                            let shutdown_rx_clone = shutdown_rx.clone();
                            tokio::spawn(async move {
                                verbindung_bedienen(state, stream, peer_addr, shutdown_rx_clone).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Signaling-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("TCP Signaling-Server gestoppt");
        Ok(())
    }

    /// Gibt die Bind-Adresse zurueck
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

async fn verbindung_bedienen(
    state: Arc<SignalingState>,
    stream: TcpStream,
    peer_addr: SocketAddr,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) {
    let codec = ServerCodec::with_max_size(state.config.max_frame_groesse);
    let framed = Framed::new(stream, codec);

    tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");

    let (ausgang, eingang) = framed.split();
    let eingang = eingang.map(|frame| {
        frame
            .map(Eingang::Ereignis)
            .map_err(SignalingError::from)
    });

    // Bei vollem Server antwortet die Verbindung selbst mit SERVER_FULL
    let verbindung = ClientConnection::neu(state, peer_addr.to_string());
    match verbindung.verarbeiten(eingang, ausgang, shutdown_rx).await {
        Ok(_) | Err(SignalingError::ServerVoll) => {}
        Err(e) => {
            tracing::warn!(peer = %peer_addr, fehler = %e, "Verbindung konnte nicht gestartet werden");
        }
    }
}
