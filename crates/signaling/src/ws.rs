//! WebSocket-Transport – Axum-Upgrade auf `GET /ws`
//!
//! Text-Frames tragen dieselben JSON-Ereignisse wie der TCP-Transport.
//! Binaer-Frames werden ignoriert. Keepalive-Pings des Servers gehen als
//! WebSocket-Ping-Frames hinaus, Pongs zaehlen als Lebenszeichen.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{future, SinkExt, StreamExt};
use std::sync::Arc;
use tandem_protocol::{ClientEvent, ServerEvent};

use crate::connection::{ClientConnection, Eingang};
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;

/// Geteilter Zustand des WebSocket-Routers
#[derive(Clone)]
pub struct WsState {
    pub signaling: Arc<SignalingState>,
    pub shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

/// Axum-Router fuer den `/ws`-Endpunkt
pub fn ws_router(
    signaling: Arc<SignalingState>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(WsState {
            signaling,
            shutdown_rx,
        })
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| socket_bedienen(socket, state))
}

async fn socket_bedienen(socket: WebSocket, state: WsState) {
    let (senke, strom) = socket.split();
    let ausgang = senke.with(|ereignis: ServerEvent| future::ready(nachricht_kodieren(ereignis)));
    let eingang = strom.filter_map(|nachricht| future::ready(eingang_dekodieren(nachricht)));

    let verbindung = ClientConnection::neu(Arc::clone(&state.signaling), "websocket");
    match verbindung
        .verarbeiten(eingang, ausgang, state.shutdown_rx.clone())
        .await
    {
        Ok(_) | Err(SignalingError::ServerVoll) => {}
        Err(e) => {
            tracing::warn!(fehler = %e, "WebSocket-Verbindung konnte nicht gestartet werden");
        }
    }
}

/// Uebersetzt ein Server-Ereignis in einen WebSocket-Frame
fn nachricht_kodieren(ereignis: ServerEvent) -> Result<Message, axum::Error> {
    match ereignis {
        ServerEvent::Ping(ping) => Ok(Message::Ping(ping.timestamp_ms.to_be_bytes().to_vec())),
        andere => andere.to_json().map(Message::Text).map_err(axum::Error::new),
    }
}

/// Uebersetzt einen WebSocket-Frame in ein Eingangs-Element
///
/// `None` bedeutet: Frame ignorieren.
fn eingang_dekodieren(nachricht: Result<Message, axum::Error>) -> Option<SignalingResult<Eingang>> {
    match nachricht {
        Ok(Message::Text(text)) => Some(Ok(match ClientEvent::from_json(&text) {
            Ok(ereignis) => Eingang::Ereignis(ereignis),
            Err(e) => Eingang::Ungueltig(e.to_string()),
        })),
        Ok(Message::Binary(_)) => {
            tracing::debug!("Binaer-Frame ignoriert");
            None
        }
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => Some(Ok(Eingang::Lebenszeichen)),
        Ok(Message::Close(_)) => Some(Err(SignalingError::VerbindungGetrennt)),
        Err(e) => Some(Err(SignalingError::protokoll(e.to_string()))),
    }
}
