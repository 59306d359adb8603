//! WebSocket de actualizaciones de viajes
//!
//! Cada conexión recibe los mensajes del tópico `/topic/trip-updates`. Los
//! mensajes del cliente se ignoran salvo el cierre.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::realtime::{RealtimeHub, TRIP_UPDATES_TOPIC};
use crate::state::AppState;

pub fn create_realtime_router() -> Router<AppState> {
    Router::new().route("/trip-updates", get(trip_updates))
}

async fn trip_updates(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    info!("🔌 Conexión WebSocket solicitada");
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

async fn handle_socket(socket: WebSocket, hub: RealtimeHub) {
    let (mut sender, mut receiver) = socket.split();
    let mut updates = hub.subscribe(TRIP_UPDATES_TOPIC).await;

    let mut send_task = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(message) => {
                    if sender.send(Message::Text(message)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("⚠️ Cliente WebSocket lento, {} mensajes descartados", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if let Message::Close(_) = message {
                break;
            }
            debug!("📨 Mensaje de cliente ignorado");
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    info!("🔌 Conexión WebSocket cerrada");
}
