use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Response},
};
use futures_util::{future, SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppState;
use crate::websocket::hub::{ClientSink, HubHandle, SinkError};

/// WebSocket handler
pub async fn websocket_handler(
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match ws {
        // Any origin is accepted, the payload is only status text
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state.hub)),
        Err(rejection) => {
            warn!(error = %rejection, "websocket upgrade failed");
            rejection.into_response()
        }
    }
}

/// Hand the write half to the hub and watch the read half for the peer going away
async fn handle_socket(socket: WebSocket, hub: HubHandle) {
    let conn_id = Uuid::new_v4();
    info!(conn_id = %conn_id, "websocket connection established");

    let (sender, mut receiver) = socket.split();
    let sink: ClientSink = Box::pin(
        sender
            .sink_map_err(|e| Box::new(e) as SinkError)
            .with(|text: String| future::ready(Ok::<_, SinkError>(Message::Text(text)))),
    );

    if let Err(e) = hub.register(conn_id, sink).await {
        warn!(conn_id = %conn_id, error = %e, "failed to register connection");
        return;
    }

    // Inbound frames are only read to notice the disconnect
    loop {
        match receiver.next().await {
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                debug!(conn_id = %conn_id, error = %e, "read error");
                break;
            }
        }
    }

    if let Err(e) = hub.unregister(conn_id).await {
        warn!(conn_id = %conn_id, error = %e, "failed to unregister connection");
    }
    info!(conn_id = %conn_id, "websocket connection terminated");
}
