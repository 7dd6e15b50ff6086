use axum::extract::{
    State,
    ws::{self, WebSocket, WebSocketUpgrade},
};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::game::messages::{
    ClientToServerMessage, ServerToClientMessage, client_message_from_ws_text,
};
use crate::player::PlayerActorHandle;
use crate::scoring::GUEST_IDENTITY;
use crate::state::AppState;

pub async fn ws_handler(
    ws_upgrade: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    tracing::info!("WebSocket: connection attempt to /ws");
    ws_upgrade.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// An empty or whitespace nickname is ignored silently: the session runs as
/// the guest identity.
fn identity_from_nickname(nickname: Option<String>) -> String {
    nickname
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| GUEST_IDENTITY.to_string())
}

pub async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let client_id = Uuid::new_v4();
    let identity: String;

    // The first frame must be Hello: it binds the connection to an identity.
    match ws_receiver.next().await {
        Some(Ok(ws::Message::Text(text_msg))) => {
            match client_message_from_ws_text(&text_msg) {
                Ok(ClientToServerMessage::Hello { nickname }) => {
                    identity = identity_from_nickname(nickname);
                    tracing::info!(
                        client.id = %client_id,
                        user.identity = %identity,
                        "WebSocket client identified"
                    );
                }
                Ok(other_msg) => {
                    tracing::warn!(
                        client.id = %client_id,
                        event.kind = ?other_msg,
                        "Initial message was not Hello. Closing"
                    );
                    let error_response = ServerToClientMessage::SystemError {
                        message: "Invalid initial message type. Expected Hello.".to_string(),
                    };
                    if let Ok(ws_msg) = error_response.to_ws_text() {
                        let _ = ws_sender.send(ws_msg).await;
                    }
                    let _ = ws_sender.close().await;
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        client.id = %client_id,
                        error = %e,
                        "Failed to deserialize initial message. Closing"
                    );
                    let error_response = ServerToClientMessage::SystemError {
                        message: format!("Invalid initial connection message format: {}", e),
                    };
                    if let Ok(ws_msg) = error_response.to_ws_text() {
                        let _ = ws_sender.send(ws_msg).await;
                    }
                    let _ = ws_sender.close().await;
                    return;
                }
            }
        }
        Some(Ok(other_type_msg)) => {
            tracing::warn!(
                client.id = %client_id,
                event.kind = ?other_type_msg,
                "Client sent non-text initial message. Closing"
            );
            let error_response = ServerToClientMessage::SystemError {
                message: "Initial message must be a text JSON message (Hello).".to_string(),
            };
            if let Ok(ws_msg) = error_response.to_ws_text() {
                let _ = ws_sender.send(ws_msg).await;
            }
            let _ = ws_sender.close().await;
            return;
        }
        Some(Err(e)) => {
            tracing::warn!(
                client.id = %client_id,
                error = %e,
                "Error receiving initial message. Closing"
            );
            let _ = ws_sender.close().await;
            return;
        }
        None => {
            tracing::info!(
                client.id = %client_id,
                "Client disconnected before sending initial message"
            );
            return;
        }
    }

    let (actor_to_client_tx, mut actor_to_client_rx) = mpsc::channel::<ws::Message>(32);

    let player_handle = PlayerActorHandle::spawn(
        client_id,
        32,
        actor_to_client_tx,
        identity,
        app_state.store.clone(),
        app_state.bank.clone(),
        app_state.ledger.clone(),
        app_state.settings.game.clone(),
    );

    let mut send_task = tokio::spawn(async move {
        while let Some(message_to_send) = actor_to_client_rx.recv().await {
            if ws_sender.send(message_to_send).await.is_err() {
                tracing::info!(
                    client.id = %client_id,
                    "WS send error, client likely disconnected"
                );
                break;
            }
        }
        tracing::debug!(
            client.id = %client_id,
            "Send task from actor to WS client terminating"
        );
        let _ = ws_sender.close().await;
    });

    let player_handle_recv = player_handle.clone();
    let mut recv_task = tokio::spawn(async move {
        loop {
            match ws_receiver.next().await {
                Some(Ok(msg)) => match msg {
                    ws::Message::Text(text_msg) => {
                        if let Err(e) = player_handle_recv
                            .forward_client_event(text_msg.to_string())
                            .await
                        {
                            tracing::error!(
                                client.id = %client_id,
                                error = %e,
                                "Error sending event to player actor"
                            );
                            break;
                        }
                    }
                    ws::Message::Binary(_) => {
                        tracing::debug!(
                            client.id = %client_id,
                            "Received binary message (ignored)"
                        );
                    }
                    ws::Message::Ping(_) | ws::Message::Pong(_) => {
                        // Axum answers pings itself.
                    }
                    ws::Message::Close(_) => {
                        tracing::info!(
                            client.id = %client_id,
                            "WebSocket closed by client"
                        );
                        break;
                    }
                },
                Some(Err(e)) => {
                    tracing::warn!(
                        client.id = %client_id,
                        error = %e,
                        "WebSocket error (recv)"
                    );
                    break;
                }
                None => {
                    tracing::info!(
                        client.id = %client_id,
                        "WebSocket connection closed"
                    );
                    break;
                }
            }
        }
    });

    // Wait for either task to finish, then abort the other. Dropping the last
    // handle closes the player actor's inbox and stops it.
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        },
        _ = (&mut recv_task) => {
            send_task.abort();
        },
    }

    drop(player_handle);
    tracing::info!(
        client.id = %client_id,
        "WebSocket client fully disconnected"
    );
}
