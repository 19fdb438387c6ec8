//! Per-connection chat session: the Connecting -> Active -> Closed state
//! machine and the dispatch of client events to the chat core.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use murmur_chats::{ChatError, ClientEvent, ServerEvent};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::error::GatewayError;
use crate::state::GatewayState;

/// Lifecycle of a streaming connection. `Closed` is terminal; no operation
/// is dispatched once it is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closed,
}

/// One client's streaming session
pub struct ChatSession {
    pub connection_id: String,
    pub user_id: i64,
    state: SessionState,
}

impl ChatSession {
    pub fn new(user_id: i64) -> Self {
        Self {
            connection_id: cuid2::create_id(),
            user_id,
            state: SessionState::Connecting,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Transition Connecting -> Active once registration succeeded
    pub fn activate(&mut self) {
        debug_assert_eq!(self.state, SessionState::Connecting);
        self.state = SessionState::Active;
    }

    /// Transition to Closed from any state
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }
}

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Verified user id, forwarded by the authentication collaborator that
    /// fronts this endpoint
    pub user_id: Option<i64>,
}

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ConnectQuery>,
    State(state): State<Arc<GatewayState>>,
) -> Response {
    let Some(user_id) = query.user_id.filter(|id| *id > 0) else {
        return GatewayError::AuthenticationFailed("missing or invalid user identity".to_string())
            .into_response();
    };

    ws.on_upgrade(move |socket| run_session(socket, state, user_id))
}

/// Drive one connection from upgrade to close.
pub async fn run_session(socket: WebSocket, state: Arc<GatewayState>, user_id: i64) {
    let mut session = ChatSession::new(user_id);

    // Connecting: the subscription set comes from the durable directory.
    // A directory failure is fatal to the connection.
    let room_ids = match state.directory.room_ids_for(user_id).await {
        Ok(room_ids) => room_ids,
        Err(err) => {
            warn!(
                connection_id = %session.connection_id,
                user_id = user_id,
                error = %err,
                "closing connection: room directory lookup failed"
            );
            let mut socket = socket;
            if let Ok(text) = serde_json::to_string(&error_event(&err)) {
                let _ = socket.send(Message::Text(text)).await;
            }
            session.close();
            return;
        }
    };

    let (out_tx, mut out_rx) = mpsc::channel::<ServerEvent>(state.chat.fanout_buffer);
    state
        .registry
        .register(&session.connection_id, user_id, out_tx.clone(), &room_ids)
        .await;
    session.activate();

    info!(
        connection_id = %session.connection_id,
        user_id = user_id,
        rooms = room_ids.len(),
        "connection active"
    );

    let hello = ServerEvent::Hello {
        connection_id: session.connection_id.clone(),
        room_ids,
    };
    let _ = out_tx.send(hello).await;

    let (mut sink, mut stream) = socket.split();

    // Inbound frames from this client are handled in arrival order; they
    // interleave only with other connections' work.
    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => {
                            handle_client_event(event, &state, &session, &out_tx).await;
                        }
                        Err(err) => {
                            let event = ServerEvent::Error {
                                code: "validation".to_string(),
                                message: format!("malformed client event: {err}"),
                            };
                            let _ = out_tx.send(event).await;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
            outbound = out_rx.recv() => match outbound {
                Some(event) => {
                    let Ok(text) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    // Closed: cleanup runs exactly once. An append already accepted by the
    // store completes regardless; only the fan-out to this connection stops.
    state.registry.unregister(&session.connection_id).await;
    session.close();

    info!(
        connection_id = %session.connection_id,
        user_id = user_id,
        "connection closed"
    );
}

/// Dispatch one client event. Replies and errors go through the session's
/// outbound channel; broadcasts go through the registry.
pub async fn handle_client_event(
    event: ClientEvent,
    state: &GatewayState,
    session: &ChatSession,
    out: &mpsc::Sender<ServerEvent>,
) {
    let user_id = session.user_id;

    let reply = match event {
        ClientEvent::Ping => Ok(Some(ServerEvent::Pong)),

        ClientEvent::Send { room_id, content } => {
            // On success the sender hears about the message through the
            // room broadcast, like every other subscriber.
            state
                .send_message(user_id, room_id, &content)
                .await
                .map(|_message| None)
        }

        ClientEvent::JoinPrivate { user_id: other } => {
            match state.join_private(user_id, other).await {
                Ok(room) => {
                    let subscribed = state
                        .registry
                        .subscribe(&session.connection_id, room.id)
                        .await;
                    if !subscribed {
                        // The connection disappeared while provisioning;
                        // the room itself is durable either way.
                        warn!(
                            connection_id = %session.connection_id,
                            room_id = room.id,
                            "connection vanished before room subscription"
                        );
                    }
                    Ok(Some(ServerEvent::RoomJoined { room }))
                }
                Err(err) => Err(err),
            }
        }

        ClientEvent::MarkRead {
            room_id,
            message_id,
        } => state
            .mark_read(user_id, room_id, message_id)
            .await
            .map(|_| {
                Some(ServerEvent::MarkedRead {
                    room_id,
                    message_id,
                })
            }),

        ClientEvent::History {
            room_id,
            before,
            limit,
        } => state
            .fetch_history(user_id, room_id, before, limit)
            .await
            .map(|messages| Some(ServerEvent::History { room_id, messages })),

        ClientEvent::ListRooms => state
            .list_rooms(user_id)
            .await
            .map(|rooms| Some(ServerEvent::Rooms { rooms })),
    };

    match reply {
        Ok(Some(event)) => {
            let _ = out.send(event).await;
        }
        Ok(None) => {}
        Err(err) => {
            let _ = out.send(error_event(&err)).await;
        }
    }
}

/// Turn a core error into the wire error event, hiding internal detail.
fn error_event(err: &ChatError) -> ServerEvent {
    let message = match err {
        ChatError::Internal(detail) => {
            error!(detail = %detail, "internal error on streaming connection");
            "internal server error".to_string()
        }
        other => other.to_string(),
    };

    ServerEvent::Error {
        code: err.code().to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_walks_the_lifecycle() {
        let mut session = ChatSession::new(7);
        assert_eq!(session.state(), SessionState::Connecting);
        assert!(!session.is_active());

        session.activate();
        assert!(session.is_active());

        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.is_active());
    }

    #[test]
    fn sessions_get_distinct_connection_ids() {
        let a = ChatSession::new(1);
        let b = ChatSession::new(1);
        assert_ne!(a.connection_id, b.connection_id);
    }

    #[test]
    fn internal_errors_are_masked_on_the_wire() {
        let event = error_event(&ChatError::internal("pool exhausted at 10.0.0.3"));
        match event {
            ServerEvent::Error { code, message } => {
                assert_eq!(code, "internal");
                assert_eq!(message, "internal server error");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
