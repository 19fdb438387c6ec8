//! Integration tests for the gateway: the REST surface via the router and
//! the streaming dispatch via chat sessions wired to the registry.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use murmur_chats::{ClientEvent, ConnectionRegistry, ServerEvent};
use murmur_config::{ChatConfig, DatabaseConfig};
use murmur_gateway::websocket::{handle_client_event, ChatSession};
use murmur_gateway::GatewayState;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

async fn test_state() -> (Arc<GatewayState>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("gateway_test.db");
    let config = DatabaseConfig {
        url: format!("sqlite://{}", db_path.display()),
        max_connections: 8,
    };

    let pool = murmur_database::initialize_database(&config).await.unwrap();
    let registry = Arc::new(ConnectionRegistry::new());
    let state = GatewayState::new(pool, ChatConfig::default(), registry);

    (Arc::new(state), temp_dir)
}

fn get(uri: &str, user_id: Option<i64>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(id) = user_id {
        builder = builder.header("x-user-id", id.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, user_id: i64, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-user-id", user_id.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register a streaming session the way `run_session` does after a
/// successful directory fetch.
async fn open_session(
    state: &Arc<GatewayState>,
    user_id: i64,
) -> (ChatSession, mpsc::Receiver<ServerEvent>) {
    let mut session = ChatSession::new(user_id);
    let room_ids = state.directory.room_ids_for(user_id).await.unwrap();
    let (tx, rx) = mpsc::channel(64);
    state
        .registry
        .register(&session.connection_id, user_id, tx, &room_ids)
        .await;
    session.activate();
    (session, rx)
}

async fn next_event(rx: &mut mpsc::Receiver<ServerEvent>) -> ServerEvent {
    tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("channel closed")
}

#[tokio::test]
async fn health_needs_no_identity() {
    let (state, _temp_dir) = test_state().await;
    let app = murmur_gateway::create_router_with_arc(state);

    let response = app.oneshot(get("/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_reject_missing_identity() {
    let (state, _temp_dir) = test_state().await;
    let app = murmur_gateway::create_router_with_arc(state);

    let response = app
        .clone()
        .oneshot(get("/api/rooms", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(get("/api/rooms/1/messages", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rest_join_is_idempotent_and_validates_the_pair() {
    let (state, _temp_dir) = test_state().await;
    let app = murmur_gateway::create_router_with_arc(state);

    let first = app
        .clone()
        .oneshot(post_json(
            "/api/rooms/private",
            1,
            serde_json::json!({"other_user_id": 2}),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = json_body(first).await;

    // The same pair from the other side resolves to the same room.
    let second = app
        .clone()
        .oneshot(post_json(
            "/api/rooms/private",
            2,
            serde_json::json!({"other_user_id": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second = json_body(second).await;
    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["kind"], "private");

    let self_pair = app
        .oneshot(post_json(
            "/api/rooms/private",
            1,
            serde_json::json!({"other_user_id": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(self_pair.status(), StatusCode::BAD_REQUEST);
    let body = json_body(self_pair).await;
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn rest_send_and_history_round_trip() {
    let (state, _temp_dir) = test_state().await;
    let room = state.join_private(1, 2).await.unwrap();
    let app = murmur_gateway::create_router_with_arc(state);

    let send = app
        .clone()
        .oneshot(post_json(
            &format!("/api/rooms/{}/messages", room.id),
            1,
            serde_json::json!({"content": "hello"}),
        ))
        .await
        .unwrap();
    assert_eq!(send.status(), StatusCode::OK);
    let sent = json_body(send).await;
    assert_eq!(sent["content"], "hello");
    assert_eq!(sent["sender_id"], 1);

    let history = app
        .clone()
        .oneshot(get(&format!("/api/rooms/{}/messages", room.id), Some(2)))
        .await
        .unwrap();
    assert_eq!(history.status(), StatusCode::OK);
    let messages = json_body(history).await;
    assert_eq!(messages.as_array().unwrap().len(), 1);
    assert_eq!(messages[0]["content"], "hello");

    let mark = app
        .oneshot(post_json(
            &format!("/api/rooms/{}/read", room.id),
            2,
            serde_json::json!({"message_id": sent["id"]}),
        ))
        .await
        .unwrap();
    assert_eq!(mark.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn rest_denies_non_members_without_side_effects() {
    let (state, _temp_dir) = test_state().await;
    let room = state.join_private(1, 2).await.unwrap();
    let app = murmur_gateway::create_router_with_arc(state.clone());

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/rooms/{}/messages", room.id),
            3,
            serde_json::json!({"content": "sneaky"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["error"], "forbidden");

    // Nothing was appended.
    let history = state.fetch_history(1, room.id, None, None).await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn rest_rejects_invalid_content() {
    let (state, _temp_dir) = test_state().await;
    let room = state.join_private(1, 2).await.unwrap();
    let app = murmur_gateway::create_router_with_arc(state);

    let empty = app
        .clone()
        .oneshot(post_json(
            &format!("/api/rooms/{}/messages", room.id),
            1,
            serde_json::json!({"content": ""}),
        ))
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let oversized = app
        .oneshot(post_json(
            &format!("/api/rooms/{}/messages", room.id),
            1,
            serde_json::json!({"content": "x".repeat(501)}),
        ))
        .await
        .unwrap();
    assert_eq!(oversized.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn concurrent_join_private_converges_and_subscribes_both() {
    let (state, _temp_dir) = test_state().await;
    let (session_a, mut rx_a) = open_session(&state, 1).await;
    let (session_b, mut rx_b) = open_session(&state, 2).await;
    let subs_a = state
        .registry
        .subscriptions_of(&session_a.connection_id)
        .await;
    let subs_b = state
        .registry
        .subscriptions_of(&session_b.connection_id)
        .await;
    assert_eq!(subs_a.unwrap().len(), 0);
    assert_eq!(subs_b.unwrap().len(), 0);

    let (out_a, mut in_a) = mpsc::channel(8);
    let (out_b, mut in_b) = mpsc::channel(8);
    tokio::join!(
        handle_client_event(
            ClientEvent::JoinPrivate { user_id: 2 },
            &state,
            &session_a,
            &out_a
        ),
        handle_client_event(
            ClientEvent::JoinPrivate { user_id: 1 },
            &state,
            &session_b,
            &out_b
        ),
    );

    let ServerEvent::RoomJoined { room: room_a } = next_event(&mut in_a).await else {
        panic!("expected room_joined for A");
    };
    let ServerEvent::RoomJoined { room: room_b } = next_event(&mut in_b).await else {
        panic!("expected room_joined for B");
    };
    assert_eq!(room_a.id, room_b.id);
    assert_eq!(state.registry.subscriber_count(room_a.id).await, 2);

    // A send now reaches both subscribed connections with the persisted
    // payload, and history shows it as the newest entry.
    handle_client_event(
        ClientEvent::Send {
            room_id: room_a.id,
            content: "hello".to_string(),
        },
        &state,
        &session_a,
        &out_a,
    )
    .await;

    for rx in [&mut rx_a, &mut rx_b] {
        let ServerEvent::Message { message } = next_event(rx).await else {
            panic!("expected broadcast message");
        };
        assert_eq!(message.content, "hello");
        assert_eq!(message.sender_id, 1);
        assert_eq!(message.room_id, room_a.id);
    }

    handle_client_event(
        ClientEvent::History {
            room_id: room_a.id,
            before: None,
            limit: Some(10),
        },
        &state,
        &session_a,
        &out_a,
    )
    .await;
    let ServerEvent::History { messages, .. } = next_event(&mut in_a).await else {
        panic!("expected history");
    };
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "hello");
}

#[tokio::test]
async fn streaming_send_by_non_member_is_forbidden_and_appends_nothing() {
    let (state, _temp_dir) = test_state().await;
    let room = state.join_private(1, 2).await.unwrap();
    let (outsider, _rx) = open_session(&state, 3).await;

    let (out, mut events) = mpsc::channel(8);
    handle_client_event(
        ClientEvent::Send {
            room_id: room.id,
            content: "x".to_string(),
        },
        &state,
        &outsider,
        &out,
    )
    .await;

    let ServerEvent::Error { code, .. } = next_event(&mut events).await else {
        panic!("expected error event");
    };
    assert_eq!(code, "forbidden");

    let history = state.fetch_history(1, room.id, None, None).await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn streaming_send_validates_content() {
    let (state, _temp_dir) = test_state().await;
    let room = state.join_private(1, 2).await.unwrap();
    let (session, _rx) = open_session(&state, 1).await;
    let (out, mut events) = mpsc::channel(8);

    for content in ["".to_string(), "x".repeat(501)] {
        handle_client_event(
            ClientEvent::Send {
                room_id: room.id,
                content,
            },
            &state,
            &session,
            &out,
        )
        .await;

        let ServerEvent::Error { code, .. } = next_event(&mut events).await else {
            panic!("expected error event");
        };
        assert_eq!(code, "validation");
    }
}

#[tokio::test]
async fn mark_read_replies_and_stays_monotonic() {
    let (state, _temp_dir) = test_state().await;
    let room = state.join_private(1, 2).await.unwrap();
    let first = state.send_message(1, room.id, "one").await.unwrap();
    let second = state.send_message(1, room.id, "two").await.unwrap();

    let (session, _rx) = open_session(&state, 2).await;
    let (out, mut events) = mpsc::channel(8);

    handle_client_event(
        ClientEvent::MarkRead {
            room_id: room.id,
            message_id: second.id,
        },
        &state,
        &session,
        &out,
    )
    .await;
    assert!(matches!(
        next_event(&mut events).await,
        ServerEvent::MarkedRead { .. }
    ));

    // A stale id is accepted but does not move the watermark back.
    handle_client_event(
        ClientEvent::MarkRead {
            room_id: room.id,
            message_id: first.id,
        },
        &state,
        &session,
        &out,
    )
    .await;
    assert!(matches!(
        next_event(&mut events).await,
        ServerEvent::MarkedRead { .. }
    ));

    let mark = state.store.watermark(room.id, 2).await.unwrap().unwrap();
    assert_eq!(mark.last_read_message_id, second.id);
}
