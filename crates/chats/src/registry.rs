//! In-memory connection registry for room-scoped fan-out.
//!
//! Maps live connections to their outbound channels and subscribed rooms.
//! Durability is the message store's job; delivery here is best-effort,
//! at-most-once per connection per publish.

use crate::types::ServerEvent;
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

struct ConnectionEntry {
    user_id: i64,
    sender: mpsc::Sender<ServerEvent>,
    rooms: HashSet<i64>,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<String, ConnectionEntry>,
    rooms: HashMap<i64, HashSet<String>>,
}

/// Registry of live connections and their room subscriptions.
///
/// All maps sit behind one lock, so a registration or removal is observed
/// atomically: no publish ever sees a connection half-subscribed.
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Register a connection and subscribe it to every listed room in one
    /// atomic step.
    pub async fn register(
        &self,
        connection_id: &str,
        user_id: i64,
        sender: mpsc::Sender<ServerEvent>,
        room_ids: &[i64],
    ) {
        let mut inner = self.inner.write().await;
        let RegistryInner { connections, rooms } = &mut *inner;

        for room_id in room_ids {
            rooms
                .entry(*room_id)
                .or_default()
                .insert(connection_id.to_string());
        }

        connections.insert(
            connection_id.to_string(),
            ConnectionEntry {
                user_id,
                sender,
                rooms: room_ids.iter().copied().collect(),
            },
        );

        info!(
            connection_id = connection_id,
            user_id = user_id,
            rooms = room_ids.len(),
            "registered connection"
        );
    }

    /// Remove a connection and all of its subscriptions. Idempotent.
    pub async fn unregister(&self, connection_id: &str) {
        let mut inner = self.inner.write().await;

        let Some(entry) = inner.connections.remove(connection_id) else {
            return;
        };

        for room_id in entry.rooms {
            if let Some(subscribers) = inner.rooms.get_mut(&room_id) {
                subscribers.remove(connection_id);
                if subscribers.is_empty() {
                    inner.rooms.remove(&room_id);
                }
            }
        }

        info!(
            connection_id = connection_id,
            user_id = entry.user_id,
            "unregistered connection"
        );
    }

    /// Subscribe an already-registered connection to one more room.
    ///
    /// Returns false when the connection is gone (it disconnected while the
    /// caller was provisioning); the caller treats that as connection loss,
    /// not an error.
    pub async fn subscribe(&self, connection_id: &str, room_id: i64) -> bool {
        let mut inner = self.inner.write().await;
        let RegistryInner { connections, rooms } = &mut *inner;

        let Some(entry) = connections.get_mut(connection_id) else {
            return false;
        };

        entry.rooms.insert(room_id);
        rooms
            .entry(room_id)
            .or_default()
            .insert(connection_id.to_string());

        debug!(
            connection_id = connection_id,
            room_id = room_id,
            "subscribed connection to room"
        );
        true
    }

    /// Deliver an event to every connection currently subscribed to a room.
    ///
    /// Senders are snapshotted under the read lock and delivery happens
    /// outside it, so subscriptions may change mid-publish without harm: a
    /// subscriber added after the snapshot misses this event only. Returns
    /// the number of connections the event was handed to.
    pub async fn publish(&self, room_id: i64, event: &ServerEvent) -> usize {
        let senders: Vec<mpsc::Sender<ServerEvent>> = {
            let inner = self.inner.read().await;
            match inner.rooms.get(&room_id) {
                Some(subscribers) => subscribers
                    .iter()
                    .filter_map(|id| inner.connections.get(id))
                    .map(|entry| entry.sender.clone())
                    .collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for sender in senders {
            // A full or closed outbound channel drops the event for that
            // connection; the log remains the source of truth.
            if sender.try_send(event.clone()).is_ok() {
                delivered += 1;
            }
        }

        debug!(room_id = room_id, delivered = delivered, "published event");
        delivered
    }

    /// Number of live connections
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Number of connections subscribed to a room
    pub async fn subscriber_count(&self, room_id: i64) -> usize {
        self.inner
            .read()
            .await
            .rooms
            .get(&room_id)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    /// Room ids a connection is subscribed to, if it is still registered
    pub async fn subscriptions_of(&self, connection_id: &str) -> Option<Vec<i64>> {
        self.inner
            .read()
            .await
            .connections
            .get(connection_id)
            .map(|entry| entry.rooms.iter().copied().collect())
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
