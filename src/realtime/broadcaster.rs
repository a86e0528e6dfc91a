use std::collections::{BTreeMap, BTreeSet};

use axum::extract::ws::Message;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::models::trip::Trip;

/// Event name pushed to every client when a trip is stored.
pub const TRIP_CREATED: &str = "tripCreated";

pub type ConnectionId = u64;

/// Handle for pushing frames to one client. The socket task drains the
/// receiving half; an unbounded channel keeps `send` non-blocking.
pub type ClientSender = mpsc::UnboundedSender<Message>;

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    event: &'a str,
    data: &'a T,
}

#[derive(Default)]
struct Connections {
    next_id: ConnectionId,
    clients: BTreeMap<ConnectionId, ClientSender>,
    rooms: BTreeMap<String, BTreeSet<ConnectionId>>,
}

/// Subscriber registry with per-trip rooms.
///
/// Delivery is fire-and-forget: a send to a torn-down connection is dropped
/// silently and never surfaces to the publisher. `BTreeMap` keeps delivery
/// order deterministic. Rooms only ever reference live connections;
/// `disconnect` sweeps the membership of the departing client.
pub struct Broadcaster {
    inner: RwLock<Connections>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Connections::default()),
        }
    }

    /// Register a connected client and hand back its id.
    pub async fn connect(&self, sender: ClientSender) -> ConnectionId {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.clients.insert(id, sender);
        debug!(conn_id = id, clients = inner.clients.len(), "client registered");
        id
    }

    /// Deregister a client and drop it from every room it joined.
    pub async fn disconnect(&self, id: ConnectionId) {
        let mut inner = self.inner.write().await;
        inner.clients.remove(&id);
        inner.rooms.retain(|_, members| {
            members.remove(&id);
            !members.is_empty()
        });
        debug!(conn_id = id, clients = inner.clients.len(), "client deregistered");
    }

    /// Add a client to a trip's room. Idempotent; joining twice has no
    /// additional effect. Unknown connection ids are ignored.
    pub async fn join_room(&self, id: ConnectionId, trip_id: &str) {
        let mut inner = self.inner.write().await;
        if !inner.clients.contains_key(&id) {
            return;
        }
        inner.rooms.entry(trip_id.to_string()).or_default().insert(id);
        debug!(conn_id = id, trip_id, "joined trip room");
    }

    /// Push a `tripCreated` event to every connected client, regardless of
    /// room membership.
    pub async fn broadcast_trip_created(&self, trip: &Trip) {
        self.broadcast(TRIP_CREATED, trip).await;
    }

    /// Push an event to every connected client.
    pub async fn broadcast<T: Serialize>(&self, event: &str, payload: &T) {
        let Some(message) = encode(event, payload) else {
            return;
        };
        let inner = self.inner.read().await;
        for sender in inner.clients.values() {
            // A closed receiver means the socket task is gone; the
            // disconnect sweep will catch up.
            let _ = sender.send(message.clone());
        }
    }

    /// Push an event only to the clients currently in a trip's room.
    pub async fn emit_to_room<T: Serialize>(&self, trip_id: &str, event: &str, payload: &T) {
        let Some(message) = encode(event, payload) else {
            return;
        };
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(trip_id) else {
            return;
        };
        for id in members {
            if let Some(sender) = inner.clients.get(id) {
                let _ = sender.send(message.clone());
            }
        }
    }

    pub async fn client_count(&self) -> usize {
        self.inner.read().await.clients.len()
    }

    pub async fn room_size(&self, trip_id: &str) -> usize {
        self.inner
            .read()
            .await
            .rooms
            .get(trip_id)
            .map(BTreeSet::len)
            .unwrap_or(0)
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

fn encode<T: Serialize>(event: &str, payload: &T) -> Option<Message> {
    match serde_json::to_string(&Envelope { event, data: payload }) {
        Ok(text) => Some(Message::Text(text)),
        Err(err) => {
            warn!(event, %err, "dropping unserializable event");
            None
        }
    }
}
