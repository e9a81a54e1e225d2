//! Per-user realtime connections.
//!
//! Each user holds at most one live connection. Registering again replaces
//! the previous one, whose receiver then sees its channel close. Delivery is
//! best-effort: a send to a closed channel drops that connection and moves
//! on.

use std::collections::HashMap;

use khoj_server_models::RealtimeEvent;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

struct Connection {
    id: Uuid,
    tx: mpsc::UnboundedSender<RealtimeEvent>,
}

/// Registry of connected users, shared through [`crate::AppState`].
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, Connection>>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a connection for `user_id`, replacing any existing one.
    pub async fn register(&self, user_id: &str) -> (Uuid, mpsc::UnboundedReceiver<RealtimeEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let previous = self
            .connections
            .write()
            .await
            .insert(user_id.to_string(), Connection { id, tx });

        match previous {
            Some(old) => log::info!(
                "User {user_id} reconnected: connection {} replaced by {id}",
                old.id
            ),
            None => log::info!("User {user_id} connected: {id}"),
        }

        (id, rx)
    }

    /// Removes `user_id`'s connection if it is still `connection_id`.
    ///
    /// Returns `false` when the user has since reconnected or was never
    /// registered.
    pub async fn unregister(&self, user_id: &str, connection_id: Uuid) -> bool {
        let mut connections = self.connections.write().await;
        if connections.get(user_id).is_some_and(|c| c.id == connection_id) {
            connections.remove(user_id);
            log::info!("User {user_id} disconnected: {connection_id}");
            true
        } else {
            false
        }
    }

    /// Sends `event` to one user. Returns whether it was handed off.
    ///
    /// This is the targeted-delivery path. Alerts carry no owner, so the
    /// handlers only broadcast today; per-user events go through here. A
    /// closed channel is pruned like in [`Self::broadcast`].
    pub async fn notify(&self, user_id: &str, event: &RealtimeEvent) -> bool {
        let failed = {
            let connections = self.connections.read().await;
            let Some(conn) = connections.get(user_id) else {
                log::debug!("No connection for user {user_id}, dropping {}", event.kind());
                return false;
            };
            if conn.tx.send(event.clone()).is_ok() {
                return true;
            }
            conn.id
        };

        self.prune(&[(user_id.to_string(), failed)]).await;
        false
    }

    /// Sends `event` to every connected user. Returns the number of
    /// connections it was handed to.
    pub async fn broadcast(&self, event: &RealtimeEvent) -> usize {
        let mut failed = Vec::new();
        let mut delivered = 0;

        {
            let connections = self.connections.read().await;
            log::debug!(
                "Broadcasting {} to {} connections",
                event.kind(),
                connections.len()
            );
            for (user_id, conn) in connections.iter() {
                if conn.tx.send(event.clone()).is_ok() {
                    delivered += 1;
                } else {
                    failed.push((user_id.clone(), conn.id));
                }
            }
        }

        if !failed.is_empty() {
            self.prune(&failed).await;
        }

        delivered
    }

    /// Number of users currently connected.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    async fn prune(&self, closed: &[(String, Uuid)]) {
        let mut connections = self.connections.write().await;
        for (user_id, id) in closed {
            if connections.get(user_id).is_some_and(|c| c.id == *id) {
                connections.remove(user_id);
                log::warn!("Dropped closed connection {id} for user {user_id}");
            }
        }
    }
}
