//! In-memory session registry: identity → live connection handle.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::connection::ClientConnection;
use crate::metrics::{SESSIONS_EVICTED_TOTAL, WS_SESSIONS_ACTIVE};

/// Maps each device identity to its live connection.
///
/// Last-writer-wins: registering an identity that is already present
/// overwrites the mapping, and the superseded handle is not closed.
/// Mutation happens only from connection lifecycle code and the eviction
/// task; lookups after an await must treat a missing entry as the normal
/// "session gone" case.
pub struct SessionRegistry {
    /// Live sessions indexed by device identity.
    sessions: RwLock<HashMap<String, Arc<ClientConnection>>>,
    /// Atomic count (avoids read-locking for count queries).
    active_count: AtomicUsize,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            active_count: AtomicUsize::new(0),
        }
    }

    /// Insert or overwrite the mapping for this connection's identity.
    pub async fn register(&self, connection: Arc<ClientConnection>) {
        let device_id = connection.device_id.as_str().to_string();
        let mut sessions = self.sessions.write().await;
        if sessions.insert(device_id.clone(), connection).is_none() {
            let _ = self.active_count.fetch_add(1, Ordering::Relaxed);
        } else {
            debug!(device_id, "superseded existing session for identity");
        }
        gauge!(WS_SESSIONS_ACTIVE).set(self.active_count.load(Ordering::Relaxed) as f64);
    }

    /// The live connection for an identity, if any.
    pub async fn lookup(&self, device_id: &str) -> Option<Arc<ClientConnection>> {
        let sessions = self.sessions.read().await;
        sessions.get(device_id).cloned()
    }

    /// Remove the mapping for an identity. Idempotent.
    pub async fn remove(&self, device_id: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(device_id).is_some() {
            let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
        }
        gauge!(WS_SESSIONS_ACTIVE).set(self.active_count.load(Ordering::Relaxed) as f64);
    }

    /// Remove the mapping only if it still points at this exact connection.
    ///
    /// Disconnect cleanup goes through here: when a reused identity has
    /// already overwritten the entry, the stale socket's close must not
    /// tear down the newer session.
    pub async fn deregister(&self, connection: &Arc<ClientConnection>) {
        let mut sessions = self.sessions.write().await;
        let device_id = connection.device_id.as_str();
        if sessions
            .get(device_id)
            .is_some_and(|current| Arc::ptr_eq(current, connection))
        {
            let _ = sessions.remove(device_id);
            let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
        }
        gauge!(WS_SESSIONS_ACTIVE).set(self.active_count.load(Ordering::Relaxed) as f64);
    }

    /// Visit every session whose connection is still open.
    ///
    /// Iteration order is unspecified; connections that are no longer open
    /// are skipped, never an error.
    pub async fn for_each(&self, mut visitor: impl FnMut(&Arc<ClientConnection>)) {
        let sessions = self.sessions.read().await;
        for connection in sessions.values() {
            if connection.is_open() {
                visitor(connection);
            }
        }
    }

    /// Evict sessions idle longer than `max_age`. Returns how many were
    /// removed. The registry carries no timer — the caller owns scheduling.
    pub async fn evict_idle(&self, max_age: Duration) -> usize {
        let stale: Vec<String> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, conn)| conn.idle_for() > max_age)
                .map(|(id, _)| id.clone())
                .collect()
        };
        if stale.is_empty() {
            return 0;
        }

        let mut evicted = 0;
        let mut sessions = self.sessions.write().await;
        for device_id in &stale {
            // Re-check under the write lock: activity may have arrived.
            if sessions
                .get(device_id)
                .is_some_and(|conn| conn.idle_for() > max_age)
            {
                let _ = sessions.remove(device_id);
                let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
                evicted += 1;
            }
        }
        drop(sessions);

        if evicted > 0 {
            counter!(SESSIONS_EVICTED_TOTAL).increment(evicted as u64);
            gauge!(WS_SESSIONS_ACTIVE).set(self.active_count.load(Ordering::Relaxed) as f64);
            info!(evicted, "evicted idle sessions");
        }
        evicted
    }

    /// Number of registered sessions.
    pub fn count(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::ids::DeviceId;
    use tokio::sync::mpsc;

    fn make_connection(device_id: &str) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(32);
        (
            Arc::new(ClientConnection::new(DeviceId::new(device_id), tx)),
            rx,
        )
    }

    #[tokio::test]
    async fn register_and_lookup() {
        let registry = SessionRegistry::new();
        let (conn, _rx) = make_connection("dev_a");
        registry.register(conn.clone()).await;

        let found = registry.lookup("dev_a").await.unwrap();
        assert!(Arc::ptr_eq(&found, &conn));
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn lookup_missing_is_none() {
        let registry = SessionRegistry::new();
        assert!(registry.lookup("dev_absent").await.is_none());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let registry = SessionRegistry::new();
        let (conn, _rx) = make_connection("dev_a");
        registry.register(conn).await;

        registry.remove("dev_a").await;
        registry.remove("dev_a").await;
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn register_same_identity_overwrites() {
        let registry = SessionRegistry::new();
        let (first, _rx1) = make_connection("dev_a");
        let (second, _rx2) = make_connection("dev_a");
        registry.register(first).await;
        registry.register(second.clone()).await;

        assert_eq!(registry.count(), 1);
        let found = registry.lookup("dev_a").await.unwrap();
        assert!(Arc::ptr_eq(&found, &second));
    }

    #[tokio::test]
    async fn deregister_skips_superseded_entry() {
        let registry = SessionRegistry::new();
        let (stale, _rx1) = make_connection("dev_a");
        let (current, _rx2) = make_connection("dev_a");
        registry.register(stale.clone()).await;
        registry.register(current.clone()).await;

        // Stale socket closes late; the newer mapping must survive.
        registry.deregister(&stale).await;
        let found = registry.lookup("dev_a").await.unwrap();
        assert!(Arc::ptr_eq(&found, &current));
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn deregister_removes_own_entry() {
        let registry = SessionRegistry::new();
        let (conn, _rx) = make_connection("dev_a");
        registry.register(conn.clone()).await;

        registry.deregister(&conn).await;
        assert!(registry.lookup("dev_a").await.is_none());
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn for_each_skips_closed_connections() {
        let registry = SessionRegistry::new();
        let (open, _rx_open) = make_connection("dev_open");
        let (closed, rx_closed) = make_connection("dev_closed");
        registry.register(open).await;
        registry.register(closed).await;
        drop(rx_closed);

        let mut visited = Vec::new();
        registry
            .for_each(|conn| visited.push(conn.device_id.as_str().to_string()))
            .await;
        assert_eq!(visited, ["dev_open"]);
    }

    #[tokio::test]
    async fn evict_idle_removes_only_stale_sessions() {
        let registry = SessionRegistry::new();
        let (stale, _rx1) = make_connection("dev_stale");
        let (fresh, _rx2) = make_connection("dev_fresh");
        registry.register(stale).await;
        registry.register(fresh.clone()).await;

        std::thread::sleep(Duration::from_millis(20));
        fresh.touch();

        let evicted = registry.evict_idle(Duration::from_millis(10)).await;
        assert_eq!(evicted, 1);
        assert!(registry.lookup("dev_stale").await.is_none());
        assert!(registry.lookup("dev_fresh").await.is_some());
    }

    #[tokio::test]
    async fn evict_idle_with_no_stale_sessions_is_zero() {
        let registry = SessionRegistry::new();
        let (conn, _rx) = make_connection("dev_a");
        registry.register(conn).await;

        let evicted = registry.evict_idle(Duration::from_secs(3600)).await;
        assert_eq!(evicted, 0);
        assert_eq!(registry.count(), 1);
    }
}
