//! Fan-out of snapshots to live subscriber connections.
//!
//! The broadcaster holds a registry of open streaming connections, pushes
//! each snapshot to all of them and evicts any connection whose channel is
//! gone. A single keep-alive task runs while at least one connection is
//! registered and emits empty comment frames to defeat idle-connection
//! timeouts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use crate::snapshot::Snapshot;

/// Interval between keep-alive comment frames.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// One frame on a subscriber channel.
#[derive(Debug, Clone)]
pub enum Frame {
    /// A serialized snapshot; the payload is shared across all connections.
    Data(Arc<String>),
    /// Protocol-level comment carrying no payload.
    KeepAlive,
}

/// Registry of open subscriber connections with snapshot fan-out.
pub struct Broadcaster {
    connections: DashMap<u64, UnboundedSender<Frame>>,
    next_id: AtomicU64,
    keepalive: Mutex<Option<JoinHandle<()>>>,
}

impl Broadcaster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
            keepalive: Mutex::new(None),
        })
    }

    /// Registers a new subscriber connection.
    ///
    /// The first registration starts the keep-alive timer. The returned
    /// subscription unregisters itself when dropped, which stops the timer
    /// again once the registry is empty.
    pub fn register(self: &Arc<Self>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.insert(id, tx);
        self.ensure_keepalive();

        debug!(id, total = self.connections.len(), "subscriber registered");

        Subscription {
            id,
            rx,
            hub: Arc::downgrade(self),
        }
    }

    /// Serializes the snapshot once and delivers the identical payload to
    /// every registered connection. Connections whose channel is closed are
    /// removed; delivery to the rest continues. Returns the number of
    /// connections that received the frame.
    pub fn broadcast(&self, snapshot: &Snapshot) -> usize {
        let payload = match serde_json::to_string(snapshot) {
            Ok(json) => Arc::new(json),
            Err(e) => {
                error!("failed to serialize snapshot: {}", e);
                return 0;
            }
        };
        self.send_to_all(Frame::Data(payload))
    }

    /// Number of currently registered connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Delivers one frame to every connection registered at call start.
    ///
    /// Membership is snapshotted before iterating so removal is never
    /// interleaved with iteration; failed sends are collected and evicted
    /// after the loop.
    fn send_to_all(&self, frame: Frame) -> usize {
        let targets: Vec<(u64, UnboundedSender<Frame>)> = self
            .connections
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut dropped = Vec::new();
        let mut delivered = 0usize;

        for (id, tx) in targets {
            if tx.send(frame.clone()).is_ok() {
                delivered += 1;
            } else {
                dropped.push(id);
            }
        }

        for id in dropped {
            debug!(id, "evicting dead subscriber connection");
            self.remove(id);
        }

        delivered
    }

    /// Removes a connection; stops the keep-alive timer when the registry
    /// becomes empty.
    fn remove(&self, id: u64) {
        self.connections.remove(&id);
        if self.connections.is_empty() {
            if let Ok(mut guard) = self.keepalive.lock() {
                if let Some(handle) = guard.take() {
                    trace!("last subscriber gone, stopping keep-alive timer");
                    handle.abort();
                }
            }
        }
    }

    /// Starts the keep-alive task if it is not already running.
    fn ensure_keepalive(self: &Arc<Self>) {
        let mut guard = match self.keepalive.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.is_some() {
            return;
        }

        // Weak reference so the timer never keeps a dropped broadcaster
        // alive; the task also stops via abort() on last unregister.
        let hub = Arc::downgrade(self);
        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(KEEPALIVE_INTERVAL);
            // interval fires immediately once; the first keep-alive should
            // come one full period after registration.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(hub) = hub.upgrade() else {
                    break;
                };
                let delivered = hub.send_to_all(Frame::KeepAlive);
                trace!(delivered, "keep-alive tick");
            }
        }));
    }
}

/// Receiving half of one subscriber connection.
///
/// Owned exclusively by the transport serving that subscriber; dropping it
/// (connection closed) unregisters the connection.
pub struct Subscription {
    id: u64,
    rx: UnboundedReceiver<Frame>,
    hub: Weak<Broadcaster>,
}

impl Subscription {
    /// Waits for the next frame. Returns `None` if the broadcaster is gone.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
            debug!(id = self.id, "subscriber connection closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{MetricResult, MetricStatus};
    use crate::snapshot::SystemStatus;

    fn test_snapshot() -> Snapshot {
        fn missing<T>() -> MetricResult<T> {
            MetricResult {
                status: MetricStatus::Unavailable,
                data: None,
                error: None,
            }
        }
        Snapshot {
            timestamp: 1,
            status: SystemStatus::Critical,
            cpu: missing(),
            memory: missing(),
            disk: missing(),
            processes: missing(),
            network: missing(),
            system_info: missing(),
            history: Vec::new(),
        }
    }

    fn payload_of(frame: Frame) -> Arc<String> {
        match frame {
            Frame::Data(p) => p,
            Frame::KeepAlive => panic!("expected data frame"),
        }
    }

    #[tokio::test]
    async fn test_broadcast_delivers_identical_payload_to_all() {
        let hub = Broadcaster::new();
        let mut subs = [hub.register(), hub.register(), hub.register()];
        assert_eq!(hub.connection_count(), 3);

        let delivered = hub.broadcast(&test_snapshot());
        assert_eq!(delivered, 3);

        let mut payloads = Vec::new();
        for sub in &mut subs {
            payloads.push(payload_of(sub.recv().await.unwrap()));
        }
        assert_eq!(payloads[0], payloads[1]);
        assert_eq!(payloads[1], payloads[2]);
    }

    #[tokio::test]
    async fn test_dead_connection_is_evicted_and_rest_keep_receiving() {
        let hub = Broadcaster::new();
        let mut alive = hub.register();
        let dead = hub.register();
        assert_eq!(hub.connection_count(), 2);

        drop(dead);
        assert_eq!(hub.connection_count(), 1, "drop guard unregisters");

        // Re-register and kill only the receiver half to simulate a write
        // failure during broadcast rather than a clean close.
        let mut zombie = hub.register();
        zombie.rx.close();
        assert_eq!(hub.connection_count(), 2);

        let delivered = hub.broadcast(&test_snapshot());
        assert_eq!(delivered, 1);
        assert_eq!(hub.connection_count(), 1);
        assert!(matches!(alive.recv().await, Some(Frame::Data(_))));

        // Subsequent broadcasts still reach the survivor
        let delivered = hub.broadcast(&test_snapshot());
        assert_eq!(delivered, 1);
        assert!(matches!(alive.recv().await, Some(Frame::Data(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_runs_only_while_subscribed() {
        let hub = Broadcaster::new();
        let mut sub = hub.register();

        tokio::time::advance(KEEPALIVE_INTERVAL + Duration::from_millis(10)).await;
        // Give the spawned keep-alive task a chance to run its tick.
        tokio::task::yield_now().await;

        let frame = sub.recv().await.unwrap();
        assert!(matches!(frame, Frame::KeepAlive));

        drop(sub);
        assert_eq!(hub.connection_count(), 0);
        assert!(
            hub.keepalive.lock().unwrap().is_none(),
            "keep-alive timer stops with the last subscriber"
        );
    }
}
