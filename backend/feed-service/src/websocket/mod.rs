use std::collections::HashMap;
use std::sync::Arc;

use event_schema::{FeedEvent, Post};
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

use crate::metrics;

pub mod session;

/// Unique identifier for a live connection
///
/// Each WebSocket connection gets one when it subscribes, so cleanup removes
/// exactly that connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Fan-out of newly created posts to every live connection
///
/// Connections are not bound to identities; every subscriber receives every
/// post, the author's own connection included. There is no replay buffer, so
/// a connection only sees posts published after it subscribed.
#[derive(Default, Clone)]
pub struct PostBroadcastDispatcher {
    // subscriber -> outbound channel of serialized `FeedEvent`s
    inner: Arc<RwLock<HashMap<SubscriberId, UnboundedSender<String>>>>,
}

impl PostBroadcastDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection
    ///
    /// Returns the id to unsubscribe with and the receiving end of the
    /// connection's outbound channel.
    pub async fn subscribe(&self) -> (SubscriberId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let subscriber_id = SubscriberId::new();

        let mut guard = self.inner.write().await;
        guard.insert(subscriber_id, tx);
        metrics::ACTIVE_CONNECTIONS.set(guard.len() as i64);

        tracing::debug!(
            subscriber = %subscriber_id,
            total = guard.len(),
            "connection subscribed"
        );

        (subscriber_id, rx)
    }

    /// Deregister a connection. Safe to call more than once.
    ///
    /// Must be called when a connection closes.
    pub async fn unsubscribe(&self, subscriber_id: SubscriberId) {
        let mut guard = self.inner.write().await;
        if guard.remove(&subscriber_id).is_some() {
            metrics::ACTIVE_CONNECTIONS.set(guard.len() as i64);
            tracing::debug!(
                subscriber = %subscriber_id,
                remaining = guard.len(),
                "connection unsubscribed"
            );
        }
    }

    /// Deliver a persisted post to every connection registered right now.
    ///
    /// Connections whose channel has closed are logged, skipped and pruned;
    /// the failure is not reported to the caller. Returns the number of
    /// connections the payload was handed to.
    pub async fn publish(&self, post: &Post) -> usize {
        let payload = match FeedEvent::NewPost(post.clone()).to_json() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(post_id = %post.id, error = %e, "failed to encode broadcast");
                return 0;
            }
        };

        let mut guard = self.inner.write().await;
        let before = guard.len();

        guard.retain(|subscriber_id, sender| match sender.send(payload.clone()) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    subscriber = %subscriber_id,
                    post_id = %post.id,
                    "connection closed mid-broadcast; pruning"
                );
                false
            }
        });

        let delivered = guard.len();
        let pruned = before - delivered;
        metrics::BROADCAST_DELIVERIES_TOTAL.inc_by(delivered as u64);
        if pruned > 0 {
            metrics::BROADCAST_FAILURES_TOTAL.inc_by(pruned as u64);
            metrics::ACTIVE_CONNECTIONS.set(delivered as i64);
        }

        tracing::debug!(post_id = %post.id, delivered, pruned, "post broadcast");
        delivered
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.len()
    }
}
