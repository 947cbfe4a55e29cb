//! Wire schema shared by feed-service and its clients
//!
//! Everything that crosses the network lives here: the canonical `Post`, the
//! live `FeedEvent` pushed over the WebSocket, and the HTTP request/response
//! bodies in [`api`]. Both sides (de)serialize through these types so the
//! server and the reconciliation engine can never disagree on a field name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod api;

/// Maximum post length, counted in Unicode scalar values
pub const MAX_POST_CHARS: usize = 500;

/// Author reference captured when the post was created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: Uuid,
    /// Display name snapshot; later profile edits do not rewrite old posts
    pub name: String,
}

/// A persisted post. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author: AuthorRef,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Feed ordering: newest first, identifier descending on timestamp ties.
    ///
    /// Returns `Ordering::Less` when `self` sorts before `other` in a feed.
    pub fn feed_order(&self, other: &Post) -> std::cmp::Ordering {
        other
            .created_at
            .cmp(&self.created_at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Events pushed from the server to every live connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeedEvent {
    #[serde(rename = "new_post")]
    NewPost(Post),
}

impl FeedEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
