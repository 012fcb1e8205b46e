//! In-process Cache Invalidation Bus
//!
//! Broadcasts "this resource is stale" notices from the code that mutates a
//! resource to every view that renders it.
//!
//! # Architecture
//!
//! ```text
//! Comment form:
//!   1. POST /posts/5/comments/ succeeds
//!   2. Store bumps generation of "comments:5" and "posts"
//!   3. Publish InvalidationMessage for each key
//!      ↓
//! tokio broadcast channel (fan-out to all subscribers)
//!      ↓
//! Post view, comment view for post 5, CLI renderer:
//!   4. Receive message
//!   5. Re-render once the refetch for that generation lands
//! ```
//!
//! # Example
//!
//! ```
//! use cache_invalidation::{EntityType, InvalidationPublisher};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), cache_invalidation::InvalidationError> {
//! let publisher = InvalidationPublisher::new("post-form");
//! let mut subscriber = publisher.subscriber();
//!
//! publisher.invalidate_posts(1);
//!
//! let msg = subscriber.recv().await?;
//! assert_eq!(msg.entity_type, EntityType::PostList);
//! assert_eq!(msg.generation, 1);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

mod error;
mod helpers;
mod stats;

pub use error::InvalidationError;
pub use helpers::{build_cache_key, parse_cache_key};
pub use stats::{InvalidationStats, StatsCollector};

type Result<T> = std::result::Result<T, InvalidationError>;

/// Resource families that can be invalidated
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityType {
    Session,
    PostList,
    Comments,
    Custom(String),
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityType::Session => write!(f, "session"),
            EntityType::PostList => write!(f, "posts"),
            EntityType::Comments => write!(f, "comments"),
            EntityType::Custom(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for EntityType {
    fn from(s: &str) -> Self {
        match s {
            "session" => EntityType::Session,
            "posts" => EntityType::PostList,
            "comments" => EntityType::Comments,
            custom => EntityType::Custom(custom.to_string()),
        }
    }
}

/// Invalidation action
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InvalidationAction {
    Refetch, // Data is stale, a fresh fetch has been issued
    Reset,   // Data was dropped (logout, rejected credential)
}

/// Cache invalidation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationMessage {
    pub message_id: String,
    pub entity_type: EntityType,
    pub entity_id: Option<String>,
    /// Generation the resource moved to
    pub generation: u64,
    pub action: InvalidationAction,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub source: String,
}

impl InvalidationMessage {
    /// Create new refetch message
    pub fn refetch(
        entity_type: EntityType,
        entity_id: Option<String>,
        generation: u64,
        source: String,
    ) -> Self {
        Self::new(entity_type, entity_id, generation, InvalidationAction::Refetch, source)
    }

    /// Create new reset message
    pub fn reset(
        entity_type: EntityType,
        entity_id: Option<String>,
        generation: u64,
        source: String,
    ) -> Self {
        Self::new(entity_type, entity_id, generation, InvalidationAction::Reset, source)
    }

    fn new(
        entity_type: EntityType,
        entity_id: Option<String>,
        generation: u64,
        action: InvalidationAction,
        source: String,
    ) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            entity_type,
            entity_id,
            generation,
            action,
            timestamp: chrono::Utc::now(),
            source,
        }
    }

    /// Cache key of the invalidated resource, e.g. `comments:5`
    pub fn cache_key(&self) -> String {
        build_cache_key(&self.entity_type, self.entity_id.as_deref())
    }
}

/// Publisher for cache invalidation events
#[derive(Clone)]
pub struct InvalidationPublisher {
    sender: broadcast::Sender<InvalidationMessage>,
    source: String,
    stats: StatsCollector,
}

impl InvalidationPublisher {
    /// Messages buffered per subscriber before it starts lagging
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Create new publisher
    ///
    /// * `source` - Name of the component publishing (e.g., "feed-store")
    pub fn new(source: impl Into<String>) -> Self {
        Self::with_capacity(source, Self::DEFAULT_CAPACITY)
    }

    /// Create publisher with custom channel capacity
    pub fn with_capacity(source: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            source: source.into(),
            stats: StatsCollector::new(),
        }
    }

    /// Publish invalidation message
    ///
    /// Returns number of subscribers that received the message
    pub fn publish(&self, msg: InvalidationMessage) -> usize {
        debug!(
            message_id = %msg.message_id,
            key = %msg.cache_key(),
            generation = msg.generation,
            action = ?msg.action,
            "Publishing invalidation message"
        );

        self.stats.record_publish();

        // A send only fails when nobody is listening, which is not an error here
        match self.sender.send(msg) {
            Ok(receivers) => receivers,
            Err(_) => 0,
        }
    }

    /// Publish a refetch notice for an arbitrary entity
    pub fn invalidate(
        &self,
        entity_type: EntityType,
        entity_id: Option<&str>,
        generation: u64,
    ) -> usize {
        let msg = InvalidationMessage::refetch(
            entity_type,
            entity_id.map(str::to_string),
            generation,
            self.source.clone(),
        );
        self.publish(msg)
    }

    /// Invalidate current-user session data
    pub fn invalidate_session(&self, generation: u64) -> usize {
        self.invalidate(EntityType::Session, None, generation)
    }

    /// Invalidate the post list
    pub fn invalidate_posts(&self, generation: u64) -> usize {
        self.invalidate(EntityType::PostList, None, generation)
    }

    /// Invalidate the comments of a single post
    pub fn invalidate_comments(&self, post_id: &str, generation: u64) -> usize {
        self.invalidate(EntityType::Comments, Some(post_id), generation)
    }

    /// Announce that an entity was dropped rather than refetched
    pub fn reset(&self, entity_type: EntityType, entity_id: Option<&str>, generation: u64) -> usize {
        let msg = InvalidationMessage::reset(
            entity_type,
            entity_id.map(str::to_string),
            generation,
            self.source.clone(),
        );
        self.publish(msg)
    }

    /// Create a subscriber that sees every message published from now on
    pub fn subscriber(&self) -> InvalidationSubscriber {
        InvalidationSubscriber {
            receiver: self.sender.subscribe(),
            stats: self.stats.clone(),
        }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Snapshot of publish/receive counters shared with all subscribers
    pub fn stats(&self) -> InvalidationStats {
        self.stats.snapshot()
    }
}

/// Subscriber for cache invalidation events
pub struct InvalidationSubscriber {
    receiver: broadcast::Receiver<InvalidationMessage>,
    stats: StatsCollector,
}

impl InvalidationSubscriber {
    /// Wait for the next message
    ///
    /// Lagged messages are counted and skipped; the subscriber keeps going
    /// from the oldest message still buffered.
    pub async fn recv(&mut self) -> Result<InvalidationMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) => {
                    self.stats.record_receive();
                    return Ok(msg);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Invalidation subscriber lagged");
                    self.stats.record_lagged(skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return Err(InvalidationError::Closed),
            }
        }
    }

    /// Take the next buffered message without waiting
    pub fn try_recv(&mut self) -> Option<InvalidationMessage> {
        loop {
            match self.receiver.try_recv() {
                Ok(msg) => {
                    self.stats.record_receive();
                    return Some(msg);
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    self.stats.record_lagged(skipped);
                }
                Err(_) => return None,
            }
        }
    }

    /// Drain everything buffered so far
    pub fn drain(&mut self) -> Vec<InvalidationMessage> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Subscribe to invalidation events with callback
    ///
    /// Returns JoinHandle for background task; the task ends once every
    /// publisher is dropped.
    pub fn subscribe<F, Fut>(mut self, callback: F) -> JoinHandle<()>
    where
        F: Fn(InvalidationMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let callback = Arc::new(callback);

        tokio::spawn(async move {
            while let Ok(msg) = self.recv().await {
                let message_id = msg.message_id.clone();
                let callback_clone = Arc::clone(&callback);
                if let Err(e) = callback_clone(msg).await {
                    self.stats.record_error();
                    error!(
                        error = %e,
                        message_id = %message_id,
                        "Callback execution failed"
                    );
                }
            }

            debug!("Invalidation subscription ended");
        })
    }
}
