//! Like/favorite toggles and the local "liked" hint
//!
//! The server only ever answers with the new state of a toggle, so the client
//! keeps its own belief about which posts the user liked. That belief is a
//! hint for rendering and nothing more: it starts empty, is never reconciled
//! against the server, and is dropped on login and logout. The like count
//! shown next to it always comes from a fresh post-list fetch.

use dashmap::DashSet;
use tracing::{debug, info, warn};

use crate::error::{Result, ValidationError};
use crate::models::PostId;
use crate::resource::ResourceKey;
use crate::store::{FeedStore, Refetch};

/// Client-local set of posts believed to be liked
#[derive(Debug, Default)]
pub struct ReactionBelief {
    liked: DashSet<PostId>,
}

impl ReactionBelief {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_liked(&self, post_id: PostId) -> bool {
        self.liked.contains(&post_id)
    }

    pub fn set(&self, post_id: PostId, liked: bool) {
        if liked {
            self.liked.insert(post_id);
        } else {
            self.liked.remove(&post_id);
        }
    }

    pub fn clear(&self) {
        self.liked.clear();
    }

    /// Liked post ids in ascending order
    pub fn liked_posts(&self) -> Vec<PostId> {
        let mut posts: Vec<PostId> = self.liked.iter().map(|id| *id).collect();
        posts.sort_unstable();
        posts
    }
}

/// Result of a like toggle
#[derive(Debug)]
pub struct LikeOutcome {
    pub post_id: PostId,
    /// New state reported by the server
    pub liked: bool,
    /// Post-list refetch issued by the toggle
    pub refetch: Refetch,
}

/// Issues reaction mutations for one store
#[derive(Clone)]
pub struct ReactionToggle {
    store: FeedStore,
}

impl ReactionToggle {
    pub fn new(store: FeedStore) -> Self {
        Self { store }
    }

    /// Toggle the like on `post_id`
    ///
    /// On success the belief takes the server's answer and the post list is
    /// invalidated. On failure nothing local changes.
    pub async fn like(&self, post_id: PostId) -> Result<LikeOutcome> {
        require_token(&self.store)?;

        match self.store.api().toggle_like(post_id).await {
            Ok(response) => {
                self.store.beliefs().set(post_id, response.liked);
                info!(post_id, liked = response.liked, "Like toggled");
                let refetch = self.store.invalidate(ResourceKey::PostList);
                Ok(LikeOutcome {
                    post_id,
                    liked: response.liked,
                    refetch,
                })
            }
            Err(err) => {
                warn!(post_id, error = %err, "Like toggle failed");
                self.store.handle_error(&err);
                Err(err)
            }
        }
    }

    /// Toggle the favorite on `post_id`; returns the new state
    pub async fn favorite(&self, post_id: PostId) -> Result<bool> {
        require_token(&self.store)?;

        match self.store.api().toggle_favorite(post_id).await {
            Ok(response) => {
                info!(post_id, favorited = response.favorited, "Favorite toggled");
                Ok(response.favorited)
            }
            Err(err) => {
                warn!(post_id, error = %err, "Favorite toggle failed");
                self.store.handle_error(&err);
                Err(err)
            }
        }
    }
}

pub(crate) fn require_token(store: &FeedStore) -> Result<()> {
    if !store.has_token() {
        debug!("Mutation blocked: no token stored");
        return Err(ValidationError::LoginRequired.into());
    }
    Ok(())
}
