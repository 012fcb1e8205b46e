//! Comments of a single post

use crate::models::{Comment, PostId};
use crate::resource::{LoadState, ResourceKey};
use crate::store::{FeedStore, Refetch};

/// View bound to one post id for its whole lifetime
#[derive(Clone)]
pub struct CommentView {
    store: FeedStore,
    post_id: PostId,
}

impl CommentView {
    pub fn new(store: FeedStore, post_id: PostId) -> Self {
        Self { store, post_id }
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::Comments(self.post_id)
    }

    pub fn mount(&self) -> Refetch {
        self.store.refresh(self.key())
    }

    pub fn state(&self) -> LoadState<Vec<Comment>> {
        self.store.comments(self.post_id).snapshot().state
    }

    /// Comments in server order, one per line
    pub fn render(&self) -> String {
        match self.state() {
            LoadState::Idle | LoadState::Loading => "loading comments...".to_string(),
            LoadState::Failed(message) => format!("failed to load comments: {message}"),
            LoadState::Loaded(comments) if comments.is_empty() => "no comments yet".to_string(),
            LoadState::Loaded(comments) => comments
                .iter()
                .map(|c| format!("- {} (owner {})", c.content, c.owner_id))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}
