//! Post list view
//!
//! Each row composes the reaction belief for the post and a [`CommentView`]
//! bound to its id. The list is refetched as a whole; rows are rebuilt from
//! whatever snapshot is current.

use crate::comments::CommentView;
use crate::models::{Post, PostId};
use crate::resource::{LoadState, ResourceKey};
use crate::store::{settle, FeedStore, FetchOutcome, Refetch};

/// One rendered post
#[derive(Clone)]
pub struct PostRow {
    pub post: Post,
    /// Local hint only; `post.likes_count` is the server's number
    pub liked: bool,
    pub comments: CommentView,
}

impl PostRow {
    pub fn render(&self) -> String {
        let marker = if self.liked { " (liked)" } else { "" };
        let comments = self
            .comments
            .render()
            .lines()
            .map(|line| format!("    {line}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "#{} {} [likes {}]{}\n  {}\n  by user {}\n{}",
            self.post.id,
            self.post.title,
            self.post.likes_count,
            marker,
            self.post.content,
            self.post.owner_id,
            comments
        )
    }
}

#[derive(Clone)]
pub struct PostView {
    store: FeedStore,
}

impl PostView {
    pub fn new(store: FeedStore) -> Self {
        Self { store }
    }

    pub fn mount(&self) -> Refetch {
        self.store.refresh(ResourceKey::PostList)
    }

    /// Mount the list, then the comment view of every loaded post
    pub async fn mount_with_comments(&self) -> Vec<FetchOutcome> {
        let mut outcomes = vec![self.mount().wait().await];
        outcomes.extend(settle(self.mount_comments()).await);
        outcomes
    }

    /// Fetch comments for every post currently in the list
    pub fn mount_comments(&self) -> Vec<Refetch> {
        self.post_ids()
            .into_iter()
            .map(|post_id| self.comment_view(post_id).mount())
            .collect()
    }

    pub fn state(&self) -> LoadState<Vec<Post>> {
        self.store.posts().snapshot().state
    }

    pub fn comment_view(&self, post_id: PostId) -> CommentView {
        CommentView::new(self.store.clone(), post_id)
    }

    fn post_ids(&self) -> Vec<PostId> {
        self.state()
            .data()
            .map(|posts| posts.iter().map(|post| post.id).collect())
            .unwrap_or_default()
    }

    pub fn rows(&self) -> Vec<PostRow> {
        let beliefs = self.store.beliefs();
        match self.state() {
            LoadState::Loaded(posts) => posts
                .into_iter()
                .map(|post| PostRow {
                    liked: beliefs.is_liked(post.id),
                    comments: self.comment_view(post.id),
                    post,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn render(&self) -> String {
        match self.state() {
            LoadState::Idle | LoadState::Loading => "loading posts...".to_string(),
            LoadState::Failed(message) => format!("failed to load posts: {message}"),
            LoadState::Loaded(posts) if posts.is_empty() => "no posts yet".to_string(),
            LoadState::Loaded(_) => self
                .rows()
                .iter()
                .map(PostRow::render)
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::config::AuthFailurePolicy;
    use crate::token_store::MemoryTokenStore;
    use std::sync::Arc;

    fn post(id: PostId, likes_count: i64) -> Post {
        Post {
            id,
            title: format!("title {id}"),
            content: "body".into(),
            owner_id: 1,
            likes_count,
        }
    }

    fn store() -> FeedStore {
        let api = ApiClient::new("http://127.0.0.1:9", Arc::new(MemoryTokenStore::new())).unwrap();
        FeedStore::new(api, AuthFailurePolicy::Retain)
    }

    #[test]
    fn test_empty_list_placeholder() {
        let store = store();
        let generation = store.posts().begin();
        store.posts().complete(generation, Ok(Vec::new()));

        let view = PostView::new(store);
        assert_eq!(view.render(), "no posts yet");
        assert!(view.rows().is_empty());
    }

    #[test]
    fn test_rows_compose_belief_and_comments() {
        let store = store();
        let generation = store.posts().begin();
        store
            .posts()
            .complete(generation, Ok(vec![post(1, 0), post(5, 3)]));
        store.beliefs().set(5, true);

        let view = PostView::new(store);
        let rows = view.rows();
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].liked);
        assert!(rows[1].liked);
        assert_eq!(rows[1].comments.post_id(), 5);

        let rendered = rows[1].render();
        assert!(rendered.starts_with("#5 title 5 [likes 3] (liked)"));
        assert!(rendered.ends_with("    loading comments..."));
    }

    #[test]
    fn test_failed_fetch_renders_error() {
        let store = store();
        let generation = store.posts().begin();
        store
            .posts()
            .complete(generation, Err("request failed".into()));

        assert_eq!(
            PostView::new(store).render(),
            "failed to load posts: request failed"
        );
    }
}
