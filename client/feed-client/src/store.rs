//! Per-resource store with publish/invalidate
//!
//! The store owns one [`Resource`] per invalidation scope: the current
//! session, the post list, and the comments of each post. Views read
//! snapshots from it; mutations call [`FeedStore::invalidate`], which issues
//! exactly one fetch for the key and announces the new generation on the
//! invalidation bus. Fetches run as spawned tasks; a newer fetch for the same
//! key aborts the older task, and anything that still lands late is dropped
//! by the generation check.

use cache_invalidation::{InvalidationPublisher, InvalidationSubscriber};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::config::{AuthFailurePolicy, ClientConfig};
use crate::error::{ClientError, Result, GENERIC_FAILURE};
use crate::models::{Comment, Post, PostId, User};
use crate::reactions::ReactionBelief;
use crate::resource::{Resource, ResourceKey};
use crate::token_store::{FileTokenStore, TokenStore};

/// How a refetch ended
#[derive(Debug)]
pub enum FetchOutcome {
    /// Result became the displayed state
    Applied,
    /// Fetch failed and the failure became the displayed state
    Failed(ClientError),
    /// A newer fetch was issued before this one landed
    Stale,
    /// Task was aborted by a newer fetch of the same key
    Cancelled,
    /// Nothing to fetch (e.g. session without a token)
    Skipped,
}

impl FetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Handle to one issued fetch
#[derive(Debug)]
pub struct Refetch {
    key: ResourceKey,
    generation: u64,
    handle: JoinHandle<FetchOutcome>,
}

impl Refetch {
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the fetch to land
    pub async fn wait(self) -> FetchOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => FetchOutcome::Cancelled,
            Err(e) => FetchOutcome::Failed(ClientError::Transport(format!(
                "fetch task for {} panicked: {}",
                self.key, e
            ))),
        }
    }
}

/// Wait for a batch of refetches in order
pub async fn settle(refetches: Vec<Refetch>) -> Vec<FetchOutcome> {
    let mut outcomes = Vec::with_capacity(refetches.len());
    for refetch in refetches {
        outcomes.push(refetch.wait().await);
    }
    outcomes
}

struct StoreInner {
    api: ApiClient,
    policy: AuthFailurePolicy,
    session: Arc<Resource<User>>,
    posts: Arc<Resource<Vec<Post>>>,
    comments: DashMap<PostId, Arc<Resource<Vec<Comment>>>>,
    beliefs: ReactionBelief,
    publisher: InvalidationPublisher,
}

/// Shared client state; cheap to clone
#[derive(Clone)]
pub struct FeedStore {
    inner: Arc<StoreInner>,
}

impl FeedStore {
    pub fn new(api: ApiClient, policy: AuthFailurePolicy) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                api,
                policy,
                session: Arc::new(Resource::new(ResourceKey::Session)),
                posts: Arc::new(Resource::new(ResourceKey::PostList)),
                comments: DashMap::new(),
                beliefs: ReactionBelief::new(),
                publisher: InvalidationPublisher::new("feed-store"),
            }),
        }
    }

    /// Store backed by the durable per-origin token file
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;
        let origin = config
            .origin()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        let tokens: Arc<dyn TokenStore> =
            Arc::new(FileTokenStore::open(&config.token_path, origin));
        let api = ApiClient::from_config(config, tokens)?;

        Ok(Self::new(api, config.auth_failure_policy))
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        self.inner.api.tokens()
    }

    pub fn has_token(&self) -> bool {
        self.tokens().has_token()
    }

    pub fn policy(&self) -> AuthFailurePolicy {
        self.inner.policy
    }

    pub fn session(&self) -> &Arc<Resource<User>> {
        &self.inner.session
    }

    pub fn posts(&self) -> &Arc<Resource<Vec<Post>>> {
        &self.inner.posts
    }

    /// Comment resource for `post_id`, created on first use
    pub fn comments(&self, post_id: PostId) -> Arc<Resource<Vec<Comment>>> {
        self.inner
            .comments
            .entry(post_id)
            .or_insert_with(|| Arc::new(Resource::new(ResourceKey::Comments(post_id))))
            .clone()
    }

    pub fn beliefs(&self) -> &ReactionBelief {
        &self.inner.beliefs
    }

    /// Subscribe to invalidation notices
    pub fn subscribe(&self) -> InvalidationSubscriber {
        self.inner.publisher.subscriber()
    }

    pub fn publisher(&self) -> &InvalidationPublisher {
        &self.inner.publisher
    }

    /// Refresh counter of a scope
    pub fn generation(&self, key: ResourceKey) -> u64 {
        match key {
            ResourceKey::Session => self.inner.session.generation(),
            ResourceKey::PostList => self.inner.posts.generation(),
            ResourceKey::Comments(post_id) => self.comments(post_id).generation(),
        }
    }

    /// Mark `key` stale, refetch it, and announce the new generation
    pub fn invalidate(&self, key: ResourceKey) -> Refetch {
        let refetch = self.refresh(key);
        let entity_id = key.entity_id();
        let delivered = self.inner.publisher.invalidate(
            key.entity_type(),
            entity_id.as_deref(),
            refetch.generation(),
        );
        debug!(key = %key, generation = refetch.generation(), subscribers = delivered, "Invalidated");
        refetch
    }

    /// Issue one fetch for `key` without announcing it (initial mount)
    pub fn refresh(&self, key: ResourceKey) -> Refetch {
        match key {
            ResourceKey::Session => {
                if !self.has_token() {
                    let generation = self.inner.session.reset();
                    debug!(key = %key, "No token stored, session fetch skipped");
                    return Refetch {
                        key,
                        generation,
                        handle: tokio::spawn(async { FetchOutcome::Skipped }),
                    };
                }
                self.spawn_fetch(key, Arc::clone(&self.inner.session), |api| async move {
                    api.current_user().await
                })
            }
            ResourceKey::PostList => {
                self.spawn_fetch(key, Arc::clone(&self.inner.posts), |api| async move {
                    api.list_posts().await
                })
            }
            ResourceKey::Comments(post_id) => {
                self.spawn_fetch(key, self.comments(post_id), move |api| async move {
                    api.list_comments(post_id).await
                })
            }
        }
    }

    /// Drop the data of `key` and announce it
    pub fn reset(&self, key: ResourceKey) -> u64 {
        let generation = match key {
            ResourceKey::Session => self.inner.session.reset(),
            ResourceKey::PostList => self.inner.posts.reset(),
            ResourceKey::Comments(post_id) => self.comments(post_id).reset(),
        };
        let entity_id = key.entity_id();
        self.inner
            .publisher
            .reset(key.entity_type(), entity_id.as_deref(), generation);
        generation
    }

    /// Route a failed operation through the auth-failure path when it is one
    pub fn handle_error(&self, err: &ClientError) {
        if err.is_unauthenticated() {
            self.handle_auth_failure();
        }
    }

    /// React to the server rejecting the stored credential
    ///
    /// Returns whether the credential was cleared.
    pub fn handle_auth_failure(&self) -> bool {
        match self.inner.policy {
            AuthFailurePolicy::Retain => {
                warn!("Credential rejected by server, keeping stored token");
                false
            }
            AuthFailurePolicy::Clear => {
                if let Err(e) = self.tokens().clear() {
                    warn!(error = %e, "Failed to clear rejected token");
                    return false;
                }
                self.inner.beliefs.clear();
                self.reset(ResourceKey::Session);
                info!("Credential rejected by server, stored token cleared");
                true
            }
        }
    }

    fn spawn_fetch<T, F, Fut>(&self, key: ResourceKey, resource: Arc<Resource<T>>, fetch: F) -> Refetch
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(ApiClient) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let generation = resource.begin();
        debug!(key = %key, generation, "Fetch issued");

        let store = self.clone();
        let task_resource = Arc::clone(&resource);
        let handle = tokio::spawn(async move {
            match fetch(store.api().clone()).await {
                Ok(value) => {
                    if task_resource.complete(generation, Ok(value)) {
                        FetchOutcome::Applied
                    } else {
                        FetchOutcome::Stale
                    }
                }
                Err(err) => {
                    let applied =
                        task_resource.complete(generation, Err(err.user_message(GENERIC_FAILURE)));
                    if applied {
                        // A superseded failure must not clear a credential stored since
                        store.handle_error(&err);
                        FetchOutcome::Failed(err)
                    } else {
                        FetchOutcome::Stale
                    }
                }
            }
        });
        resource.track(generation, handle.abort_handle());

        Refetch {
            key,
            generation,
            handle,
        }
    }
}
