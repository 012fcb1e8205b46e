//! Generation-tracked resource cell
//!
//! A [`Resource`] holds the last applied fetch result for one key together
//! with a monotonically increasing generation. Starting a fetch issues a new
//! generation; a result is applied only if its generation is still the latest
//! issued when it arrives. Older results are dropped, so the displayed state
//! always corresponds to the most recently issued fetch.

use cache_invalidation::{build_cache_key, EntityType};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::models::PostId;

/// Identifies one invalidation scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    /// Current user info
    Session,
    /// Full post list
    PostList,
    /// Comments of one post
    Comments(PostId),
}

impl ResourceKey {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Session => EntityType::Session,
            Self::PostList => EntityType::PostList,
            Self::Comments(_) => EntityType::Comments,
        }
    }

    pub fn entity_id(&self) -> Option<String> {
        match self {
            Self::Comments(post_id) => Some(post_id.to_string()),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&build_cache_key(
            &self.entity_type(),
            self.entity_id().as_deref(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState<T> {
    /// Never fetched, or dropped by a reset
    Idle,
    /// First fetch in flight
    Loading,
    Loaded(T),
    /// Last fetch failed; holds the user-facing message
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

/// What a view renders: the state plus the generation it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T> {
    pub generation: u64,
    pub state: LoadState<T>,
}

pub struct Resource<T> {
    key: ResourceKey,
    issued: AtomicU64,
    state: watch::Sender<Snapshot<T>>,
    /// Task running the newest tracked fetch, with its generation
    inflight: Mutex<Option<(u64, AbortHandle)>>,
}

impl<T: Clone> Resource<T> {
    pub fn new(key: ResourceKey) -> Self {
        let (state, _) = watch::channel(Snapshot {
            generation: 0,
            state: LoadState::Idle,
        });
        Self {
            key,
            issued: AtomicU64::new(0),
            state,
            inflight: Mutex::new(None),
        }
    }

    pub fn key(&self) -> ResourceKey {
        self.key
    }

    /// Latest generation issued; this is the scope's refresh counter
    pub fn generation(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Whether a fetch newer than the displayed state is outstanding
    pub fn is_pending(&self) -> bool {
        self.generation() > self.state.borrow().generation
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.state.borrow().clone()
    }

    /// Receiver notified whenever a result is applied
    pub fn watch(&self) -> watch::Receiver<Snapshot<T>> {
        self.state.subscribe()
    }

    /// Issue a new generation for a fetch about to start
    ///
    /// Loaded data stays visible while the refetch runs; an idle or failed
    /// resource moves to `Loading`.
    pub fn begin(&self) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|snapshot| {
            generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            if !matches!(snapshot.state, LoadState::Loaded(_)) {
                snapshot.state = LoadState::Loading;
            }
        });
        generation
    }

    /// Apply a fetch result if `generation` is still the latest issued
    ///
    /// Returns false (and leaves the state untouched) for stale results.
    pub fn complete(&self, generation: u64, result: Result<T, String>) -> bool {
        let key = self.key;
        self.state.send_if_modified(|snapshot| {
            let latest = self.issued.load(Ordering::SeqCst);
            if generation != latest {
                debug!(key = %key, generation, latest, "Discarding stale fetch result");
                return false;
            }
            snapshot.generation = generation;
            snapshot.state = match result {
                Ok(value) => LoadState::Loaded(value),
                Err(message) => LoadState::Failed(message),
            };
            true
        })
    }

    /// Drop the data and return to `Idle`
    ///
    /// Any fetch still in flight becomes stale and its result is discarded.
    pub fn reset(&self) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|snapshot| {
            generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            snapshot.generation = generation;
            snapshot.state = LoadState::Idle;
        });
        generation
    }

    /// Remember the task running the fetch for `generation`
    ///
    /// Whichever of the tracked task and `handle` belongs to the older
    /// generation is aborted, so callers racing between `begin` and `track`
    /// never cancel the newest fetch.
    pub fn track(&self, generation: u64, handle: AbortHandle) {
        let Ok(mut inflight) = self.inflight.lock() else {
            return;
        };
        let tracked = inflight.as_ref().map(|(tracked, _)| *tracked);
        if tracked.is_some_and(|tracked| tracked > generation) {
            debug!(key = %self.key, generation, ?tracked, "Aborting superseded fetch");
            handle.abort();
        } else if let Some((_, previous)) = inflight.replace((generation, handle)) {
            previous.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_key_display() {
        assert_eq!(ResourceKey::Session.to_string(), "session");
        assert_eq!(ResourceKey::PostList.to_string(), "posts");
        assert_eq!(ResourceKey::Comments(5).to_string(), "comments:5");
    }

    #[test]
    fn test_begin_then_complete() {
        let resource: Resource<Vec<i32>> = Resource::new(ResourceKey::PostList);
        assert_eq!(resource.snapshot().state, LoadState::Idle);

        let generation = resource.begin();
        assert_eq!(generation, 1);
        assert_eq!(resource.snapshot().state, LoadState::Loading);
        assert!(resource.is_pending());

        assert!(resource.complete(generation, Ok(vec![1, 2])));
        let snapshot = resource.snapshot();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.state, LoadState::Loaded(vec![1, 2]));
        assert!(!resource.is_pending());
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let resource: Resource<&'static str> = Resource::new(ResourceKey::PostList);

        let first = resource.begin();
        let second = resource.begin();

        // Second fetch lands first, then the older one arrives late
        assert!(resource.complete(second, Ok("new")));
        assert!(!resource.complete(first, Ok("old")));

        let snapshot = resource.snapshot();
        assert_eq!(snapshot.generation, second);
        assert_eq!(snapshot.state, LoadState::Loaded("new"));
    }

    #[test]
    fn test_loaded_data_survives_refetch_start() {
        let resource: Resource<u8> = Resource::new(ResourceKey::Comments(1));
        let generation = resource.begin();
        resource.complete(generation, Ok(7));

        resource.begin();
        assert_eq!(resource.snapshot().state, LoadState::Loaded(7));
        assert!(resource.is_pending());
    }

    #[test]
    fn test_failure_replaces_state() {
        let resource: Resource<u8> = Resource::new(ResourceKey::Session);
        let generation = resource.begin();
        assert!(resource.complete(generation, Err("request failed".into())));
        assert_eq!(
            resource.snapshot().state,
            LoadState::Failed("request failed".into())
        );
    }

    #[test]
    fn test_reset_invalidates_outstanding_fetch() {
        let resource: Resource<u8> = Resource::new(ResourceKey::Session);
        let generation = resource.begin();

        let reset_generation = resource.reset();
        assert!(reset_generation > generation);
        assert!(!resource.complete(generation, Ok(1)));
        assert_eq!(resource.snapshot().state, LoadState::Idle);
    }

    #[tokio::test]
    async fn test_out_of_order_track_keeps_newest_fetch() {
        let resource: Resource<u8> = Resource::new(ResourceKey::PostList);
        let older = tokio::spawn(std::future::pending::<()>());
        let newer = tokio::spawn(std::future::pending::<()>());

        let first = resource.begin();
        let second = resource.begin();

        // The caller that issued the newer generation tracks first
        resource.track(second, newer.abort_handle());
        resource.track(first, older.abort_handle());

        assert!(older.await.unwrap_err().is_cancelled());
        tokio::task::yield_now().await;
        assert!(!newer.is_finished());

        let third = resource.begin();
        let latest = tokio::spawn(async {});
        resource.track(third, latest.abort_handle());
        assert!(newer.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_watchers_see_applied_results() {
        let resource: Resource<u8> = Resource::new(ResourceKey::PostList);
        let mut watcher = resource.watch();

        let generation = resource.begin();
        resource.complete(generation, Ok(3));

        watcher.changed().await.unwrap();
        assert_eq!(watcher.borrow_and_update().state, LoadState::Loaded(3));
    }
}
