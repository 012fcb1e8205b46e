//! Feed client
//!
//! Headless client for a token-authenticated social feed: session handling,
//! posts, comments, and like/favorite reactions.
//!
//! # Architecture
//!
//! ```text
//! LoginForm ──► TokenStore ◄── ApiClient (reads token before every request)
//!                                  │
//!                                  ▼
//!                  FeedStore: Resource<User>
//!                             Resource<Vec<Post>>
//!                             Resource<Vec<Comment>> per post id
//!                                  │
//!      mutation ──► invalidate(key) ──► one refetch + InvalidationMessage
//!                                  │
//!                                  ▼
//!                  SessionView / PostView / CommentView snapshots
//! ```
//!
//! # Example
//!
//! ```no_run
//! use feed_client::{ClientConfig, CommentForm, FeedStore, PostView};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::from_env()?;
//!     let store = FeedStore::from_config(&config)?;
//!
//!     let mut form = CommentForm::new(5, "nice post");
//!     form.submit(&store).await?.settle().await;
//!
//!     println!("{}", PostView::new(store).render());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod comments;
pub mod config;
pub mod error;
pub mod forms;
pub mod models;
pub mod notice;
pub mod posts;
pub mod reactions;
pub mod resource;
pub mod session;
pub mod store;
pub mod token_store;

pub use api::ApiClient;
pub use comments::CommentView;
pub use config::{AuthFailurePolicy, ClientConfig};
pub use error::{ClientError, Result, ValidationError};
pub use forms::{CommentForm, LoginForm, PostForm, RegisterForm, Submitted};
pub use models::{Comment, Post, PostId, User};
pub use notice::{Notice, NoticeLevel};
pub use posts::{PostRow, PostView};
pub use reactions::{LikeOutcome, ReactionBelief, ReactionToggle};
pub use resource::{LoadState, ResourceKey, Snapshot};
pub use session::{logout, SessionState, SessionView};
pub use store::{settle, FeedStore, FetchOutcome, Refetch};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};

pub use cache_invalidation::{InvalidationMessage, InvalidationSubscriber};
