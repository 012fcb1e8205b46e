//! Mutation entry points
//!
//! Every form runs its guards before touching the network, then submits and
//! reports through its `message`. A successful submit clears the inputs and
//! returns the refetches it issued; a failed one keeps the inputs as typed.

use tracing::{debug, info, warn};

use crate::error::{ClientError, Result, ValidationError, GENERIC_FAILURE};
use crate::models::{
    Comment, Credentials, NewComment, NewPost, NewUser, Post, PostId, TokenResponse, User,
};
use crate::notice::Notice;
use crate::reactions::require_token;
use crate::resource::ResourceKey;
use crate::store::{settle, FeedStore, FetchOutcome, Refetch};

/// Server-side limit on comment length, in characters
pub const MAX_COMMENT_CHARS: usize = 500;

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PASSWORD_CHARS: usize = 72;

/// A created entity plus the refetches its submission issued
#[derive(Debug)]
pub struct Submitted<T> {
    pub created: T,
    pub refetches: Vec<Refetch>,
}

impl<T> Submitted<T> {
    /// Wait for every cascaded refetch to land
    pub async fn settle(self) -> (T, Vec<FetchOutcome>) {
        let outcomes = settle(self.refetches).await;
        (self.created, outcomes)
    }
}

fn require_text(value: &str, missing: ValidationError) -> Result<()> {
    if value.trim().is_empty() {
        return Err(missing.into());
    }
    Ok(())
}

/// Record a failed submit on the form and pass the error on
fn reject<T>(message: &mut Option<Notice>, action: &str, err: ClientError) -> Result<T> {
    if err.is_validation() {
        debug!(action, error = %err, "Submit blocked");
    } else {
        warn!(action, error = %err, "Submit failed");
    }
    *message = Some(Notice::failure(action, &err, GENERIC_FAILURE));
    Err(err)
}

// ============================================================================
// POSTS
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    pub message: Option<Notice>,
}

impl PostForm {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            message: None,
        }
    }

    fn check(&self, store: &FeedStore) -> Result<()> {
        require_token(store)?;
        require_text(&self.title, ValidationError::TitleRequired)?;
        require_text(&self.content, ValidationError::ContentRequired)
    }

    /// Create the post and invalidate the post list
    pub async fn submit(&mut self, store: &FeedStore) -> Result<Submitted<Post>> {
        self.message = None;
        if let Err(err) = self.check(store) {
            return reject(&mut self.message, "post", err);
        }

        let body = NewPost {
            title: self.title.clone(),
            content: self.content.clone(),
        };
        match store.api().create_post(&body).await {
            Ok(post) => {
                info!(post_id = post.id, "Post created");
                self.title.clear();
                self.content.clear();
                self.message = Some(Notice::success("post created"));
                Ok(Submitted {
                    created: post,
                    refetches: vec![store.invalidate(ResourceKey::PostList)],
                })
            }
            Err(err) => {
                store.handle_error(&err);
                reject(&mut self.message, "post", err)
            }
        }
    }
}

// ============================================================================
// COMMENTS
// ============================================================================

#[derive(Debug, Clone)]
pub struct CommentForm {
    pub post_id: PostId,
    pub content: String,
    pub message: Option<Notice>,
}

impl CommentForm {
    pub fn new(post_id: PostId, content: impl Into<String>) -> Self {
        Self {
            post_id,
            content: content.into(),
            message: None,
        }
    }

    fn check(&self, store: &FeedStore) -> Result<()> {
        require_token(store)?;
        require_text(&self.content, ValidationError::ContentRequired)?;
        if self.content.chars().count() > MAX_COMMENT_CHARS {
            return Err(ValidationError::ContentTooLong {
                max: MAX_COMMENT_CHARS,
            }
            .into());
        }
        Ok(())
    }

    /// Create the comment and invalidate this post's comments and the post list
    pub async fn submit(&mut self, store: &FeedStore) -> Result<Submitted<Comment>> {
        self.message = None;
        if let Err(err) = self.check(store) {
            return reject(&mut self.message, "comment", err);
        }

        let body = NewComment {
            content: self.content.clone(),
        };
        match store.api().create_comment(self.post_id, &body).await {
            Ok(comment) => {
                info!(post_id = self.post_id, comment_id = comment.id, "Comment created");
                self.content.clear();
                self.message = Some(Notice::success("comment created"));
                Ok(Submitted {
                    created: comment,
                    refetches: vec![
                        store.invalidate(ResourceKey::Comments(self.post_id)),
                        store.invalidate(ResourceKey::PostList),
                    ],
                })
            }
            Err(err) => {
                store.handle_error(&err);
                reject(&mut self.message, "comment", err)
            }
        }
    }
}

// ============================================================================
// SESSION
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub message: Option<Notice>,
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            message: None,
        }
    }

    /// Exchange credentials for a token, store it, and refetch the session
    ///
    /// Reaction beliefs belong to whoever was logged in before and are
    /// dropped.
    pub async fn submit(&mut self, store: &FeedStore) -> Result<Submitted<TokenResponse>> {
        self.message = None;
        if let Err(err) = require_text(&self.username, ValidationError::UsernameRequired)
            .and_then(|_| require_text(&self.password, ValidationError::PasswordRequired))
        {
            return reject(&mut self.message, "login", err);
        }

        let credentials = Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        };
        let token = match store.api().request_token(&credentials).await {
            Ok(token) => token,
            Err(err) => return reject(&mut self.message, "login", err),
        };
        if let Err(err) = store.tokens().set(&token.access_token) {
            return reject(&mut self.message, "login", err);
        }

        store.beliefs().clear();
        info!(username = %credentials.username, token_type = %token.token_type, "Logged in");

        self.password.clear();
        self.message = Some(Notice::success("login succeeded, token stored"));
        Ok(Submitted {
            created: token,
            refetches: vec![store.invalidate(ResourceKey::Session)],
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub message: Option<Notice>,
}

impl RegisterForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            message: None,
        }
    }

    fn check(&self) -> Result<()> {
        require_text(&self.username, ValidationError::UsernameRequired)?;
        let length = self.password.chars().count();
        if !(MIN_PASSWORD_CHARS..=MAX_PASSWORD_CHARS).contains(&length) {
            return Err(ValidationError::PasswordLength {
                min: MIN_PASSWORD_CHARS,
                max: MAX_PASSWORD_CHARS,
            }
            .into());
        }
        Ok(())
    }

    /// Create an account; does not log in
    pub async fn submit(&mut self, store: &FeedStore) -> Result<Submitted<User>> {
        self.message = None;
        if let Err(err) = self.check() {
            return reject(&mut self.message, "register", err);
        }

        let body = NewUser {
            username: self.username.clone(),
            password: self.password.clone(),
        };
        match store.api().register(&body).await {
            Ok(user) => {
                info!(user_id = user.id, username = %user.username, "User registered");
                self.username.clear();
                self.password.clear();
                self.message = Some(Notice::success(format!(
                    "user {} registered",
                    user.username
                )));
                Ok(Submitted {
                    created: user,
                    refetches: Vec::new(),
                })
            }
            Err(err) => reject(&mut self.message, "register", err),
        }
    }
}
