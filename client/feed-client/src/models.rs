//! Wire models for the feed API
//!
//! Field names follow the server's JSON exactly.

use serde::{Deserialize, Serialize};

/// Server-assigned post identifier
pub type PostId = i64;

/// Server-assigned user identifier
pub type UserId = i64;

// ============================================================================
// SESSION MODELS
// ============================================================================

/// Form body of `POST /token`
#[derive(Clone, Debug, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Response of `POST /token`
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Body of `POST /users/`
#[derive(Clone, Debug, Serialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}

/// Current user, as returned by `GET /users/me/`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub is_active: bool,
}

// ============================================================================
// POST MODELS
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub owner_id: UserId,
    /// Authoritative only as of the last fetch
    #[serde(default)]
    pub likes_count: i64,
}

/// Body of `POST /posts/`
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub content: String,
}

// ============================================================================
// COMMENT MODELS
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: i64,
    /// Implied by the request scope, not always present in responses
    #[serde(default)]
    pub post_id: Option<PostId>,
    pub content: String,
    pub owner_id: UserId,
}

/// Body of `POST /posts/{id}/comments/`
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct NewComment {
    pub content: String,
}

// ============================================================================
// REACTION MODELS
// ============================================================================

/// Response of `POST /posts/{id}/like`; carries the new state, not a delta
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct LikeResponse {
    #[serde(default)]
    pub post_id: Option<PostId>,
    pub liked: bool,
}

/// Response of `POST /posts/{id}/favorite`
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct FavoriteResponse {
    #[serde(default)]
    pub post_id: Option<PostId>,
    pub favorited: bool,
}
