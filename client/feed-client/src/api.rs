//! HTTP façade for the feed API
//!
//! One `reqwest::Client` with a fixed base address. Every request goes
//! through [`ApiClient::dispatch`], which reads the token store right before
//! sending and attaches `Authorization: Bearer <token>` when a token exists.
//! Without a token the header is simply omitted and the server decides.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::models::{
    Comment, Credentials, FavoriteResponse, LikeResponse, NewComment, NewPost, NewUser, Post,
    PostId, TokenResponse, User,
};
use crate::token_store::TokenStore;

/// Feed API client
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Create a client with the transport's default timeout
    pub fn new(base_url: &str, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        Self::build(base_url, None, tokens)
    }

    pub fn from_config(config: &ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        Self::build(
            &config.api_base_url,
            config.request_timeout_secs.map(Duration::from_secs),
            tokens,
        )
    }

    fn build(base_url: &str, timeout: Option<Duration>, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(ClientError::Configuration("API base URL is required".into()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::Configuration(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token store consulted before every request
    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// Request interceptor: attach the stored bearer token, if any
    fn authorize(&self, request: RequestBuilder) -> (RequestBuilder, bool) {
        match self.tokens.get() {
            Some(token) => (request.bearer_auth(token), true),
            None => (request, false),
        }
    }

    /// Send a request and decode a JSON success body
    ///
    /// Non-success responses become [`ClientError`]s carrying the server's
    /// `detail`. No retries.
    async fn dispatch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        let (request, authenticated) = self.authorize(request);

        debug!(method = %method, path = %path, authenticated, "Dispatching request");

        let response = request.send().await.map_err(|e| {
            warn!(method = %method, path = %path, error = %e, "Request failed");
            ClientError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ClientError::from_response(status.as_u16(), &body);
            warn!(
                method = %method,
                path = %path,
                status = status.as_u16(),
                error = %err,
                "Request rejected"
            );
            return Err(err);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(format!("{method} {path}: {e}")))
    }

    // ============= Session =============

    /// `POST /token` with a form-encoded body
    pub async fn request_token(&self, credentials: &Credentials) -> Result<TokenResponse> {
        let path = "/token";
        // `.form()` replaces the default JSON content type for this request
        let request = self.request(Method::POST, path).form(credentials);
        self.dispatch(Method::POST, path, request).await
    }

    /// `POST /users/`
    pub async fn register(&self, user: &NewUser) -> Result<User> {
        let path = "/users/";
        let request = self.request(Method::POST, path).json(user);
        self.dispatch(Method::POST, path, request).await
    }

    /// `GET /users/me/`
    pub async fn current_user(&self) -> Result<User> {
        let path = "/users/me/";
        let request = self.request(Method::GET, path);
        self.dispatch(Method::GET, path, request).await
    }

    // ============= Posts =============

    /// `GET /posts/`
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        let path = "/posts/";
        let request = self.request(Method::GET, path);
        self.dispatch(Method::GET, path, request).await
    }

    /// `POST /posts/`
    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        let path = "/posts/";
        let request = self.request(Method::POST, path).json(post);
        self.dispatch(Method::POST, path, request).await
    }

    // ============= Reactions =============

    /// `POST /posts/{id}/like`
    pub async fn toggle_like(&self, post_id: PostId) -> Result<LikeResponse> {
        let path = format!("/posts/{post_id}/like");
        let request = self.request(Method::POST, &path);
        self.dispatch(Method::POST, &path, request).await
    }

    /// `POST /posts/{id}/favorite`
    pub async fn toggle_favorite(&self, post_id: PostId) -> Result<FavoriteResponse> {
        let path = format!("/posts/{post_id}/favorite");
        let request = self.request(Method::POST, &path);
        self.dispatch(Method::POST, &path, request).await
    }

    // ============= Comments =============

    /// `GET /posts/{id}/comments/`
    pub async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>> {
        let path = format!("/posts/{post_id}/comments/");
        let request = self.request(Method::GET, &path);
        self.dispatch(Method::GET, &path, request).await
    }

    /// `POST /posts/{id}/comments/`
    pub async fn create_comment(&self, post_id: PostId, comment: &NewComment) -> Result<Comment> {
        let path = format!("/posts/{post_id}/comments/");
        let request = self.request(Method::POST, &path).json(comment);
        self.dispatch(Method::POST, &path, request).await
    }
}
