use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use feed_client::error::GENERIC_FAILURE;
use feed_client::{
    logout, AuthFailurePolicy, ClientConfig, CommentForm, FeedStore, LoginForm, Notice, PostForm,
    PostId, PostView, ReactionToggle, RegisterForm, SessionView,
};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "feed")]
#[command(about = "Command-line client for the feed API", long_about = None)]
struct Cli {
    /// API base URL (overrides FEED_API_BASE_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Token file (overrides FEED_TOKEN_PATH)
    #[arg(long, global = true)]
    token_path: Option<PathBuf>,

    /// Forget the stored token when the server rejects it
    #[arg(long, global = true)]
    clear_on_auth_failure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the token
    Login {
        username: String,
        #[arg(long, env = "FEED_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Register {
        username: String,
        #[arg(long, env = "FEED_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored token
    Logout,
    /// Show the current user
    Me,
    /// List posts with their comments
    Posts {
        /// Skip fetching comments
        #[arg(long)]
        no_comments: bool,
    },
    /// Create a post
    Post { title: String, content: String },
    /// Comment on a post
    Comment { post_id: PostId, content: String },
    /// Toggle the like on a post
    Like { post_id: PostId },
    /// Toggle the favorite on a post
    Favorite { post_id: PostId },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().context("Failed to load configuration")?;
    if let Some(api_url) = cli.api_url {
        config.api_base_url = api_url;
    }
    if let Some(token_path) = cli.token_path {
        config.token_path = token_path;
    }
    if cli.clear_on_auth_failure {
        config.auth_failure_policy = AuthFailurePolicy::Clear;
    }

    init_tracing(&config.log_level);
    debug!(api = %config.api_base_url, token_path = %config.token_path.display(), "Configuration loaded");

    let store = FeedStore::from_config(&config).context("Failed to initialize client")?;
    run(cli.command, &store).await
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run(command: Commands, store: &FeedStore) -> Result<()> {
    match command {
        Commands::Login { username, password } => {
            let mut form = LoginForm::new(username, password);
            let result = form.submit(store).await;
            let submitted = finish(form.message, result)?;
            submitted.settle().await;
            println!("{}", SessionView::new(store.clone()).render());
        }
        Commands::Register { username, password } => {
            let mut form = RegisterForm::new(username, password);
            let result = form.submit(store).await;
            finish(form.message, result)?;
        }
        Commands::Logout => {
            logout(store).context("Failed to clear token")?;
            println!("{}", Notice::success("logged out"));
        }
        Commands::Me => {
            let view = SessionView::new(store.clone());
            view.mount().wait().await;
            println!("{}", view.render());
        }
        Commands::Posts { no_comments } => {
            println!("{}", render_posts(store, !no_comments).await);
        }
        Commands::Post { title, content } => {
            let mut form = PostForm::new(title, content);
            let result = form.submit(store).await;
            finish(form.message, result)?.settle().await;
            println!("{}", render_posts(store, true).await);
        }
        Commands::Comment { post_id, content } => {
            let mut form = CommentForm::new(post_id, content);
            let result = form.submit(store).await;
            finish(form.message, result)?.settle().await;
            let view = PostView::new(store.clone()).comment_view(post_id);
            println!("{}", view.render());
        }
        Commands::Like { post_id } => {
            let toggle = ReactionToggle::new(store.clone());
            let outcome = toggle
                .like(post_id)
                .await
                .map_err(|e| anyhow!(Notice::failure("like", &e, GENERIC_FAILURE).blocking()))?;
            outcome.refetch.wait().await;

            let likes = PostView::new(store.clone())
                .rows()
                .into_iter()
                .find(|row| row.post.id == post_id)
                .map(|row| row.post.likes_count);
            let verb = if outcome.liked { "liked" } else { "unliked" };
            let message = match likes {
                Some(count) => format!("{verb} post {post_id} ({count} likes)"),
                None => format!("{verb} post {post_id}"),
            };
            println!("{}", Notice::success(message));
        }
        Commands::Favorite { post_id } => {
            let toggle = ReactionToggle::new(store.clone());
            let favorited = toggle
                .favorite(post_id)
                .await
                .map_err(|e| anyhow!(Notice::failure("favorite", &e, GENERIC_FAILURE)))?;
            let message = if favorited {
                "favorite added"
            } else {
                "favorite removed"
            };
            info!(post_id, favorited, "Favorite updated");
            println!("{}", Notice::success(message));
        }
    }

    Ok(())
}

/// Fetch the post list, optionally with every post's comments, and render it
async fn render_posts(store: &FeedStore, with_comments: bool) -> String {
    let view = PostView::new(store.clone());
    if with_comments {
        view.mount_with_comments().await;
    } else {
        view.mount().wait().await;
    }
    view.render()
}

/// Print a form's outcome notice; failures become the command's error
fn finish<T>(message: Option<Notice>, result: feed_client::Result<T>) -> Result<T> {
    match (result, message) {
        (Ok(value), Some(notice)) => {
            println!("{notice}");
            Ok(value)
        }
        (Ok(value), None) => Ok(value),
        (Err(_), Some(notice)) => Err(anyhow!(notice)),
        (Err(e), None) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_comment() {
        let cli = Cli::try_parse_from([
            "feed",
            "--api-url",
            "http://localhost:9000",
            "comment",
            "5",
            "nice",
        ])
        .unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://localhost:9000"));
        assert!(matches!(
            cli.command,
            Commands::Comment { post_id: 5, ref content } if content == "nice"
        ));
    }

    #[tokio::test]
    async fn test_rendered_posts_include_fetched_comments() {
        use feed_client::{ApiClient, MemoryTokenStore};
        use std::sync::Arc;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "title": "Hi", "content": "World", "owner_id": 1, "likes_count": 0}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/posts/1/comments/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri(), Arc::new(MemoryTokenStore::new())).unwrap();
        let store = FeedStore::new(api, AuthFailurePolicy::Retain);

        let rendered = render_posts(&store, true).await;
        assert!(rendered.contains("#1 Hi [likes 0]"));
        assert!(rendered.ends_with("    no comments yet"));
        assert!(!rendered.contains("loading comments"));
    }

    #[test]
    fn test_finish_prefers_notice_text() {
        let err = feed_client::ClientError::Transport("connection refused".into());
        let notice = Notice::failure("post", &err, GENERIC_FAILURE);
        let result: Result<()> = finish(Some(notice), Err(err));
        assert_eq!(
            result.unwrap_err().to_string(),
            "[error] post failed: request failed"
        );
    }
}
