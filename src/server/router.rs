use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{get, post, put},
};

use super::{auth, images, posts, projects, users};
use crate::auth::{IdentityProvider, LocalIdentityProvider};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::github::GitHubClient;
use crate::google::GoogleVerifier;
use crate::identity::IdentityResolver;
use crate::images::{ImageStorage, MAX_IMAGE_BYTES};
use crate::repository::ContentRepository;
use crate::store::Store;

pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub resolver: Arc<IdentityResolver>,
    pub repo: ContentRepository,
    pub github: GitHubClient,
    pub google: GoogleVerifier,
    pub images: ImageStorage,
    /// Public base URL for external access. Used for image URLs.
    pub public_base_url: Option<String>,
}

impl AppState {
    /// Wires the local identity provider, GitHub client and image storage
    /// around an initialized store.
    pub fn new(store: Arc<dyn Store>, config: &ServerConfig) -> Result<Self> {
        let identity: Arc<dyn IdentityProvider> =
            Arc::new(LocalIdentityProvider::new(store.clone(), config.token_ttl()?)?);
        let resolver = Arc::new(IdentityResolver::new(store.clone(), identity.clone()));
        let github = GitHubClient::new(
            &config.github_api_url,
            &config.github_oauth_url,
            config.github_oauth.clone(),
        )?;

        Ok(Self {
            repo: ContentRepository::new(store, resolver.clone(), github.clone()),
            identity,
            resolver,
            github,
            google: GoogleVerifier::new(
                &config.google_tokeninfo_url,
                config.google_client_id.clone(),
            )?,
            images: ImageStorage::new(&config.images_dir()),
            public_base_url: config
                .public_base_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
        })
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn api_router() -> Router<Arc<AppState>> {
    // Base64 inflates uploads by a third.
    let image_body_limit = DefaultBodyLimit::max(MAX_IMAGE_BYTES / 3 * 4 + 1024);

    Router::new()
        .route("/health", get(health))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/github/callback", get(auth::github_callback))
        .route("/auth/oauth/google", post(auth::google_login))
        .route("/session", get(auth::current_session))
        // Users
        .route("/usernames/{candidate}", get(users::username_exists))
        .route("/users/{username}", get(users::get_profile))
        .route("/users/{username}/resume", put(users::update_resume))
        .route("/users/{username}/tags", get(users::list_tags))
        // Posts
        .route("/posts", post(posts::create_post))
        .route("/users/{username}/posts", get(posts::list_posts))
        .route(
            "/users/{username}/posts/{post_id}",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/users/{username}/posts/{post_id}/toc", get(posts::post_toc))
        // Comments
        .route(
            "/users/{username}/posts/{post_id}/comments",
            get(posts::list_comments).post(posts::create_comment),
        )
        .route(
            "/users/{username}/posts/{post_id}/comments/{comment_id}",
            axum::routing::delete(posts::delete_comment),
        )
        // Projects
        .route(
            "/users/{username}/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/users/{username}/projects/{project_id}",
            get(projects::get_project).delete(projects::delete_project),
        )
        .route("/github/users/{login}/repos", get(projects::list_github_repos))
        // Images
        .route(
            "/images",
            post(images::upload_image).layer(image_body_limit),
        )
        .route("/images/{name}", get(images::get_image))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/v1", api_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
