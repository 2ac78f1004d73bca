/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use task_service_api::{app::{build_router, AppState}, config::Config};
/// use task_service_shared::repository::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config)?;
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;
use std::time::Instant;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use task_service_shared::password::{PasswordError, PasswordHasher};
use task_service_shared::repository::Store;
use task_service_shared::services::{TaskService, UserService};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::Config;
use crate::middleware::rate_limit::{rate_limit_layer, RateLimiter};
use crate::routes;

/// Shared application state
///
/// Cloned for each request via Axum's `State` extractor; every field is
/// cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub tasks: TaskService,

    pub users: UserService,

    /// Backend used for health checks
    pub store: Arc<dyn Store>,

    pub config: Arc<Config>,

    pub rate_limiter: Arc<RateLimiter>,

    /// When the state was built, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Wires both services to `store`
    ///
    /// # Errors
    ///
    /// Returns an error if the configured password hashing costs are invalid.
    pub fn new<S>(store: Arc<S>, config: Config) -> Result<Self, PasswordError>
    where
        S: Store + 'static,
    {
        let hasher = PasswordHasher::new(&config.password)?;

        let tasks = TaskService::new(store.clone(), store.clone());
        let users = UserService::new(store.clone(), store.clone(), hasher);

        tracing::debug!(backend = store.backend(), "Application state created");

        Ok(Self {
            tasks,
            users,
            store,
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
            config: Arc::new(config),
            started_at: Instant::now(),
        })
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /health
/// ├── GET  /info
/// └── /api/v1/                      (rate limited)
///     ├── GET    /tasks
///     ├── GET    /tasks/:id
///     ├── POST   /task
///     ├── DELETE /task/:id
///     ├── GET    /user/:username     tasks owned by username
///     ├── POST   /user
///     ├── GET    /users
///     ├── GET    /users/:username
///     ├── DELETE /users/:id
///     ├── PUT    /:id                task patch
///     └── POST   /:username/roles
/// ```
///
/// Routes sharing a position use one parameter name (`:key`), which the
/// router requires; handlers parse it as an id or a username.
///
/// Static segments win over `:key`, so `/user/roles`, `/users/roles` and
/// `/task/roles` never reach `assign_roles`: users named `user`, `users` or
/// `task` cannot have roles assigned over HTTP (405). Names that merely
/// share a prefix, such as `tasker`, route normally.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/tasks", get(routes::tasks::list_tasks))
        .route("/tasks/:id", get(routes::tasks::get_task))
        .route("/task", post(routes::tasks::create_task))
        .route("/task/:id", axum::routing::delete(routes::tasks::delete_task))
        .route("/user/:username", get(routes::tasks::list_tasks_by_owner))
        .route("/user", post(routes::users::create_user))
        .route("/users", get(routes::users::list_users))
        .route(
            "/users/:key",
            get(routes::users::find_by_username).delete(routes::users::delete_user),
        )
        .route("/:key", put(routes::tasks::update_task))
        .route("/:key/roles", post(routes::users::assign_roles))
        .layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit_layer));

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/info", get(routes::info::info))
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(cors),
        )
        .with_state(state)
}
