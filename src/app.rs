use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::cookies::CSRF_HEADER;
use crate::config::{self, SecurityConfig};
use crate::database::Store;
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::{require_session, verify_csrf};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

/// Full application router with global middleware applied
pub fn app(state: AppState) -> Router {
    let config = config::config();

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Session required
        .merge(protected_routes(state.clone()))
        .fallback(not_found)
        // Global middleware
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer(&config.security))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(public::register))
        .route("/set-csrf-token", get(public::csrf_token))
        .route("/login", post(public::login))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{todo, todo_list};

    Router::new()
        // Account
        .route("/logout", post(protected::session_logout))
        .route("/user", get(protected::user_whoami))
        .route("/delete-user", delete(protected::user_delete))
        .route("/profile", get(protected::profile_get).put(protected::profile_put))
        // Todo lists
        .route("/todo-lists", get(todo_list::list))
        .route("/todo-list/", post(todo_list::create))
        .route(
            "/todo-list/:id",
            get(todo_list::get).put(todo_list::update).delete(todo_list::delete),
        )
        // Todos
        .route("/todo/", post(todo::create))
        .route("/todos/", get(todo::list))
        .route("/todo/:id/", get(todo::get).put(todo::update).delete(todo::delete))
        // Layers run bottom-up: the session is resolved before CSRF is checked
        .route_layer(middleware::from_fn(verify_csrf))
        .route_layer(middleware::from_fn_with_state(state, require_session))
}

/// Credentialed CORS for the configured origins. `*` mirrors the request
/// origin, since a wildcard cannot be combined with credentials.
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(CSRF_HEADER)])
        .allow_credentials(true);

    if !security.enable_cors {
        return layer;
    }

    if security.cors_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(AllowOrigin::mirror_request());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Todo API",
            "version": version,
            "description": "Multi-user todo list backend",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/register, /set-csrf-token, /login (public)",
                "account": "/logout, /user, /delete-user, /profile (protected)",
                "todo_lists": "/todo-lists, /todo-list/[:id] (protected)",
                "todos": "/todos/, /todo/[:id/] (protected)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "message": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}
