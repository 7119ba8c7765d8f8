use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::TokenKeys;
use crate::config::{MAX_BODY_BYTES, ServerConfig};
use crate::db::Database;
use crate::media::{LOCAL_URL_PREFIX, MediaStore};

pub mod errors;
pub mod form;
mod meetings;
pub mod session;
mod tasks;
mod users;

pub use errors::AppError;
pub use session::AuthUser;

/// Shared application state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub tokens: Arc<TokenKeys>,
    pub media: Arc<dyn MediaStore>,
}

impl AppState {
    pub fn new(db: Database, tokens: TokenKeys, media: Arc<dyn MediaStore>) -> Self {
        AppState {
            db: Arc::new(Mutex::new(db)),
            tokens: Arc::new(tokens),
            media,
        }
    }

    /// Lock the database. Never hold the guard across an `.await`.
    pub fn db(&self) -> Result<MutexGuard<'_, Database>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".into()))
    }
}

/// Drop repeated ids, keeping first occurrences in order.
fn dedupe_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Reject member lists that name users who do not exist.
fn ensure_users_exist(state: &AppState, ids: &[String]) -> Result<(), AppError> {
    let missing = state.db()?.missing_users(ids)?;
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Unknown members: {}",
            missing.join(", ")
        )))
    }
}

async fn index() -> &'static str {
    "Backend Server is Running"
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Route not found" })),
    )
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/data", get(users::data))
        .route("/update", put(users::update_profile))
        .route("/all", get(users::all))
}

fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(tasks::create))
        .route("/all", get(tasks::all))
        .route("/update/{taskId}", put(tasks::update))
        .route("/delete/{taskId}", delete(tasks::remove))
}

fn meeting_routes() -> Router<AppState> {
    Router::new()
        .route("/schedule", post(meetings::schedule))
        .route("/all", get(meetings::all))
        .route("/week", get(meetings::week))
        .route("/update/{meetingId}", put(meetings::update))
        .route("/delete/{meetingId}", delete(meetings::remove))
}

/// Build the axum router. `upload_dir`, when given, is served under `/uploads`.
pub fn create_router(state: AppState, upload_dir: Option<&Path>) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .nest("/api/user", user_routes())
        .nest("/api/task", task_routes())
        .nest("/api/meeting", meeting_routes())
        .fallback(not_found);

    if let Some(dir) = upload_dir {
        router = router.nest_service(LOCAL_URL_PREFIX, ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open and migrate the database, then run the API until Ctrl-C.
pub async fn serve(db_path: &Path, config: &ServerConfig) -> anyhow::Result<()> {
    let db = Database::open(db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    db.migrate().context("failed to migrate database")?;

    let media = config.media_store();
    let upload_dir: Option<PathBuf> = config.local_upload_dir().cloned();
    if let Some(dir) = &upload_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create upload directory {}", dir.display()))?;
    }

    tracing::info!(media = media.name(), db = %db_path.display(), "starting server");
    let state = AppState::new(db, config.token_keys(), media);
    let app = create_router(state, upload_dir.as_deref());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
