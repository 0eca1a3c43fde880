//! Axum app: shared state, router, and the ask/session handlers.
//!
//! Two ask entry points share one [`AskService`]: `POST /ask` runs a turn to
//! completion and returns the assembled answer, `GET /ask/stream` runs the
//! same graph and relays the wire events as SSE. Session CRUD reads through
//! the service's store.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tracing::error;

use ask_protocol::http::{
    AskRequest, AskResponse, MessageOut, RenameSessionRequest, SessionOut,
};
use nova::service::{AskError, AskService};
use nova::session::{Session, SessionStoreError, StoredMessage};

/// Shared state injected into every handler.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) service: AskService,
}

/// Builds the router with the ask and session routes.
///
/// The CORS layer is wide open; this server sits behind a local frontend in
/// development and a reverse proxy in deployment.
pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ask", post(ask))
        .route("/ask/stream", get(ask_stream))
        .route("/ask/sessions", get(list_sessions))
        .route(
            "/ask/sessions/:id",
            get(session_messages)
                .patch(rename_session)
                .delete(delete_session),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ErrorResponse = (StatusCode, Json<Value>);

fn store_error(err: SessionStoreError) -> ErrorResponse {
    match err {
        SessionStoreError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("session not found: {id}")})),
        ),
        SessionStoreError::Backend(message) => {
            error!(%message, "session store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": message})),
            )
        }
    }
}

fn ask_error(err: AskError) -> ErrorResponse {
    match err {
        AskError::Store(err) => store_error(err),
        AskError::Agent(err) => {
            error!(error = %err, "turn failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": err.to_string()})),
            )
        }
    }
}

fn session_out(session: Session) -> SessionOut {
    SessionOut {
        id: session.id,
        name: session.name,
        created_at: session.created_at.to_rfc3339(),
    }
}

fn message_out(row: StoredMessage) -> MessageOut {
    MessageOut {
        id: row.id,
        role: row.role.as_str().to_string(),
        content: row.content,
        created_at: row.created_at.to_rfc3339(),
    }
}

async fn health() -> Json<Value> {
    Json(json!({"message": "working"}))
}

async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ErrorResponse> {
    state
        .service
        .ask(&request.query, request.session_id.as_deref())
        .await
        .map(Json)
        .map_err(ask_error)
}

async fn ask_stream(
    State(state): State<AppState>,
    Query(request): Query<AskRequest>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events = state
        .service
        .ask_stream(request.query, request.session_id)
        .map(|event| Event::default().json_data(&event));
    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionOut>>, ErrorResponse> {
    let sessions = state.service.store().list().await.map_err(store_error)?;
    Ok(Json(sessions.into_iter().map(session_out).collect()))
}

async fn session_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MessageOut>>, ErrorResponse> {
    let rows = state
        .service
        .store()
        .messages(&id)
        .await
        .map_err(store_error)?;
    Ok(Json(rows.into_iter().map(message_out).collect()))
}

async fn rename_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RenameSessionRequest>,
) -> Result<Json<SessionOut>, ErrorResponse> {
    // Surrounding whitespace never reaches the store; an all-whitespace
    // name persists as empty, same as an empty one.
    let session = state
        .service
        .store()
        .set_name(&id, body.name.trim())
        .await
        .map_err(store_error)?;
    Ok(Json(session_out(session)))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ErrorResponse> {
    state
        .service
        .store()
        .delete(&id)
        .await
        .map_err(store_error)?;
    Ok(Json(json!({"message": "Session deleted."})))
}
