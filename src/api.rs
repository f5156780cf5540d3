//! REST API Server for the intent chatbot
//!
//! Exposes conversational turns and per-session history over HTTP.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::conversational::Chatbot;
use crate::memory::SessionHistory;
use crate::models::Interaction;

/// =============================
/// Request / Response Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: Uuid,
    pub response: String,
    pub timestamp: String,
    pub end_of_session: bool,
    pub logged: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryReply {
    pub session_id: Uuid,
    pub interactions: Vec<Interaction>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

type SessionMap = HashMap<Uuid, Arc<Mutex<SessionHistory>>>;

/// Sessions idle longer than this are dropped when new sessions open
pub const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: i64 = 30 * 60;
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Clone)]
pub struct ApiState {
    pub chatbot: Arc<Chatbot>,
    sessions: Arc<RwLock<SessionMap>>,
    max_sessions: usize,
    idle_timeout: chrono::Duration,
}

impl ApiState {
    pub fn new(chatbot: Arc<Chatbot>) -> Self {
        Self {
            chatbot,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_timeout: chrono::Duration::seconds(DEFAULT_SESSION_IDLE_TIMEOUT_SECS),
        }
    }

    pub fn with_session_limits(mut self, max_sessions: usize, idle_timeout: chrono::Duration) -> Self {
        self.max_sessions = max_sessions.max(1);
        self.idle_timeout = idle_timeout;
        self
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn session(&self, session_id: Uuid) -> Arc<Mutex<SessionHistory>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(&session_id) {
                return session.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(&session_id) {
            self.prune(&mut sessions);
        }
        sessions
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(SessionHistory::with_id(session_id))))
            .clone()
    }

    /// Drop idle sessions, then the least recently used ones until a new
    /// session fits. Sessions with a turn in flight are locked and skipped.
    fn prune(&self, sessions: &mut SessionMap) {
        let cutoff = chrono::Utc::now() - self.idle_timeout;

        let mut idle: Vec<(Uuid, chrono::DateTime<chrono::Utc>)> = sessions
            .iter()
            .filter_map(|(id, session)| {
                session.try_lock().ok().map(|history| (*id, history.updated_at))
            })
            .collect();
        idle.sort_by_key(|(_, updated_at)| *updated_at);

        let mut evicted = 0;
        for (id, updated_at) in idle {
            if updated_at >= cutoff && sessions.len() < self.max_sessions {
                break;
            }
            sessions.remove(&id);
            evicted += 1;
        }

        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "Pruned chat sessions");
        }
    }

    async fn end_session(&self, session_id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&session_id);
        match removed {
            Some(session) => {
                session.lock().await.clear();
                info!(session_id = %session_id, "Session ended");
                true
            }
            None => false,
        }
    }
}

/// =============================
/// Helpers: Session Ids
/// =============================

fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

fn resolve_session_id(value: Option<&str>) -> Uuid {
    match value {
        Some(v) if !v.trim().is_empty() => {
            Uuid::parse_str(v).unwrap_or_else(|_| stable_uuid_from_string(v))
        }
        _ => Uuid::new_v4(),
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Message must not be empty".into())),
        );
    }

    let session_id = resolve_session_id(req.session_id.as_deref());
    let session = state.session(session_id).await;

    // Held for the whole turn so history order equals completion order
    let mut history = session.lock().await;
    let result = state.chatbot.converse(&req.message, &mut history).await;
    drop(history);

    match result {
        Ok(outcome) => {
            if outcome.end_of_session {
                state.end_session(session_id).await;
            }
            info!(
                session_id = %session_id,
                end_of_session = outcome.end_of_session,
                "Chat turn complete"
            );
            let logged = outcome.logged();
            (
                StatusCode::OK,
                Json(ApiResponse::success(ChatReply {
                    session_id,
                    response: outcome.interaction.response,
                    timestamp: outcome.interaction.timestamp,
                    end_of_session: outcome.end_of_session,
                    logged,
                })),
            )
        }
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Chat turn failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Chatbot failed: {}", e))),
            )
        }
    }
}

/// =============================
/// Session Endpoints
/// =============================

async fn history_handler(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let session_id = resolve_session_id(Some(&session_id));

    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(&session_id).cloned()
    };

    let interactions = match session {
        Some(session) => session.lock().await.interactions().to_vec(),
        None => Vec::new(),
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(HistoryReply {
            session_id,
            interactions,
        })),
    )
}

async fn end_session_handler(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let session_id = resolve_session_id(Some(&session_id));

    if state.end_session(session_id).await {
        (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({ "session_id": session_id }))),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Session {} not found", session_id))),
        )
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(chatbot: Arc<Chatbot>) -> Router {
    router_with_state(ApiState::new(chatbot))
}

pub fn router_with_state(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/sessions/:session_id/history", get(history_handler))
        .route(
            "/api/sessions/:session_id",
            axum::routing::delete(end_session_handler),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    chatbot: Arc<Chatbot>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(chatbot);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryLogStore;
    use crate::conversational::test_support;
    use crate::models::FALLBACK_RESPONSE;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn router() -> Router {
        create_router(Arc::new(test_support::chatbot(Arc::new(InMemoryLogStore::new()))))
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, ApiResponse) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn chat(session_id: &str, message: &str) -> Request<Body> {
        let body = serde_json::json!({ "session_id": session_id, "message": message });
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_stable_session_ids() {
        assert_eq!(
            resolve_session_id(Some("alice")),
            resolve_session_id(Some("alice"))
        );
        assert_ne!(
            resolve_session_id(Some("alice")),
            resolve_session_id(Some("bob"))
        );
        let id = Uuid::new_v4();
        assert_eq!(resolve_session_id(Some(&id.to_string())), id);
    }

    #[tokio::test]
    async fn test_health() {
        let router = router();
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_chat_and_history() {
        let router = router();

        let (status, reply) = send(&router, chat("alice", "Hello")).await;
        assert_eq!(status, StatusCode::OK);
        let reply: ChatReply = serde_json::from_value(reply.data.unwrap()).unwrap();
        assert!(["Hi there!", "Hello!"].contains(&reply.response.as_str()));
        assert!(reply.logged);

        let (_, reply) = send(&router, chat("alice", "what's the weather")).await;
        let reply: ChatReply = serde_json::from_value(reply.data.unwrap()).unwrap();
        assert_eq!(reply.response, FALLBACK_RESPONSE);

        let request = Request::builder()
            .uri("/api/sessions/alice/history")
            .body(Body::empty())
            .unwrap();
        let (status, history) = send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        let history: HistoryReply = serde_json::from_value(history.data.unwrap()).unwrap();
        let inputs: Vec<_> = history.interactions.iter().map(|i| i.user_input.as_str()).collect();
        assert_eq!(inputs, vec!["Hello", "what's the weather"]);
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let router = router();
        let (status, reply) = send(&router, chat("alice", "   ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!reply.success);
    }

    fn anonymous_chat(message: &str) -> Request<Body> {
        let body = serde_json::json!({ "message": message });
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn state() -> ApiState {
        ApiState::new(Arc::new(test_support::chatbot(Arc::new(InMemoryLogStore::new()))))
    }

    async fn history_inputs(router: &Router, session: &str) -> Vec<String> {
        let request = Request::builder()
            .uri(format!("/api/sessions/{}/history", session))
            .body(Body::empty())
            .unwrap();
        let (_, reply) = send(router, request).await;
        let history: HistoryReply = serde_json::from_value(reply.data.unwrap()).unwrap();
        history.interactions.into_iter().map(|i| i.user_input).collect()
    }

    #[tokio::test]
    async fn test_end_session() {
        let router = router();
        send(&router, chat("bob", "hello")).await;

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri("/api/sessions/bob")
                .body(Body::empty())
                .unwrap()
        };
        let (status, _) = send(&router, delete()).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&router, delete()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_farewell_starts_fresh_session() {
        let state = state();
        let router = router_with_state(state.clone());

        let (_, reply) = send(&router, chat("bob", "bye")).await;
        let reply: ChatReply = serde_json::from_value(reply.data.unwrap()).unwrap();
        assert!(reply.end_of_session);
        assert_eq!(state.session_count().await, 0);

        send(&router, chat("bob", "hello")).await;
        assert_eq!(history_inputs(&router, "bob").await, vec!["hello"]);
    }

    #[tokio::test]
    async fn test_anonymous_sessions_are_bounded() {
        let state = state().with_session_limits(2, chrono::Duration::hours(1));
        let router = router_with_state(state.clone());

        for _ in 0..5 {
            let (status, _) = send(&router, anonymous_chat("hello")).await;
            assert_eq!(status, StatusCode::OK);
        }

        assert_eq!(state.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_eviction_keeps_most_recent_session() {
        let state = state().with_session_limits(1, chrono::Duration::hours(1));
        let router = router_with_state(state.clone());

        send(&router, chat("alice", "hello")).await;
        send(&router, chat("carol", "thanks")).await;

        assert_eq!(state.session_count().await, 1);
        assert!(history_inputs(&router, "alice").await.is_empty());
        assert_eq!(history_inputs(&router, "carol").await, vec!["thanks"]);
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let state = state().with_session_limits(100, chrono::Duration::seconds(-1));
        let router = router_with_state(state.clone());

        for _ in 0..3 {
            send(&router, anonymous_chat("hello")).await;
        }

        assert_eq!(state.session_count().await, 1);
    }
}
