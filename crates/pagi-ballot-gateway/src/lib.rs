//! PAGI Ballot Gateway: mock auth API and the security-violation page.
//!
//! Implements the four `/api/auth/*` endpoints the ballot session talks to against an
//! in-memory voter registry (any registered EPIC id logs in with the demo OTP).

pub mod registry;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use pagi_ballot_core::session::{LoginRequest, RegistrationRequest, UserPatch};
use pagi_ballot_core::SECURITY_VIOLATION_ROUTE;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

pub use registry::{RegistryError, VoterRegistry, DEMO_EPIC_ID, DEMO_OTP};

pub struct AppState {
    pub registry: VoterRegistry,
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = match self {
            RegistryError::VoterNotFound => StatusCode::NOT_FOUND,
            RegistryError::InvalidOtp | RegistryError::Unauthorized => StatusCode::UNAUTHORIZED,
            RegistryError::AlreadyRegistered => StatusCode::CONFLICT,
            RegistryError::Invalid(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/verify", get(verify_handler))
        .route("/api/auth/profile", put(profile_handler))
        .route(SECURITY_VIOLATION_ROUTE, get(serve_security_violation))
        .with_state(state)
        .layer(axum::middleware::from_fn(log_ballot_traffic))
}

/// Serve until the listener fails. Connection info is required by the traffic log.
pub async fn serve(listener: tokio::net::TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

async fn log_ballot_traffic(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    tracing::info!(
        "[GATEWAY] {} {} from {}",
        request.method(),
        request.uri().path(),
        addr
    );
    next.run(request).await
}

fn bearer(headers: &HeaderMap) -> Result<&str, RegistryError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(RegistryError::Unauthorized)
}

async fn health() -> &'static str {
    "OK"
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, RegistryError> {
    let (token, user) = state.registry.login(&body.epic_id, &body.otp).map_err(|e| {
        tracing::info!("[GATEWAY] Login refused for {}: {}", body.epic_id.trim(), e);
        e
    })?;
    tracing::info!(
        "[GATEWAY] Voter {} logged in ({} active sessions)",
        user.id,
        state.registry.session_count()
    );
    Ok(Json(json!({ "token": token, "user": user })))
}

async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegistrationRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), RegistryError> {
    let profile = state.registry.register(&body)?;
    tracing::info!(
        "[GATEWAY] Registered voter {} in {}",
        profile.epic_id,
        profile.constituency
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Registration successful" })),
    ))
}

async fn verify_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, RegistryError> {
    let user = state.registry.verify(bearer(&headers)?)?;
    Ok(Json(json!({ "user": user })))
}

async fn profile_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(patch): Json<UserPatch>,
) -> Result<Json<serde_json::Value>, RegistryError> {
    let user = state.registry.update_profile(bearer(&headers)?, &patch)?;
    tracing::info!("[GATEWAY] Profile updated for {}", user.id);
    Ok(Json(json!({ "user": user })))
}

/// Escalation target: shown after a violation on a voting or admin route.
async fn serve_security_violation() -> Html<&'static str> {
    const PAGE: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/static/security-violation.html"
    ));
    Html(PAGE)
}
