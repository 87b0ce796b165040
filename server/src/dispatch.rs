//! The request dispatcher (C3): routes the five HTTP endpoints, decodes
//! payloads, and wires the token-validation middleware in front of the
//! three authenticated routes.
//!
//! Router assembly follows the same `Router::new().route(...).with_state(...)`
//! shape as the teacher's `28-web-server-axum` lab; the one addition is
//! `route_layer` to scope the auth middleware to a subset of routes,
//! since `/token` itself must stay reachable without a token.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dead_drop_common::error::DeadDropError;
use dead_drop_common::wire::{AddKeyPayload, TokenRequestPayload};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::Authenticator;
use crate::store::ObjectStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ObjectStore>,
    pub auth: Arc<Authenticator>,
}

/// Wraps `DeadDropError` so the dispatcher can give it an `IntoResponse`
/// impl without violating the orphan rule (both the trait and the
/// error type live outside this crate).
struct ApiError(DeadDropError);

impl From<DeadDropError> for ApiError {
    fn from(err: DeadDropError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            DeadDropError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DeadDropError::Unauthorized => StatusCode::UNAUTHORIZED,
            DeadDropError::NotFound => StatusCode::NOT_FOUND,
            DeadDropError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, String::new()).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/d", post(drop_handler))
        .route("/d/:oid", get(pull_handler))
        .route("/add-key", post(add_key_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .merge(protected)
        .route("/token", post(token_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Token-validation middleware. Reads `Authorization` as-is (no
/// `Bearer ` prefix, per spec) and rejects with an empty 401 body
/// before the handler ever runs.
async fn require_token(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let Some(token) = token else {
        warn!("request missing Authorization header");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    if !state.auth.validate_token(&token) {
        warn!("request carried an invalid or expired token");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    next.run(req).await
}

/// `POST /d` — persists the request body and returns the new OID as
/// plain text.
async fn drop_handler(State(state): State<AppState>, body: Bytes) -> Result<String, ApiError> {
    let store = Arc::clone(&state.store);
    let bytes = body.to_vec();
    let oid = tokio::task::spawn_blocking(move || store.drop_object(&bytes))
        .await
        .map_err(|e| DeadDropError::internal(format!("drop task panicked: {e}")))??;
    Ok(oid)
}

/// `GET /d/{oid}` — returns the object's bytes, or 404 if absent.
async fn pull_handler(
    State(state): State<AppState>,
    Path(oid): Path<String>,
) -> Result<Vec<u8>, ApiError> {
    let store = Arc::clone(&state.store);
    let result = tokio::task::spawn_blocking(move || store.pull_object(&oid))
        .await
        .map_err(|e| DeadDropError::internal(format!("pull task panicked: {e}")))??;

    result.ok_or_else(|| ApiError(DeadDropError::NotFound))
}

/// `POST /add-key` — registers a caller's RSA public key under a name.
async fn add_key_handler(
    State(state): State<AppState>,
    Json(payload): Json<AddKeyPayload>,
) -> Result<StatusCode, ApiError> {
    state.auth.add_authorized_key(&payload.key_name, &payload.key)?;
    Ok(StatusCode::OK)
}

/// `POST /token` — unauthenticated. Mints a fresh token encrypted under
/// the named caller's registered public key.
async fn token_handler(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequestPayload>,
) -> Result<Response, ApiError> {
    let pem = state.auth.get_authorized_key(&payload.key_name)?;
    let ciphertext = state.auth.mint_token(&pem)?;

    let mut response = ciphertext.into_response();
    response
        .headers_mut()
        .insert(axum::http::header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    Ok(response)
}
