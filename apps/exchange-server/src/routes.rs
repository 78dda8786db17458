//! HTTP routes

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use crypto_session::{ChannelSession, CryptoError, SealedMessage};
use exchange_protocol::{
    DecodeRequest, DecodeResponse, EncodeRequest, Envelope, ExchangeResponse, PublicKeyRecord,
    SessionId, StatsResponse, WireSealedMessage, MAX_MESSAGE_SIZE,
};
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::ws;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/exchangeECDH", post(exchange_handler))
        .route("/decode", post(decode_handler))
        .route("/encode", post(encode_handler))
        .route("/sessions/{id}", delete(close_handler))
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .layer(DefaultBodyLimit::max(MAX_MESSAGE_SIZE))
        .with_state(state)
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Stats endpoint
async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.stats())
}

/// Answer a client's public key with ours and store the derived session
async fn exchange_handler(
    State(state): State<AppState>,
    payload: Result<Json<Envelope<PublicKeyRecord>>, JsonRejection>,
) -> ApiResult<Json<ExchangeResponse>> {
    let Json(Envelope { data: record }) = payload?;
    if let Err(e) = record.check_shape() {
        warn!("Rejected public key record: {}", e);
        return Err(ApiError::InvalidPublicKey(e.to_string()));
    }

    let session = ChannelSession::new_responder();
    let public_key = session.respond(&record)?;
    let session_id = state.insert(session).ok_or_else(|| {
        warn!("Session limit reached, refusing exchange");
        ApiError::TooManySessions
    })?;

    info!("Key exchange complete: session {}", session_id);
    Ok(Json(ExchangeResponse {
        session_id,
        public_key,
    }))
}

/// Open a message the client sealed
async fn decode_handler(
    State(state): State<AppState>,
    payload: Result<Json<Envelope<DecodeRequest>>, JsonRejection>,
) -> ApiResult<Json<DecodeResponse>> {
    let Json(Envelope { data: request }) = payload?;
    let session = state
        .session(&request.session_id)
        .ok_or(ApiError::SessionNotFound)?;

    let message = SealedMessage::from_wire(&request.message)?;
    let plaintext = session.open(&message).map_err(|e| {
        debug!("Open failed for session {}: {}", request.session_id, e);
        session_failure(&state, &request.session_id, e)
    })?;
    state.record_opened();

    let plaintext = String::from_utf8(plaintext).map_err(|_| ApiError::NotUtf8)?;
    info!(
        "Decrypted {} bytes for session {}",
        plaintext.len(),
        request.session_id
    );

    Ok(Json(DecodeResponse { plaintext }))
}

/// Seal a message for the client under the session's own nonce sequence
async fn encode_handler(
    State(state): State<AppState>,
    payload: Result<Json<Envelope<EncodeRequest>>, JsonRejection>,
) -> ApiResult<Json<WireSealedMessage>> {
    let Json(Envelope { data: request }) = payload?;
    let session = state
        .session(&request.session_id)
        .ok_or(ApiError::SessionNotFound)?;

    let sealed = session
        .seal(request.plaintext.as_bytes())
        .map_err(|e| session_failure(&state, &request.session_id, e))?;
    state.record_sealed();

    debug!("Sealed {} bytes for session {}", request.plaintext.len(), request.session_id);
    Ok(Json(sealed.to_wire()))
}

/// Map a session error; a session that hit a fatal error is dropped
fn session_failure(state: &AppState, id: &SessionId, err: CryptoError) -> ApiError {
    if err.is_fatal() {
        warn!("Closing session {} after fatal error: {}", id, err);
        state.close(id);
    }
    ApiError::from(err)
}

/// Close a session and drop its keys
async fn close_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> ApiResult<StatusCode> {
    if state.close(&id) {
        info!("Session {} closed by client", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound)
    }
}
