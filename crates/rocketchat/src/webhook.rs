//! HTTP ingress for Rocket.Chat outgoing webhooks.
//!
//! The provider enforces a short response budget on webhook calls, so the
//! POST handler validates, acknowledges with an empty ephemeral response,
//! and hands the rest of the pipeline to a detached task.

use {
    axum::{
        Json, Router,
        body::Bytes,
        extract::{Path, State},
        http::{HeaderMap, StatusCode, header},
        response::{IntoResponse, Response},
        routing::get,
    },
    secrecy::ExposeSecret,
    serde_json::json,
    tracing::{debug, warn},
};

use crate::{
    handlers::spawn_process,
    inbound::OutgoingWebhookPayload,
    state::WebhookState,
};

/// Service name reported by the health endpoint.
const SERVICE_NAME: &str = "pontoon-rocketchat";

/// Build the ingress router. The host mounts this wherever its route
/// registration puts channel webhooks.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route(
            "/hooks/rocketchat/{account_id}",
            get(verify_handler).post(inbound_handler),
        )
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Rocket.Chat probes the endpoint with a GET during webhook setup.
async fn verify_handler(Path(account_id): Path<String>) -> Response {
    debug!(account_id = %account_id, "webhook verification probe");
    (StatusCode::OK, "webhook is active").into_response()
}

async fn health_handler() -> Response {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "timestamp": timestamp,
    }))
    .into_response()
}

async fn inbound_handler(
    State(state): State<WebhookState>,
    Path(account_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let auth_token = {
        let accounts = state.accounts.read().unwrap_or_else(|e| e.into_inner());
        match accounts.get(&account_id) {
            // A cancelled account no longer accepts new requests, even if
            // its state entry is still visible.
            Some(account) if !account.cancel.is_cancelled() => {
                account.config.auth_token.expose_secret().clone()
            },
            _ => {
                warn!(account_id = %account_id, "webhook call for unknown or stopped account");
                return error_response(StatusCode::NOT_FOUND, "Unknown account");
            },
        }
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let payload = match parse_body(content_type, &body) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(account_id = %account_id, "webhook body rejected: {}", e.message());
            return error_response(StatusCode::BAD_REQUEST, e.message());
        },
    };

    if payload.token.as_deref() != Some(auth_token.as_str()) {
        warn!(account_id = %account_id, "webhook token mismatch");
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized: Invalid token");
    }

    if payload.user_id.is_none() || payload.text.is_none() {
        return error_response(StatusCode::BAD_REQUEST, "Bad Request: Missing user_id or text");
    }

    // Acknowledge now; everything slow happens on a detached task.
    spawn_process(state, account_id, payload);
    Json(json!({"text": "", "response_type": "ephemeral"})).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

// ── Body parsing ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyError {
    InvalidJson,
    InvalidForm,
    Unparseable,
}

impl BodyError {
    fn message(self) -> &'static str {
        match self {
            Self::InvalidJson => "Bad Request: Invalid JSON",
            Self::InvalidForm => "Bad Request: Invalid form body",
            Self::Unparseable => "Bad Request: Unparseable body",
        }
    }
}

/// Decode the webhook body per content-type. Unknown content-types fall
/// back to trying JSON, then a form body.
fn parse_body(content_type: Option<&str>, body: &[u8]) -> Result<OutgoingWebhookPayload, BodyError> {
    let media_type = content_type
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match media_type.as_str() {
        "application/json" => serde_json::from_slice(body).map_err(|_| BodyError::InvalidJson),
        "application/x-www-form-urlencoded" => parse_form(body),
        _ => serde_json::from_slice(body)
            .ok()
            .or_else(|| parse_form(body).ok())
            .ok_or(BodyError::Unparseable),
    }
}

/// Decode a form body. Rocket.Chat either form-encodes the fields directly
/// or wraps the JSON document in a single `payload` field.
fn parse_form(body: &[u8]) -> Result<OutgoingWebhookPayload, BodyError> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(body).into_owned().collect();

    if let Some((_, wrapped)) = pairs.iter().find(|(key, _)| key == "payload") {
        return serde_json::from_str(wrapped).map_err(|_| BodyError::InvalidJson);
    }

    if pairs.is_empty() {
        return Err(BodyError::InvalidForm);
    }
    let fields: serde_json::Map<String, serde_json::Value> = pairs
        .into_iter()
        .map(|(key, value)| (key, serde_json::Value::String(value)))
        .collect();
    serde_json::from_value(serde_json::Value::Object(fields)).map_err(|_| BodyError::InvalidForm)
}
