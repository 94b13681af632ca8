//! HTTP request handlers

use super::types::{ErrorResponse, InboundMessageForm};
use super::AppState;
use crate::runtime::InboundOutcome;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Twilio inbound message callback
        .route("/whatsapp-webhook", post(whatsapp_webhook))
        // Version
        .route("/version", get(get_version))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================
// Inbound Messages
// ============================================================

/// Replies go out through the sender, so Twilio only gets an empty 200.
/// A 500 tells Twilio to redeliver.
async fn whatsapp_webhook(
    State(state): State<AppState>,
    Form(form): Form<InboundMessageForm>,
) -> Result<StatusCode, AppError> {
    let outcome = state
        .engine
        .handle_inbound(&form.from, &form.body)
        .await
        .map_err(|e| {
            tracing::error!(from = %form.from, error = %e, "Failed to store conversation");
            AppError::Internal("storage unavailable".to_string())
        })?;

    match outcome {
        InboundOutcome::Welcomed => {
            tracing::info!(from = %form.from, "Welcomed new subscriber");
        }
        InboundOutcome::Advanced { state } => {
            tracing::debug!(from = %form.from, state = %state, "Inbound message processed");
        }
        InboundOutcome::Dropped { reason } => {
            tracing::warn!(from = %form.from, reason = %reason, "Inbound message dropped");
        }
    }

    Ok(StatusCode::OK)
}

async fn get_version() -> &'static str {
    concat!("dropzone-bot ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
