//! Inbound provider callbacks.
//!
//! No two providers share a payload shape, so each gets a thin adapter that
//! maps its fields into one canonical `CallbackEvent` before the reconciler
//! sees it. Callbacks are unauthenticated at the transport level; trust
//! comes from matching a live pending reference in the ledger. Whatever the
//! reconciliation outcome, the provider gets a success response so it stops
//! retrying; only a payload without its correlating reference is a 400.

use super::{AppState, ErrorBody};
use crate::application::reconciler::{CallbackEvent, CallbackOutcome};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub success: bool,
}

/// Pay Hero settles in two steps but calls back only on the final one:
/// `paymentSuccess` (or `status: "SUCCESS"`) decides the outcome, and the
/// reference we generated comes back under one of two spellings.
#[derive(Debug, Deserialize)]
pub struct PayHeroCallback {
    #[serde(rename = "paymentSuccess", default)]
    payment_success: Option<bool>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    external_reference: Option<String>,
    #[serde(rename = "ExternalReference", default)]
    external_reference_alt: Option<String>,
}

impl PayHeroCallback {
    pub fn into_event(self) -> Option<CallbackEvent> {
        let reference = self.external_reference.or(self.external_reference_alt)?;
        let success =
            self.payment_success == Some(true) || self.status.as_deref() == Some("SUCCESS");
        Some(CallbackEvent {
            reference,
            outcome: if success {
                CallbackOutcome::Success
            } else {
                CallbackOutcome::Failure
            },
        })
    }
}

/// Lipwa correlates on its own checkout id and emits intermediate statuses
/// before settling on `payment.success` or `payment.failed`.
#[derive(Debug, Deserialize)]
pub struct LipwaCallback {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    checkout_id: Option<String>,
}

impl LipwaCallback {
    pub fn into_event(self) -> Option<CallbackEvent> {
        let reference = self.checkout_id?;
        let outcome = match self.status.as_deref() {
            Some("payment.success") => CallbackOutcome::Success,
            Some("payment.failed") => CallbackOutcome::Failure,
            _ => CallbackOutcome::NonFinal,
        };
        Some(CallbackEvent { reference, outcome })
    }
}

pub async fn payhero_callback(
    State(state): State<AppState>,
    Json(payload): Json<PayHeroCallback>,
) -> Response {
    let Some(event) = payload.into_event() else {
        return missing_reference("external_reference");
    };
    acknowledge(&state, event).await
}

pub async fn lipwa_callback(
    State(state): State<AppState>,
    Json(payload): Json<LipwaCallback>,
) -> Response {
    let Some(event) = payload.into_event() else {
        return missing_reference("checkout_id");
    };
    acknowledge(&state, event).await
}

fn missing_reference(field: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: format!("missing {field}"),
        }),
    )
        .into_response()
}

async fn acknowledge(state: &AppState, event: CallbackEvent) -> Response {
    match state.reconciler.reconcile_callback(event).await {
        Ok(_) => (StatusCode::OK, Json(CallbackAck { success: true })).into_response(),
        Err(err) => {
            error!(error = %err, "callback reconciliation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}
