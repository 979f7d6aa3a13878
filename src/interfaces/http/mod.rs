//! HTTP surface: the client-facing payment endpoints and the inbound
//! provider callbacks. Handlers stay thin; everything of consequence lives
//! in the application services.

pub mod callbacks;

use crate::application::initiator::PaymentInitiator;
use crate::application::reconciler::PaymentReconciler;
use crate::application::status::StatusPoller;
use crate::domain::package::AccountTier;
use crate::domain::request::RequestStatus;
use crate::error::UpgradeError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub initiator: Arc<PaymentInitiator>,
    pub reconciler: Arc<PaymentReconciler>,
    pub poller: Arc<StatusPoller>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/payments/initiate", post(initiate_payment))
        .route("/api/payments/verify", post(verify_payment))
        .route("/api/payments/status/{reference}", get(payment_status))
        .route("/callbacks/payhero", post(callbacks::payhero_callback))
        .route("/callbacks/lipwa", post(callbacks::lipwa_callback))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct InitiateRequest {
    pub user_id: String,
    pub package_name: String,
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct InitiateResponse {
    pub success: bool,
    pub reference: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub user_id: String,
    pub package_name: String,
    pub mpesa_message: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub tier: AccountTier,
    pub daily_limit: u32,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub reference: String,
    pub status: RequestStatus,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Maps the domain error taxonomy onto HTTP statuses. Every rejection body
/// carries the specific reason, never a generic failure.
pub struct ApiError(UpgradeError);

impl From<UpgradeError> for ApiError {
    fn from(err: UpgradeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            UpgradeError::UnknownPackage(_) | UpgradeError::UnknownReference(_) => {
                StatusCode::NOT_FOUND
            }
            UpgradeError::InvalidPhoneNumber(_) | UpgradeError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            UpgradeError::ReferenceInUse(_) | UpgradeError::QuotaAlreadyMet { .. } => {
                StatusCode::CONFLICT
            }
            UpgradeError::Gateway(_) => StatusCode::BAD_GATEWAY,
            UpgradeError::Config(_) | UpgradeError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(ErrorBody {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

async fn initiate_payment(
    State(state): State<AppState>,
    Json(body): Json<InitiateRequest>,
) -> Result<Json<InitiateResponse>, ApiError> {
    let initiated = state
        .initiator
        .initiate(&body.user_id, &body.package_name, &body.phone_number)
        .await?;
    Ok(Json(InitiateResponse {
        success: true,
        reference: initiated.reference,
        message: initiated.message,
    }))
}

async fn verify_payment(
    State(state): State<AppState>,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let upgrade = state
        .reconciler
        .reconcile_message(&body.user_id, &body.package_name, &body.mpesa_message)
        .await?;
    Ok(Json(VerifyResponse {
        success: true,
        tier: upgrade.tier,
        daily_limit: upgrade.daily_limit,
        message: format!("Successfully upgraded to {}!", body.package_name),
    }))
}

async fn payment_status(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.poller.poll(&reference).await?;
    Ok(Json(StatusResponse { reference, status }))
}
