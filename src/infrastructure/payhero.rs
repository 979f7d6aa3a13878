use crate::config::GatewaySettings;
use crate::domain::ports::{PaymentGateway, PushPaymentAck, PushPaymentRequest};
use crate::error::{Result, UpgradeError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

/// Pay Hero STK-push client.
///
/// Acceptance here means the provider queued a PIN prompt on the payer's
/// device; the actual payment outcome arrives later on the callback URL.
pub struct PayHeroClient {
    http: reqwest::Client,
    settings: GatewaySettings,
    api_key: String,
    channel_id: u32,
}

#[derive(Serialize)]
struct PushBody<'a> {
    amount: u32,
    phone_number: &'a str,
    channel_id: u32,
    provider: &'static str,
    external_reference: &'a str,
    callback_url: &'a str,
}

impl PayHeroClient {
    pub fn new(settings: GatewaySettings, api_key: String, channel_id: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
            api_key,
            channel_id,
        }
    }
}

#[async_trait]
impl PaymentGateway for PayHeroClient {
    async fn push_payment(&self, request: PushPaymentRequest) -> Result<PushPaymentAck> {
        let body = PushBody {
            amount: request.amount,
            phone_number: &request.phone_number,
            channel_id: self.channel_id,
            provider: "m-pesa",
            external_reference: &request.external_reference,
            callback_url: &request.callback_url,
        };

        let response = self
            .http
            .post(format!("{}/api/v2/payments", self.settings.base_url))
            .header("Authorization", format!("Basic {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| UpgradeError::Gateway(format!("payment provider unreachable: {e}")))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| UpgradeError::Gateway(format!("unreadable provider response: {e}")))?;
        debug!(status = %status, payload = %payload, "push payment response");

        if !status.is_success() {
            let reason = payload
                .get("error_message")
                .and_then(Value::as_str)
                .unwrap_or("failed to initiate payment");
            error!(status = %status, reason = %reason, "push payment rejected");
            return Err(UpgradeError::Gateway(reason.to_string()));
        }

        Ok(PushPaymentAck {
            provider_reference: payload
                .get("CheckoutRequestID")
                .and_then(Value::as_str)
                .map(str::to_string),
            message: "STK push sent. Check your phone and enter your M-PESA PIN.".to_string(),
        })
    }
}

/// Placeholder gateway for deployments without provider credentials; the
/// manual verification path still works, push payments do not.
pub struct UnconfiguredGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredGateway {
    async fn push_payment(&self, _request: PushPaymentRequest) -> Result<PushPaymentAck> {
        Err(UpgradeError::Gateway(
            "payment service not configured".to_string(),
        ))
    }
}
