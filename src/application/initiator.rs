use crate::domain::package::Catalog;
use crate::domain::ports::{GatewayRef, LedgerRef, PushPaymentRequest};
use crate::domain::request::{NewUpgradeRequest, RequestStatus};
use crate::error::{Result, UpgradeError};
use regex::Regex;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::LazyLock;
use tracing::info;
use uuid::Uuid;

// Kenyan mobile numbers: local (07.., 01..) or international (2547.., 2541..)
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(07|01|2547|2541)[0-9]{7,8}$").expect("valid regex"));

/// Issues push-payment requests to the provider and opens the pending ledger
/// row the callback will later resolve.
pub struct PaymentInitiator {
    ledger: LedgerRef,
    gateway: GatewayRef,
    catalog: Arc<Catalog>,
    callback_url: String,
}

/// What the initiating client gets back; it then polls `reference` until a
/// terminal status or its patience runs out.
#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    pub reference: String,
    pub message: String,
}

impl PaymentInitiator {
    pub fn new(
        ledger: LedgerRef,
        gateway: GatewayRef,
        catalog: Arc<Catalog>,
        callback_url: String,
    ) -> Self {
        Self {
            ledger,
            gateway,
            catalog,
            callback_url,
        }
    }

    /// Prompts the user's phone for payment of the named package.
    ///
    /// A ledger row is created only after the provider accepts the push, so
    /// rejected or unreachable pushes are safe to retry; each attempt gets a
    /// fresh reference and cannot collide with a still-pending earlier one.
    pub async fn initiate(
        &self,
        user_id: &str,
        package_name: &str,
        phone_number: &str,
    ) -> Result<InitiatedPayment> {
        if !PHONE_RE.is_match(phone_number) {
            return Err(UpgradeError::InvalidPhoneNumber(phone_number.to_string()));
        }
        let package = self
            .catalog
            .lookup(package_name)
            .ok_or_else(|| UpgradeError::UnknownPackage(package_name.to_string()))?;

        let reference = format!("PINECOIN-{}-{}", user_id, Uuid::new_v4().simple());

        let ack = self
            .gateway
            .push_payment(PushPaymentRequest {
                amount: package.price,
                phone_number: phone_number.to_string(),
                external_reference: reference.clone(),
                callback_url: self.callback_url.clone(),
            })
            .await?;

        self.ledger
            .create(NewUpgradeRequest {
                user_id: user_id.to_string(),
                package_name: package.name.clone(),
                amount: Decimal::from(package.price),
                reference: reference.clone(),
                status: RequestStatus::Pending,
            })
            .await?;

        info!(
            reference = %reference,
            user_id = %user_id,
            package = %package.name,
            provider_reference = ?ack.provider_reference,
            "push payment accepted, awaiting callback"
        );

        Ok(InitiatedPayment {
            reference,
            message: ack.message,
        })
    }
}
