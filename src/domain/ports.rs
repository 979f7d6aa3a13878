use super::account::Profile;
use super::package::Package;
use super::request::{NewUpgradeRequest, RequestStatus, UpgradeRequest};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Durable record of every upgrade attempt, keyed by reference.
///
/// The ledger is the single source of truth for payment resolution; all
/// coordination between the initiating client, provider callbacks and the
/// polling client goes through it. No other locking exists anywhere.
#[async_trait]
pub trait UpgradeLedger: Send + Sync {
    /// Inserts a new request. Fails with `ReferenceInUse` when the reference
    /// already backs a verified row, or (when inserting directly in
    /// `verified`) when any row with that reference exists at all.
    /// A pending duplicate of a pending reference is tolerated; whichever
    /// row resolves first is authoritative.
    async fn create(&self, request: NewUpgradeRequest) -> Result<UpgradeRequest>;

    /// The row a provider callback correlates against. Returns `None` for
    /// unknown or already-resolved references.
    async fn find_pending_by_reference(&self, reference: &str) -> Result<Option<UpgradeRequest>>;

    /// Any-status lookup; when duplicate rows share the reference, the
    /// resolved one wins. Backs both the global transaction-code uniqueness
    /// check and the polling read path.
    async fn find_by_reference(&self, reference: &str) -> Result<Option<UpgradeRequest>>;

    /// Single atomic conditional update: set `status = to` (stamping
    /// `verified_at` when `to` is verified) only where `id` matches AND
    /// `status = from`. Returns `false` when no row changed: another actor
    /// already resolved the request, and the caller must not re-apply side
    /// effects.
    async fn transition(
        &self,
        id: &str,
        from: RequestStatus,
        to: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<bool>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<Profile>>;

    async fn upsert(&self, profile: Profile) -> Result<()>;

    /// Sets the tier fields from the package, creating a profile if none
    /// exists. The only account mutation this subsystem performs.
    async fn apply_tier(&self, user_id: &str, package: &Package) -> Result<()>;
}

/// Outbound push-payment request to the mobile-money provider.
#[derive(Debug, Clone)]
pub struct PushPaymentRequest {
    /// Whole Kenyan shillings, resolved from the package catalog.
    pub amount: u32,
    pub phone_number: String,
    /// Caller-generated correlating reference, echoed back in the callback.
    pub external_reference: String,
    pub callback_url: String,
}

/// Provider acceptance of a push-payment request. Acceptance means the
/// prompt was dispatched, not that payment succeeded; resolution arrives
/// later via callback.
#[derive(Debug, Clone)]
pub struct PushPaymentAck {
    pub provider_reference: Option<String>,
    pub message: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Asks the provider to prompt the payer's device. Rejections carry the
    /// provider's reason; no ledger row may exist for a rejected push.
    async fn push_payment(&self, request: PushPaymentRequest) -> Result<PushPaymentAck>;
}

pub type LedgerRef = Arc<dyn UpgradeLedger>;
pub type ProfilesRef = Arc<dyn ProfileStore>;
pub type GatewayRef = Arc<dyn PaymentGateway>;
