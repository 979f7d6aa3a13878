use crate::config::MerchantConfig;
use crate::domain::account::Profile;
use crate::domain::package::{AccountTier, Catalog, Package};
use crate::domain::ports::{LedgerRef, ProfilesRef};
use crate::domain::request::{NewUpgradeRequest, RequestStatus, UpgradeRequest};
use crate::domain::validator::validate_confirmation;
use crate::error::{Result, UpgradeError};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Canonical form of a provider callback, produced by the per-provider
/// payload adapters before anything touches the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackEvent {
    pub reference: String,
    pub outcome: CallbackOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallbackOutcome {
    Success,
    Failure,
    /// An intermediate status some providers emit before settling.
    NonFinal,
}

/// What a callback reconciliation did. Duplicates and unknown references
/// are expected outcomes here, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    Upgraded {
        tier: AccountTier,
        daily_limit: u32,
    },
    /// The ledger row is verified but the account could not be upgraded;
    /// needs manual repair.
    VerifiedUnapplied,
    MarkedFailed,
    /// Another delivery or actor resolved the request first.
    AlreadyResolved,
    /// No pending row matches the reference.
    NoMatch,
    /// Non-final provider status; nothing to do yet.
    Acknowledged,
}

/// Result of a successful manual verification.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedUpgrade {
    pub tier: AccountTier,
    pub daily_limit: u32,
}

/// The single authority that moves ledger rows out of `pending` and applies
/// the tier change. Correct under any interleaving of duplicate callbacks,
/// manual attempts and polls: the atomic conditional transition (or, on the
/// manual path, the conditional insert) picks exactly one winner.
pub struct PaymentReconciler {
    ledger: LedgerRef,
    profiles: ProfilesRef,
    catalog: Arc<Catalog>,
    merchant: MerchantConfig,
}

impl PaymentReconciler {
    pub fn new(
        ledger: LedgerRef,
        profiles: ProfilesRef,
        catalog: Arc<Catalog>,
        merchant: MerchantConfig,
    ) -> Self {
        Self {
            ledger,
            profiles,
            catalog,
            merchant,
        }
    }

    /// Applies a provider callback. At-least-once, unordered and duplicated
    /// delivery is the norm: anything that cannot act (unknown reference,
    /// already-resolved row) is logged and acknowledged so the provider
    /// stops retrying.
    pub async fn reconcile_callback(&self, event: CallbackEvent) -> Result<ReconcileOutcome> {
        let Some(request) = self
            .ledger
            .find_pending_by_reference(&event.reference)
            .await?
        else {
            warn!(reference = %event.reference, "callback for unknown or resolved reference, ignoring");
            return Ok(ReconcileOutcome::NoMatch);
        };

        match event.outcome {
            CallbackOutcome::NonFinal => {
                info!(reference = %event.reference, "non-final provider status, leaving request pending");
                Ok(ReconcileOutcome::Acknowledged)
            }
            CallbackOutcome::Failure => {
                if self
                    .ledger
                    .transition(
                        &request.id,
                        RequestStatus::Pending,
                        RequestStatus::Failed,
                        Utc::now(),
                    )
                    .await?
                {
                    info!(reference = %event.reference, user_id = %request.user_id, "payment failed");
                    Ok(ReconcileOutcome::MarkedFailed)
                } else {
                    Ok(ReconcileOutcome::AlreadyResolved)
                }
            }
            CallbackOutcome::Success => {
                let won = self
                    .ledger
                    .transition(
                        &request.id,
                        RequestStatus::Pending,
                        RequestStatus::Verified,
                        Utc::now(),
                    )
                    .await?;
                if !won {
                    info!(reference = %event.reference, "request already resolved, duplicate delivery ignored");
                    return Ok(ReconcileOutcome::AlreadyResolved);
                }
                match self.apply_package(&request).await {
                    Some(package) => Ok(ReconcileOutcome::Upgraded {
                        tier: package.tier,
                        daily_limit: package.daily_limit,
                    }),
                    None => Ok(ReconcileOutcome::VerifiedUnapplied),
                }
            }
        }
    }

    /// Verifies a pasted confirmation SMS and upgrades synchronously: the
    /// message itself is the proof, so the ledger row is inserted directly
    /// in `verified` with no separate claim phase. The conditional insert
    /// doubles as the race guard for concurrent submissions of one code.
    pub async fn reconcile_message(
        &self,
        user_id: &str,
        package_name: &str,
        raw_message: &str,
    ) -> Result<AppliedUpgrade> {
        let package = self
            .catalog
            .lookup(package_name)
            .ok_or_else(|| UpgradeError::UnknownPackage(package_name.to_string()))?;

        let parsed =
            validate_confirmation(raw_message, Decimal::from(package.price), &self.merchant)?;

        // A transaction code is spendable once, globally: any row, any user,
        // any status, including failed.
        if self
            .ledger
            .find_by_reference(&parsed.transaction_code)
            .await?
            .is_some()
        {
            return Err(UpgradeError::ReferenceInUse(parsed.transaction_code));
        }

        let profile = self
            .profiles
            .get(user_id)
            .await?
            .unwrap_or_else(|| Profile::new(user_id));
        if profile.daily_survey_limit >= package.daily_limit {
            return Err(UpgradeError::QuotaAlreadyMet {
                current: profile.daily_survey_limit,
                requested: package.daily_limit,
            });
        }

        let request = self
            .ledger
            .create(NewUpgradeRequest {
                user_id: user_id.to_string(),
                package_name: package.name.clone(),
                amount: parsed.paid_amount,
                reference: parsed.transaction_code,
                status: RequestStatus::Verified,
            })
            .await?;

        info!(
            reference = %request.reference,
            user_id = %user_id,
            package = %package.name,
            amount = %request.amount,
            "confirmation message verified"
        );
        let _ = self.apply_package(&request).await;

        Ok(AppliedUpgrade {
            tier: package.tier,
            daily_limit: package.daily_limit,
        })
    }

    /// Upgrades the account for a request that just reached `verified`.
    ///
    /// The ledger is authoritative: if the account write fails the row stays
    /// verified and the gap is reported for manual repair rather than
    /// flapping the request back to pending.
    async fn apply_package(&self, request: &UpgradeRequest) -> Option<&Package> {
        let Some(package) = self.catalog.lookup(&request.package_name) else {
            error!(
                reference = %request.reference,
                package = %request.package_name,
                "verified request names an unknown package; account not upgraded, manual repair required"
            );
            return None;
        };
        if let Err(err) = self.profiles.apply_tier(&request.user_id, package).await {
            error!(
                reference = %request.reference,
                user_id = %request.user_id,
                error = %err,
                "ledger row verified but account upgrade failed; manual repair required"
            );
            return None;
        }
        info!(
            user_id = %request.user_id,
            tier = %package.tier,
            daily_limit = package.daily_limit,
            "account upgraded"
        );
        Some(package)
    }
}
