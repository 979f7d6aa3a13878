use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Verified,
    Failed,
}

impl RequestStatus {
    /// `pending` is the only non-terminal state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    /// Resolution precedence when duplicate rows share a reference: a
    /// verified row wins over a failed one, which wins over a pending one.
    pub(crate) fn precedence(self) -> u8 {
        match self {
            RequestStatus::Verified => 2,
            RequestStatus::Failed => 1,
            RequestStatus::Pending => 0,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Verified => "verified",
            RequestStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The only legal status changes: a pending request resolves exactly once.
pub fn legal_transition(from: RequestStatus, to: RequestStatus) -> bool {
    matches!(
        (from, to),
        (RequestStatus::Pending, RequestStatus::Verified)
            | (RequestStatus::Pending, RequestStatus::Failed)
    )
}

/// One upgrade attempt in the ledger.
///
/// `reference` is the idempotency key correlating an initiated payment, its
/// provider callback and this row: either the reference sent to the provider
/// (push path) or the transaction code extracted from a confirmation SMS
/// (manual path). At most one row per reference ever reaches `verified`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeRequest {
    pub id: String,
    pub user_id: String,
    pub package_name: String,
    pub amount: Decimal,
    pub reference: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

/// Insert payload for the ledger; `id` and `created_at` are assigned on
/// insert.
#[derive(Debug, Clone)]
pub struct NewUpgradeRequest {
    pub user_id: String,
    pub package_name: String,
    pub amount: Decimal,
    pub reference: String,
    pub status: RequestStatus,
}

impl NewUpgradeRequest {
    pub fn materialize(self, now: DateTime<Utc>) -> UpgradeRequest {
        let verified_at = (self.status == RequestStatus::Verified).then_some(now);
        UpgradeRequest {
            id: Uuid::new_v4().to_string(),
            user_id: self.user_id,
            package_name: self.package_name,
            amount: self.amount,
            reference: self.reference,
            status: self.status,
            created_at: now,
            verified_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_request(status: RequestStatus) -> NewUpgradeRequest {
        NewUpgradeRequest {
            user_id: "user-1".to_string(),
            package_name: "Business Basic".to_string(),
            amount: dec!(200),
            reference: "R1".to_string(),
            status,
        }
    }

    #[test]
    fn test_legal_transitions() {
        use RequestStatus::*;
        assert!(legal_transition(Pending, Verified));
        assert!(legal_transition(Pending, Failed));
        assert!(!legal_transition(Verified, Failed));
        assert!(!legal_transition(Failed, Verified));
        assert!(!legal_transition(Verified, Pending));
        assert!(!legal_transition(Pending, Pending));
    }

    #[test]
    fn test_materialize_pending_has_no_verified_at() {
        let req = new_request(RequestStatus::Pending).materialize(Utc::now());
        assert_eq!(req.status, RequestStatus::Pending);
        assert!(req.verified_at.is_none());
        assert!(!req.id.is_empty());
    }

    #[test]
    fn test_materialize_verified_stamps_verified_at() {
        let now = Utc::now();
        let req = new_request(RequestStatus::Verified).materialize(now);
        assert_eq!(req.verified_at, Some(now));
        assert_eq!(req.created_at, now);
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(
            serde_json::to_string(&RequestStatus::Verified).unwrap(),
            "\"verified\""
        );
        let status: RequestStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(status, RequestStatus::Pending);
    }
}
