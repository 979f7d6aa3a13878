use crate::domain::ports::LedgerRef;
use crate::domain::request::RequestStatus;
use crate::error::{Result, UpgradeError};
use std::time::Duration;
use tokio::time::Instant;

/// What a bounded polling loop concluded. A request that outlives the
/// budget is unresolved, not failed: the callback may still land later and
/// resolve it out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Verified,
    Failed,
    Unresolved,
}

/// Read-only view of a ledger row's status for the initiating client.
/// Polling is free of side effects and may be repeated or abandoned at any
/// time.
pub struct StatusPoller {
    ledger: LedgerRef,
}

impl StatusPoller {
    pub fn new(ledger: LedgerRef) -> Self {
        Self { ledger }
    }

    /// Current status of the request behind `reference`. Pending is a
    /// normal answer; only a reference that never existed is an error.
    pub async fn poll(&self, reference: &str) -> Result<RequestStatus> {
        self.ledger
            .find_by_reference(reference)
            .await?
            .map(|request| request.status)
            .ok_or_else(|| UpgradeError::UnknownReference(reference.to_string()))
    }

    /// Polls at `interval` until the request resolves or `budget` elapses.
    pub async fn wait_for_terminal(
        &self,
        reference: &str,
        budget: Duration,
        interval: Duration,
    ) -> Result<PollOutcome> {
        let deadline = Instant::now() + budget;
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match self.poll(reference).await? {
                RequestStatus::Verified => return Ok(PollOutcome::Verified),
                RequestStatus::Failed => return Ok(PollOutcome::Failed),
                RequestStatus::Pending => {
                    if Instant::now() >= deadline {
                        return Ok(PollOutcome::Unresolved);
                    }
                }
            }
        }
    }
}
