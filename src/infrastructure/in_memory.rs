use crate::domain::account::Profile;
use crate::domain::package::Package;
use crate::domain::ports::{ProfileStore, UpgradeLedger};
use crate::domain::request::{legal_transition, NewUpgradeRequest, RequestStatus, UpgradeRequest};
use crate::error::{Result, UpgradeError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory ledger keyed by request id.
///
/// The write lock scopes every conditional mutation, so the create conflict
/// check and the status transition are atomic with respect to each other.
/// Ideal for tests and single-process deployments without persistence.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    rows: Arc<RwLock<HashMap<String, UpgradeRequest>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

/// Of the rows sharing a reference, the authoritative one: resolved beats
/// pending, earliest creation breaks ties.
fn authoritative<'a, I>(rows: I) -> Option<&'a UpgradeRequest>
where
    I: Iterator<Item = &'a UpgradeRequest>,
{
    rows.max_by_key(|r| (r.status.precedence(), std::cmp::Reverse(r.created_at)))
}

#[async_trait]
impl UpgradeLedger for InMemoryLedger {
    async fn create(&self, request: NewUpgradeRequest) -> Result<UpgradeRequest> {
        let mut rows = self.rows.write().await;
        let conflict = rows.values().any(|row| {
            row.reference == request.reference
                && (row.status == RequestStatus::Verified
                    || request.status == RequestStatus::Verified)
        });
        if conflict {
            return Err(UpgradeError::ReferenceInUse(request.reference));
        }
        let materialized = request.materialize(Utc::now());
        rows.insert(materialized.id.clone(), materialized.clone());
        Ok(materialized)
    }

    async fn find_pending_by_reference(&self, reference: &str) -> Result<Option<UpgradeRequest>> {
        let rows = self.rows.read().await;
        let mut pending: Vec<&UpgradeRequest> = rows
            .values()
            .filter(|r| r.reference == reference && r.status == RequestStatus::Pending)
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending.first().map(|r| (*r).clone()))
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<UpgradeRequest>> {
        let rows = self.rows.read().await;
        Ok(authoritative(rows.values().filter(|r| r.reference == reference)).cloned())
    }

    async fn transition(
        &self,
        id: &str,
        from: RequestStatus,
        to: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        if !legal_transition(from, to) {
            return Ok(false);
        }
        let mut rows = self.rows.write().await;
        match rows.get_mut(id) {
            Some(row) if row.status == from => {
                row.status = to;
                if to == RequestStatus::Verified {
                    row.verified_at = Some(at);
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// A thread-safe in-memory profile store.
#[derive(Default, Clone)]
pub struct InMemoryProfileStore {
    profiles: Arc<RwLock<HashMap<String, Profile>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, user_id: &str) -> Result<Option<Profile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(user_id).cloned())
    }

    async fn upsert(&self, profile: Profile) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.user_id.clone(), profile);
        Ok(())
    }

    async fn apply_tier(&self, user_id: &str, package: &Package) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .entry(user_id.to_string())
            .or_insert_with(|| Profile::new(user_id));
        profile.apply_upgrade(package);
        Ok(())
    }
}
