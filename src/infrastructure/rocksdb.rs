use crate::domain::account::Profile;
use crate::domain::package::Package;
use crate::domain::ports::{ProfileStore, UpgradeLedger};
use crate::domain::request::{legal_transition, NewUpgradeRequest, RequestStatus, UpgradeRequest};
use crate::error::{Result, UpgradeError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for upgrade request rows, keyed by request id.
pub const CF_REQUESTS: &str = "upgrade_requests";
/// Column Family mapping a reference to the ids of its rows.
pub const CF_REQUEST_REFS: &str = "request_refs";
/// Column Family for account profiles, keyed by user id.
pub const CF_PROFILES: &str = "profiles";

/// Persistent ledger and profile store on RocksDB.
///
/// RocksDB has no conditional update, so every read-modify-write (create's
/// conflict check, the status transition, profile upserts) runs under a
/// single process-wide mutex. That is the same exclusion the in-memory
/// store gets from its write lock, at single-process scale.
///
/// This struct is thread-safe (`Clone` shares the underlying handles).
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = vec![
            ColumnFamilyDescriptor::new(CF_REQUESTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_REQUEST_REFS, Options::default()),
            ColumnFamilyDescriptor::new(CF_PROFILES, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cfs)
            .map_err(|e| UpgradeError::Storage(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| UpgradeError::Storage(format!("column family {name} not found")))
    }

    fn get_request(&self, id: &str) -> Result<Option<UpgradeRequest>> {
        let cf = self.cf(CF_REQUESTS)?;
        let bytes = self
            .db
            .get_cf(cf, id.as_bytes())
            .map_err(|e| UpgradeError::Storage(e.to_string()))?;
        bytes
            .map(|b| {
                serde_json::from_slice(&b)
                    .map_err(|e| UpgradeError::Storage(format!("corrupt request row: {e}")))
            })
            .transpose()
    }

    fn put_request(&self, request: &UpgradeRequest) -> Result<()> {
        let cf = self.cf(CF_REQUESTS)?;
        let value = serde_json::to_vec(request)
            .map_err(|e| UpgradeError::Storage(format!("serialize request: {e}")))?;
        self.db
            .put_cf(cf, request.id.as_bytes(), value)
            .map_err(|e| UpgradeError::Storage(e.to_string()))
    }

    fn ids_for_reference(&self, reference: &str) -> Result<Vec<String>> {
        let cf = self.cf(CF_REQUEST_REFS)?;
        let bytes = self
            .db
            .get_cf(cf, reference.as_bytes())
            .map_err(|e| UpgradeError::Storage(e.to_string()))?;
        match bytes {
            Some(b) => serde_json::from_slice(&b)
                .map_err(|e| UpgradeError::Storage(format!("corrupt reference index: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    fn rows_for_reference(&self, reference: &str) -> Result<Vec<UpgradeRequest>> {
        let mut rows = Vec::new();
        for id in self.ids_for_reference(reference)? {
            if let Some(row) = self.get_request(&id)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl UpgradeLedger for RocksDbStore {
    async fn create(&self, request: NewUpgradeRequest) -> Result<UpgradeRequest> {
        let _guard = self.write_lock.lock().await;

        let existing = self.rows_for_reference(&request.reference)?;
        let conflict = existing.iter().any(|row| {
            row.status == RequestStatus::Verified || request.status == RequestStatus::Verified
        });
        if conflict {
            return Err(UpgradeError::ReferenceInUse(request.reference));
        }

        let materialized = request.materialize(Utc::now());
        self.put_request(&materialized)?;

        let mut ids = self.ids_for_reference(&materialized.reference)?;
        ids.push(materialized.id.clone());
        let cf = self.cf(CF_REQUEST_REFS)?;
        let value = serde_json::to_vec(&ids)
            .map_err(|e| UpgradeError::Storage(format!("serialize reference index: {e}")))?;
        self.db
            .put_cf(cf, materialized.reference.as_bytes(), value)
            .map_err(|e| UpgradeError::Storage(e.to_string()))?;

        Ok(materialized)
    }

    async fn find_pending_by_reference(&self, reference: &str) -> Result<Option<UpgradeRequest>> {
        let mut pending: Vec<UpgradeRequest> = self
            .rows_for_reference(reference)?
            .into_iter()
            .filter(|r| r.status == RequestStatus::Pending)
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending.into_iter().next())
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<UpgradeRequest>> {
        let rows = self.rows_for_reference(reference)?;
        Ok(rows
            .into_iter()
            .max_by_key(|r| (r.status.precedence(), std::cmp::Reverse(r.created_at))))
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
        let _guard = self.write_lock.lock().await;

        let Some(mut row) = self.get_request(id)? else {
            return Ok(false);
        };
        if row.status != from {
            return Ok(false);
        }
        row.status = to;
        if to == RequestStatus::Verified {
            row.verified_at = Some(at);
        }
        self.put_request(&row)?;
        Ok(true)
    }
}

#[async_trait]
impl ProfileStore for RocksDbStore {
    async fn get(&self, user_id: &str) -> Result<Option<Profile>> {
        let cf = self.cf(CF_PROFILES)?;
        let bytes = self
            .db
            .get_cf(cf, user_id.as_bytes())
            .map_err(|e| UpgradeError::Storage(e.to_string()))?;
        bytes
            .map(|b| {
                serde_json::from_slice(&b)
                    .map_err(|e| UpgradeError::Storage(format!("corrupt profile: {e}")))
            })
            .transpose()
    }

    async fn upsert(&self, profile: Profile) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_PROFILES)?;
        let value = serde_json::to_vec(&profile)
            .map_err(|e| UpgradeError::Storage(format!("serialize profile: {e}")))?;
        self.db
            .put_cf(cf, profile.user_id.as_bytes(), value)
            .map_err(|e| UpgradeError::Storage(e.to_string()))
    }

    async fn apply_tier(&self, user_id: &str, package: &Package) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_PROFILES)?;
        let bytes = self
            .db
            .get_cf(cf, user_id.as_bytes())
            .map_err(|e| UpgradeError::Storage(e.to_string()))?;
        let mut profile: Profile = match bytes {
            Some(b) => serde_json::from_slice(&b)
                .map_err(|e| UpgradeError::Storage(format!("corrupt profile: {e}")))?,
            None => Profile::new(user_id),
        };
        profile.apply_upgrade(package);
        let value = serde_json::to_vec(&profile)
            .map_err(|e| UpgradeError::Storage(format!("serialize profile: {e}")))?;
        self.db
            .put_cf(cf, user_id.as_bytes(), value)
            .map_err(|e| UpgradeError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::package::{AccountTier, Catalog};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn new_request(reference: &str, status: RequestStatus) -> NewUpgradeRequest {
        NewUpgradeRequest {
            user_id: "user-1".to_string(),
            package_name: "Business Basic".to_string(),
            amount: dec!(200),
            reference: reference.to_string(),
            status,
        }
    }

    #[tokio::test]
    async fn test_open_creates_column_families() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).expect("failed to open RocksDB");

        assert!(store.db.cf_handle(CF_REQUESTS).is_some());
        assert!(store.db.cf_handle(CF_REQUEST_REFS).is_some());
        assert!(store.db.cf_handle(CF_PROFILES).is_some());
    }

    #[tokio::test]
    async fn test_create_and_find_round_trip() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        let created = store
            .create(new_request("R1", RequestStatus::Pending))
            .await
            .unwrap();
        let found = store
            .find_pending_by_reference("R1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, created);
        assert!(store.find_by_reference("R2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transition_survives_reopen() {
        let dir = tempdir().unwrap();
        let id = {
            let store = RocksDbStore::open(dir.path()).unwrap();
            let row = store
                .create(new_request("R1", RequestStatus::Pending))
                .await
                .unwrap();
            store
                .transition(&row.id, RequestStatus::Pending, RequestStatus::Verified, Utc::now())
                .await
                .unwrap();
            row.id
        };

        let store = RocksDbStore::open(dir.path()).unwrap();
        let row = store.find_by_reference("R1").await.unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.status, RequestStatus::Verified);
        assert!(row.verified_at.is_some());

        // The reference stays spent across restarts
        let err = store
            .create(new_request("R1", RequestStatus::Verified))
            .await
            .unwrap_err();
        assert!(matches!(err, UpgradeError::ReferenceInUse(_)));
    }

    #[tokio::test]
    async fn test_conditional_transition() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();
        let row = store
            .create(new_request("R1", RequestStatus::Pending))
            .await
            .unwrap();

        assert!(
            store
                .transition(&row.id, RequestStatus::Pending, RequestStatus::Verified, Utc::now())
                .await
                .unwrap()
        );
        assert!(
            !store
                .transition(&row.id, RequestStatus::Pending, RequestStatus::Verified, Utc::now())
                .await
                .unwrap()
        );
        assert!(
            !store
                .transition(&row.id, RequestStatus::Pending, RequestStatus::Failed, Utc::now())
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_profile_round_trip() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        assert!(ProfileStore::get(&store, "user-1").await.unwrap().is_none());
        let catalog = Catalog::builtin();
        store
            .apply_tier("user-1", catalog.lookup("Business Premium").unwrap())
            .await
            .unwrap();

        let profile = ProfileStore::get(&store, "user-1").await.unwrap().unwrap();
        assert_eq!(profile.account_tier, AccountTier::BusinessPremium);
        assert_eq!(profile.daily_survey_limit, 15);
    }
}
