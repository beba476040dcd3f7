// In-memory entitlement store — HashMap keyed by user id, thread-safe via
// `tokio::sync::RwLock`. Implements the versioned compare-and-swap contract
// exactly as a database-backed store would, so it doubles as the reference
// semantics for tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use scan_quota_core::error::{StoreError, StoreResult};
use scan_quota_core::record::EntitlementRecord;
use scan_quota_core::store::{EntitlementStore, VersionedRecord};

type Records = HashMap<String, VersionedRecord>;

/// In-memory entitlement store. Data is lost when dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<Records>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records (for tests).
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Remove all records.
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

#[async_trait]
impl EntitlementStore for MemoryStore {
    async fn create(&self, record: EntitlementRecord) -> StoreResult<VersionedRecord> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.user_id) {
            return Err(StoreError::AlreadyExists);
        }
        let versioned = VersionedRecord { version: 1, record };
        records.insert(versioned.record.user_id.clone(), versioned.clone());
        Ok(versioned)
    }

    async fn load(&self, user_id: &str) -> StoreResult<Option<VersionedRecord>> {
        Ok(self.records.read().await.get(user_id).cloned())
    }

    async fn update(&self, expected_version: u64, record: EntitlementRecord) -> StoreResult<VersionedRecord> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.user_id) {
            None => Err(StoreError::NotFound),
            Some(existing) if existing.version != expected_version => Err(StoreError::VersionConflict),
            Some(existing) => {
                existing.version += 1;
                existing.record = record;
                Ok(existing.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use scan_quota_core::record::SubscriptionStatus;

    fn fresh_record(user_id: &str) -> EntitlementRecord {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        EntitlementRecord::new_trial(user_id, now, Duration::days(14))
    }

    #[tokio::test]
    async fn create_and_load() {
        let store = MemoryStore::new();
        let created = store.create(fresh_record("u1")).await.unwrap();
        assert_eq!(created.version, 1);

        let loaded = store.load("u1").await.unwrap().unwrap();
        assert_eq!(loaded.record.user_id, "u1");
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn create_rejects_duplicates() {
        let store = MemoryStore::new();
        store.create(fresh_record("u1")).await.unwrap();
        let err = store.create(fresh_record("u1")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[tokio::test]
    async fn load_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.load("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_bumps_version() {
        let store = MemoryStore::new();
        let created = store.create(fresh_record("u1")).await.unwrap();

        let mut record = created.record.clone();
        record.trial_scans_used = 1;
        let updated = store.update(created.version, record).await.unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.record.trial_scans_used, 1);
    }

    #[tokio::test]
    async fn stale_version_conflicts_and_writes_nothing() {
        let store = MemoryStore::new();
        let created = store.create(fresh_record("u1")).await.unwrap();

        let mut first = created.record.clone();
        first.trial_scans_used = 1;
        store.update(created.version, first).await.unwrap();

        // Second writer still holds version 1
        let mut stale = created.record.clone();
        stale.trial_scans_used = 99;
        let err = store.update(created.version, stale).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict));

        let current = store.load("u1").await.unwrap().unwrap();
        assert_eq!(current.record.trial_scans_used, 1);
        assert_eq!(current.version, 2);
    }

    #[tokio::test]
    async fn update_missing_record_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update(1, fresh_record("ghost")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_cas_loops_never_lose_increments() {
        let store = MemoryStore::new();
        store.create(fresh_record("u1")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let current = store.load("u1").await.unwrap().unwrap();
                    let mut record = current.record.clone();
                    record.trial_scans_used += 1;
                    match store.update(current.version, record).await {
                        Ok(_) => break,
                        Err(StoreError::VersionConflict) => continue,
                        Err(other) => panic!("unexpected store error: {other}"),
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let final_record = store.load("u1").await.unwrap().unwrap();
        assert_eq!(final_record.record.trial_scans_used, 16);
        assert_eq!(final_record.record.status, SubscriptionStatus::Trial);
        assert_eq!(final_record.version, 17);
    }
}
