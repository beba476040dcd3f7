// Entitlement store trait — the durability boundary of the engine.
//
// Every backend exposes optimistic concurrency: records carry a version, and
// `update` writes only if the stored version still matches the one the
// caller read. The service layers a bounded retry loop on top; the store
// itself never retries.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::record::EntitlementRecord;

/// A record together with its store version, the compare-and-swap token for
/// the next write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionedRecord {
    pub version: u64,
    pub record: EntitlementRecord,
}

/// Durable, per-user entitlement storage.
#[async_trait]
pub trait EntitlementStore: Send + Sync + fmt::Debug {
    /// Insert a fresh record. Fails with `AlreadyExists` if the user already
    /// has one.
    async fn create(&self, record: EntitlementRecord) -> StoreResult<VersionedRecord>;

    /// Load the record for a user, or `None` if never initialized.
    async fn load(&self, user_id: &str) -> StoreResult<Option<VersionedRecord>>;

    /// Conditionally replace the record keyed by `record.user_id`: succeeds
    /// only while the stored version equals `expected_version`, otherwise
    /// fails with `VersionConflict` and writes nothing.
    async fn update(&self, expected_version: u64, record: EntitlementRecord) -> StoreResult<VersionedRecord>;
}
