// Error taxonomy for the quota engine.
//
// Every user-facing error carries a stable string code so callers can branch
// on the exact kind (show an upgrade prompt, retry with backoff, etc.)
// without matching on display text. Store-level failures map into the
// user-facing enums via `From`, and a version conflict is never surfaced as
// quota exhaustion.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures raised by an [`EntitlementStore`](crate::store::EntitlementStore)
/// backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("entitlement record not found")]
    NotFound,

    #[error("entitlement record already exists")]
    AlreadyExists,

    /// The conditional write lost a race; the caller reloads and retries.
    #[error("record version conflict")]
    VersionConflict,

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Failures surfaced by quota reads and consumption.
#[derive(Debug, Clone, Error)]
pub enum QuotaError {
    /// The gate denied at consumption time. Recoverable by waiting for the
    /// next billing window or upgrading.
    #[error("scan quota exceeded for the current billing window")]
    QuotaExceeded,

    /// No entitlement record exists for the user. A setup bug, distinct
    /// from quota exhaustion.
    #[error("no entitlement record exists for this user")]
    SubscriptionNotInitialized,

    /// A paid-only operation was requested without a live paid plan.
    #[error("paid subscription has expired or is not active")]
    ExpiredSubscription,

    /// Plan activation referenced a plan id missing from the catalog.
    #[error("unknown plan: {0}")]
    UnknownPlan(String),

    /// The atomic transaction failed due to contention, timeout, or
    /// connectivity. Retriable by the caller with bounded backoff.
    #[error("transient store failure: {0}")]
    TransientStore(String),
}

impl QuotaError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::SubscriptionNotInitialized => "SUBSCRIPTION_NOT_INITIALIZED",
            Self::ExpiredSubscription => "EXPIRED_SUBSCRIPTION",
            Self::UnknownPlan(_) => "PLAN_NOT_FOUND",
            Self::TransientStore(_) => "TRANSIENT_STORE_ERROR",
        }
    }

    /// Whether the caller may retry the operation as-is.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::TransientStore(_))
    }
}

impl From<StoreError> for QuotaError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::SubscriptionNotInitialized,
            StoreError::AlreadyExists => Self::TransientStore("record already exists".into()),
            StoreError::VersionConflict => Self::TransientStore("record version conflict".into()),
            StoreError::Backend(message) => Self::TransientStore(message),
        }
    }
}

/// Failures specific to the one-time trial extension.
#[derive(Debug, Clone, Error)]
pub enum ExtensionError {
    #[error("trial has already been extended")]
    AlreadyExtended,

    #[error("trial extension window has closed")]
    ExtensionWindowClosed,

    /// The record holds a live paid plan; extending the trial would clobber it.
    #[error("record is not eligible for a trial extension")]
    NotEligible,

    #[error("no entitlement record exists for this user")]
    NotInitialized,

    #[error("transient store failure: {0}")]
    TransientStore(String),
}

impl ExtensionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyExtended => "ALREADY_EXTENDED",
            Self::ExtensionWindowClosed => "EXTENSION_WINDOW_CLOSED",
            Self::NotEligible => "EXTENSION_NOT_ELIGIBLE",
            Self::NotInitialized => "SUBSCRIPTION_NOT_INITIALIZED",
            Self::TransientStore(_) => "TRANSIENT_STORE_ERROR",
        }
    }
}

impl From<StoreError> for ExtensionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotInitialized,
            StoreError::AlreadyExists => Self::TransientStore("record already exists".into()),
            StoreError::VersionConflict => Self::TransientStore("record version conflict".into()),
            StoreError::Backend(message) => Self::TransientStore(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_conflict_is_never_quota_exhaustion() {
        let err: QuotaError = StoreError::VersionConflict.into();
        assert!(matches!(err, QuotaError::TransientStore(_)));
        assert!(err.is_retriable());
        assert_ne!(err.code(), "QUOTA_EXCEEDED");
    }

    #[test]
    fn missing_record_maps_to_not_initialized() {
        let quota: QuotaError = StoreError::NotFound.into();
        assert_eq!(quota.code(), "SUBSCRIPTION_NOT_INITIALIZED");

        let ext: ExtensionError = StoreError::NotFound.into();
        assert_eq!(ext.code(), "SUBSCRIPTION_NOT_INITIALIZED");
    }
}
