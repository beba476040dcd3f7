//! # scan-quota
//!
//! Entitlement and scan-quota engine for a receipt-scanning product: a
//! time-boxed trial, an auto-assigned free tier, and paid plans with tagged
//! monthly limits, with exactly-once consumption accounting under
//! concurrent and retried calls.
//!
//! ## Operations
//! - `init_record` — create the trial record at first authentication
//! - `get_status` — entitlement snapshot; persists lazy transitions
//! - `can_scan` — advisory pre-flight gate
//! - `record_consumption` — atomic, idempotency-keyed consumption
//! - `extend_trial` — one-time, time-windowed trial extension
//! - `activate_plan` / `cancel_plan` — paid plan lifecycle
//!
//! The service is stateless: it holds an injected [`Clock`], an
//! [`EntitlementStore`], and the plan catalog. Rollover and trial expiry
//! are evaluated lazily on the next read or write, never on a timer.

pub mod service;
pub mod snapshot;

pub use service::QuotaService;
pub use snapshot::EntitlementSnapshot;

// Re-export the core domain surface so callers depend on one crate.
pub use scan_quota_core::clock::{Clock, ManualClock, SystemClock};
pub use scan_quota_core::error::{ExtensionError, QuotaError, StoreError};
pub use scan_quota_core::plan::{Plan, QuotaLimit, QuotaOptions, FREEMIUM_PLAN_ID};
pub use scan_quota_core::record::{EntitlementRecord, SubscriptionStatus};
pub use scan_quota_core::store::{EntitlementStore, VersionedRecord};
pub use scan_quota_core::tier::EffectiveTier;
