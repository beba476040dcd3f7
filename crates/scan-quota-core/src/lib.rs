#![doc = include_str!("../README.md")]

pub mod clock;
pub mod error;
pub mod period;
pub mod plan;
pub mod record;
pub mod store;
pub mod tier;
pub mod transition;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ExtensionError, QuotaError, StoreError, StoreResult};
pub use period::{window_containing, BillingWindow};
pub use plan::{Plan, QuotaLimit, QuotaOptions, FREEMIUM_PLAN_ID};
pub use record::{EntitlementRecord, SubscriptionStatus};
pub use store::{EntitlementStore, VersionedRecord};
pub use tier::{can_consume, counter_value, resolve_tier, CounterKind, EffectiveTier, ResolvedTier};
