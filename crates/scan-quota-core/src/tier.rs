// Tier resolution — the single source of truth for which limit applies
// right now. Pure and total: never touches the store, never fails for a
// well-formed record. A paid status whose plan is missing from the catalog
// degrades to the freemium limit rather than silently granting access.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::plan::{QuotaLimit, QuotaOptions};
use crate::record::{EntitlementRecord, SubscriptionStatus};

/// The entitlement level currently governing a user's quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectiveTier {
    Trial,
    Freemium,
    Paid {
        #[serde(rename = "planId")]
        plan_id: String,
    },
}

impl fmt::Display for EffectiveTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trial => write!(f, "trial"),
            Self::Freemium => write!(f, "freemium"),
            Self::Paid { plan_id } => write!(f, "paid:{plan_id}"),
        }
    }
}

/// Which consumption counter the resolved tier charges against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    Trial,
    Monthly,
}

/// Output of tier resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTier {
    pub tier: EffectiveTier,
    pub limit: QuotaLimit,
    pub counter: CounterKind,
}

/// Resolve the tier and limit governing `record` at `now`. No side effects.
pub fn resolve_tier(record: &EntitlementRecord, now: DateTime<Utc>, options: &QuotaOptions) -> ResolvedTier {
    if record.status == SubscriptionStatus::Trial && now < record.trial_end {
        return ResolvedTier {
            tier: EffectiveTier::Trial,
            limit: options.trial_limit(),
            counter: CounterKind::Trial,
        };
    }

    if record.status.is_paid() && record.subscription_end.map_or(true, |end| end > now) {
        match record.plan_id.as_deref().and_then(|id| options.find_plan(id)) {
            Some(plan) => {
                return ResolvedTier {
                    tier: EffectiveTier::Paid { plan_id: plan.id.clone() },
                    limit: plan.scan_limit,
                    counter: CounterKind::Monthly,
                };
            }
            None => {
                // Malformed record: a paid status must carry a catalog plan.
                // Degrade to the most restrictive tier instead of granting
                // unlimited access.
                tracing::error!(
                    user = %record.user_id,
                    plan = ?record.plan_id,
                    "paid status without a known plan, degrading to freemium limits"
                );
            }
        }
    }

    ResolvedTier {
        tier: EffectiveTier::Freemium,
        limit: options.freemium_limit(),
        counter: CounterKind::Monthly,
    }
}

/// The counter value the resolved tier charges against.
pub fn counter_value(record: &EntitlementRecord, counter: CounterKind) -> u32 {
    match counter {
        CounterKind::Trial => record.trial_scans_used,
        CounterKind::Monthly => record.monthly_scans_used,
    }
}

/// The quota gate: whether one more consumption is currently permitted.
///
/// Advisory for pre-flight checks; only authoritative when re-evaluated
/// inside the recorder's atomic section.
pub fn can_consume(record: &EntitlementRecord, now: DateTime<Utc>, options: &QuotaOptions) -> bool {
    let resolved = resolve_tier(record, now, options);
    resolved.limit.allows(counter_value(record, resolved.counter))
}
