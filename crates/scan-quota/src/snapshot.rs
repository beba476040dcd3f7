// Read model returned by status queries — everything the UI needs to render
// the quota state without touching the record itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scan_quota_core::period::days_remaining;
use scan_quota_core::plan::{QuotaLimit, QuotaOptions};
use scan_quota_core::record::{EntitlementRecord, SubscriptionStatus};
use scan_quota_core::tier::{counter_value, resolve_tier, EffectiveTier};

/// Point-in-time view of a user's entitlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementSnapshot {
    pub user_id: String,
    pub status: SubscriptionStatus,
    pub tier: EffectiveTier,
    pub limit: QuotaLimit,
    pub scans_used: u32,
    /// Remaining scans in the current window, `None` meaning uncapped.
    pub scans_remaining: Option<u32>,
    /// Whole days of trial left, zero outside the trial.
    pub trial_days_remaining: i64,
    /// When the current window closes: `trial_end` during the trial,
    /// otherwise the billing window end.
    pub period_end: Option<DateTime<Utc>>,
}

impl EntitlementSnapshot {
    pub fn from_record(record: &EntitlementRecord, now: DateTime<Utc>, options: &QuotaOptions) -> Self {
        let resolved = resolve_tier(record, now, options);
        let used = counter_value(record, resolved.counter);
        let period_end = match resolved.tier {
            EffectiveTier::Trial => Some(record.trial_end),
            _ => record.billing_period_end,
        };
        let trial_days_remaining = match resolved.tier {
            EffectiveTier::Trial => days_remaining(record.trial_end, now),
            _ => 0,
        };

        Self {
            user_id: record.user_id.clone(),
            status: record.status,
            scans_remaining: resolved.limit.remaining(used),
            scans_used: used,
            limit: resolved.limit,
            tier: resolved.tier,
            trial_days_remaining,
            period_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn trial_snapshot_reports_days_and_remaining() {
        let mut record = EntitlementRecord::new_trial("u1", at(2025, 1, 10), Duration::days(14));
        record.trial_scans_used = 12;

        let snap = EntitlementSnapshot::from_record(&record, at(2025, 1, 14), &QuotaOptions::default());
        assert_eq!(snap.tier, EffectiveTier::Trial);
        assert_eq!(snap.scans_used, 12);
        assert_eq!(snap.scans_remaining, Some(38));
        assert_eq!(snap.trial_days_remaining, 10);
        assert_eq!(snap.period_end, Some(record.trial_end));
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let record = EntitlementRecord::new_trial("u1", at(2025, 1, 10), Duration::days(14));
        let snap = EntitlementSnapshot::from_record(&record, at(2025, 1, 11), &QuotaOptions::default());
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["tier"], "trial");
        assert!(json["scansRemaining"].is_number());
    }
}
