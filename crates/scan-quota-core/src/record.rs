// The per-user entitlement record — the single source of truth for tier,
// status, time anchors and consumption counters. Owned by the store; mutated
// only through the service's atomic transactions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How many applied idempotency keys a record remembers for retry dedup.
pub const RECENT_SCAN_KEY_CAP: usize = 32;

/// Subscription lifecycle statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Freemium,
    Active,
    Cancelled,
    Inactive,
}

impl SubscriptionStatus {
    /// Statuses that can carry a paid plan. A cancelled subscription keeps
    /// its paid limits until `subscription_end` passes.
    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Active | Self::Cancelled)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Trial => "trial",
            Self::Freemium => "freemium",
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Inactive => "inactive",
        };
        write!(f, "{s}")
    }
}

/// Entitlement record, one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementRecord {
    pub id: String,
    pub user_id: String,
    pub status: SubscriptionStatus,
    /// Paid plan id, or the freemium sentinel after automatic downgrade.
    pub plan_id: Option<String>,
    pub trial_start: DateTime<Utc>,
    pub trial_end: DateTime<Utc>,
    /// Settable exactly once.
    pub trial_extended: bool,
    /// Consumption counter while in trial. The trial has a single window,
    /// `[trial_start, trial_end)`, and is never reset.
    pub trial_scans_used: u32,
    /// Open consumption window for freemium/paid tiers, anchored to the
    /// day-of-month of `trial_start`.
    pub billing_period_start: Option<DateTime<Utc>>,
    pub billing_period_end: Option<DateTime<Utc>>,
    /// Consumption counter for the current billing window.
    pub monthly_scans_used: u32,
    /// If present and in the past, a paid status is not entitled.
    pub subscription_end: Option<DateTime<Utc>>,
    /// Recently applied idempotency keys, newest last.
    #[serde(default)]
    pub recent_scan_keys: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EntitlementRecord {
    /// Fresh trial record, created once at first authentication.
    pub fn new_trial(user_id: impl Into<String>, now: DateTime<Utc>, trial_duration: Duration) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            status: SubscriptionStatus::Trial,
            plan_id: None,
            trial_start: now,
            trial_end: now + trial_duration,
            trial_extended: false,
            trial_scans_used: 0,
            billing_period_start: None,
            billing_period_end: None,
            monthly_scans_used: 0,
            subscription_end: None,
            recent_scan_keys: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the record holds a paid plan that is live at `now`.
    pub fn has_valid_paid_plan(&self, now: DateTime<Utc>) -> bool {
        self.status.is_paid()
            && self.plan_id.is_some()
            && self.subscription_end.map_or(true, |end| end > now)
    }

    pub fn has_scan_key(&self, key: &str) -> bool {
        self.recent_scan_keys.iter().any(|k| k == key)
    }

    /// Remember an applied idempotency key, evicting the oldest beyond the cap.
    pub fn remember_scan_key(&mut self, key: &str) {
        if self.has_scan_key(key) {
            return;
        }
        self.recent_scan_keys.push(key.to_string());
        if self.recent_scan_keys.len() > RECENT_SCAN_KEY_CAP {
            let excess = self.recent_scan_keys.len() - RECENT_SCAN_KEY_CAP;
            self.recent_scan_keys.drain(..excess);
        }
    }
}
