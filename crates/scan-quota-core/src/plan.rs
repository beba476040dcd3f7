// Plan catalog and quota limits.
//
// "Unlimited" is a tagged variant, not a magic number, so that "no cap" can
// never be confused with "very high cap" in a comparison.

use serde::{Deserialize, Serialize};

/// Sentinel plan id written by the automatic trial-to-freemium transition.
pub const FREEMIUM_PLAN_ID: &str = "freemium";

/// Scan allowance for a billing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaLimit {
    Limited(u32),
    Unlimited,
}

impl QuotaLimit {
    /// Whether one more consumption is allowed given the current counter.
    pub fn allows(&self, used: u32) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Limited(cap) => used < *cap,
        }
    }

    /// Remaining scans, `None` meaning uncapped.
    pub fn remaining(&self, used: u32) -> Option<u32> {
        match self {
            Self::Unlimited => None,
            Self::Limited(cap) => Some(cap.saturating_sub(used)),
        }
    }
}

/// A paid subscription plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub scan_limit: QuotaLimit,
}

/// Quota engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaOptions {
    /// Trial length granted at record creation.
    #[serde(default = "default_trial_duration_days")]
    pub trial_duration_days: i64,
    /// Length of the one-time trial extension.
    #[serde(default = "default_trial_extension_days")]
    pub trial_extension_days: i64,
    /// How long after `trial_end` the extension may still be claimed.
    #[serde(default = "default_trial_grace_days")]
    pub trial_grace_days: i64,
    /// Total scans allowed over the whole trial.
    #[serde(default = "default_trial_scan_limit")]
    pub trial_scan_limit: u32,
    /// Scans allowed per billing window on the free tier.
    #[serde(default = "default_freemium_scan_limit")]
    pub freemium_scan_limit: u32,
    /// Available paid plans.
    #[serde(default)]
    pub plans: Vec<Plan>,
}

fn default_trial_duration_days() -> i64 {
    14
}
fn default_trial_extension_days() -> i64 {
    7
}
fn default_trial_grace_days() -> i64 {
    7
}
fn default_trial_scan_limit() -> u32 {
    50
}
fn default_freemium_scan_limit() -> u32 {
    3
}

impl Default for QuotaOptions {
    fn default() -> Self {
        Self {
            trial_duration_days: default_trial_duration_days(),
            trial_extension_days: default_trial_extension_days(),
            trial_grace_days: default_trial_grace_days(),
            trial_scan_limit: default_trial_scan_limit(),
            freemium_scan_limit: default_freemium_scan_limit(),
            plans: Vec::new(),
        }
    }
}

impl QuotaOptions {
    /// Find a plan by ID.
    pub fn find_plan(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }

    pub fn trial_limit(&self) -> QuotaLimit {
        QuotaLimit::Limited(self.trial_scan_limit)
    }

    pub fn freemium_limit(&self) -> QuotaLimit {
        QuotaLimit::Limited(self.freemium_scan_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limited_allows_below_cap() {
        let limit = QuotaLimit::Limited(3);
        assert!(limit.allows(0));
        assert!(limit.allows(2));
        assert!(!limit.allows(3));
        assert!(!limit.allows(4));
    }

    #[test]
    fn unlimited_always_allows() {
        assert!(QuotaLimit::Unlimited.allows(u32::MAX));
        assert_eq!(QuotaLimit::Unlimited.remaining(u32::MAX), None);
    }

    #[test]
    fn remaining_saturates() {
        assert_eq!(QuotaLimit::Limited(3).remaining(1), Some(2));
        assert_eq!(QuotaLimit::Limited(3).remaining(5), Some(0));
    }

    #[test]
    fn find_plan_by_id() {
        let options = QuotaOptions {
            plans: vec![
                Plan {
                    id: "basic".into(),
                    name: "Basic".into(),
                    scan_limit: QuotaLimit::Limited(100),
                },
                Plan {
                    id: "pro".into(),
                    name: "Pro".into(),
                    scan_limit: QuotaLimit::Unlimited,
                },
            ],
            ..Default::default()
        };
        assert_eq!(options.find_plan("pro").map(|p| p.scan_limit), Some(QuotaLimit::Unlimited));
        assert!(options.find_plan("missing").is_none());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: QuotaOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.trial_duration_days, 14);
        assert_eq!(options.trial_scan_limit, 50);
        assert_eq!(options.freemium_scan_limit, 3);
        assert!(options.plans.is_empty());
    }
}
