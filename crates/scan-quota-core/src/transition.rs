// Lazy state transitions, evaluated on the next read or write touching the
// record rather than on a timer. Both functions are idempotent so that
// concurrent readers observing the same trigger condition converge on the
// same state, and both return whether they changed the record so callers
// know a write is needed.

use chrono::{DateTime, Utc};

use crate::period::window_containing;
use crate::plan::FREEMIUM_PLAN_ID;
use crate::record::{EntitlementRecord, SubscriptionStatus};

/// Roll the billing window forward if it has elapsed, zeroing the monthly
/// counter. The trial counter is never touched: the trial has exactly one
/// window. A record whose window is already current is left unchanged.
pub fn roll_if_elapsed(record: &mut EntitlementRecord, now: DateTime<Utc>) -> bool {
    let Some(end) = record.billing_period_end else {
        return false;
    };
    if now < end {
        return false;
    }

    let window = window_containing(record.trial_start, now);
    record.billing_period_start = Some(window.start);
    record.billing_period_end = Some(window.end);
    record.monthly_scans_used = 0;
    tracing::debug!(
        user = %record.user_id,
        start = %window.start,
        end = %window.end,
        "billing window rolled, monthly counter reset"
    );
    true
}

/// Downgrade an elapsed trial to the free tier: freemium status and sentinel
/// plan id, zeroed monthly counter, and a first billing window anchored to
/// the trial start. A no-op for any other status, so concurrent observers of
/// the trigger condition apply it at most once.
pub fn apply_trial_expiry(record: &mut EntitlementRecord, now: DateTime<Utc>) -> bool {
    if record.status != SubscriptionStatus::Trial {
        return false;
    }
    if now < record.trial_end {
        return false;
    }
    if record.has_valid_paid_plan(now) {
        return false;
    }

    record.status = SubscriptionStatus::Freemium;
    record.plan_id = Some(FREEMIUM_PLAN_ID.to_string());
    record.monthly_scans_used = 0;
    let window = window_containing(record.trial_start, now);
    record.billing_period_start = Some(window.start);
    record.billing_period_end = Some(window.end);
    tracing::info!(
        user = %record.user_id,
        window_start = %window.start,
        window_end = %window.end,
        "trial elapsed, downgraded to freemium"
    );
    true
}
