// The quota service — stateless composition of an injected clock, a
// versioned store, and the plan catalog. Every mutation runs as a
// compare-and-swap loop: load, apply lazy transitions, re-check the gate
// against the freshly rolled record, write conditionally on the version
// read, retry on conflict. "Now" is taken from the clock on every attempt.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use scan_quota_core::clock::Clock;
use scan_quota_core::error::{ExtensionError, QuotaError, StoreError};
use scan_quota_core::period::window_containing;
use scan_quota_core::plan::{QuotaOptions, FREEMIUM_PLAN_ID};
use scan_quota_core::record::{EntitlementRecord, SubscriptionStatus};
use scan_quota_core::store::EntitlementStore;
use scan_quota_core::tier::{can_consume, counter_value, resolve_tier, CounterKind, EffectiveTier};
use scan_quota_core::transition::{apply_trial_expiry, roll_if_elapsed};

use crate::snapshot::EntitlementSnapshot;

/// Internal conflict-retry budget before a mutation surfaces as transient.
const CAS_MAX_RETRIES: u32 = 8;

/// What a transaction closure decided about the record it was handed.
enum Outcome<T> {
    /// Nothing changed; skip the write.
    Unchanged(T),
    /// Persist the mutated record.
    Write(T),
}

/// Stateless entitlement/quota service. Cheap to clone; all state lives in
/// the store.
#[derive(Debug, Clone)]
pub struct QuotaService {
    store: Arc<dyn EntitlementStore>,
    clock: Arc<dyn Clock>,
    options: QuotaOptions,
}

impl QuotaService {
    pub fn new(store: Arc<dyn EntitlementStore>, clock: Arc<dyn Clock>, options: QuotaOptions) -> Self {
        Self { store, clock, options }
    }

    pub fn options(&self) -> &QuotaOptions {
        &self.options
    }

    /// Create the trial record at first authentication. Idempotent: an
    /// existing record (including one created by a racing session) is
    /// returned as-is.
    pub async fn init_record(&self, user_id: &str) -> Result<EntitlementSnapshot, QuotaError> {
        let now = self.clock.now();
        if let Some(existing) = self.store.load(user_id).await? {
            return Ok(EntitlementSnapshot::from_record(&existing.record, now, &self.options));
        }

        let record = EntitlementRecord::new_trial(
            user_id,
            now,
            Duration::days(self.options.trial_duration_days),
        );
        match self.store.create(record).await {
            Ok(versioned) => {
                tracing::info!(user = user_id, trial_end = %versioned.record.trial_end, "trial record created");
                Ok(EntitlementSnapshot::from_record(&versioned.record, now, &self.options))
            }
            Err(StoreError::AlreadyExists) => {
                // Lost the creation race; the winner's record is the truth.
                let versioned = self
                    .store
                    .load(user_id)
                    .await?
                    .ok_or(QuotaError::SubscriptionNotInitialized)?;
                Ok(EntitlementSnapshot::from_record(&versioned.record, now, &self.options))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Current entitlement snapshot. Lazy transitions (trial expiry, window
    /// rollover) observed here are persisted, so the very next reader sees
    /// the downgraded state.
    pub async fn get_status(&self, user_id: &str) -> Result<EntitlementSnapshot, QuotaError> {
        self.with_record(user_id, |record, now| {
            let mut changed = apply_trial_expiry(record, now);
            changed |= roll_if_elapsed(record, now);
            let snapshot = EntitlementSnapshot::from_record(record, now, &self.options);
            if changed {
                Ok(Outcome::Write(snapshot))
            } else {
                Ok(Outcome::Unchanged(snapshot))
            }
        })
        .await
    }

    /// Advisory pre-flight gate for UI and the offline queue. Evaluated
    /// against a locally transitioned copy without writing; never treat a
    /// `true` here as authorization to consume.
    pub async fn can_scan(&self, user_id: &str) -> Result<bool, QuotaError> {
        let versioned = self
            .store
            .load(user_id)
            .await?
            .ok_or(QuotaError::SubscriptionNotInitialized)?;
        let now = self.clock.now();

        let mut record = versioned.record;
        apply_trial_expiry(&mut record, now);
        roll_if_elapsed(&mut record, now);
        Ok(can_consume(&record, now, &self.options))
    }

    /// Record one successful scan, exactly once.
    ///
    /// Call this only after the quota-consuming work has succeeded. Retries
    /// of the same logical scan must reuse the same `scan_key`; a key the
    /// record has already applied returns `Ok` without consuming again. The
    /// gate is re-evaluated inside the atomic section against the freshly
    /// rolled record, and a denial writes nothing.
    pub async fn record_consumption(&self, user_id: &str, scan_key: &str) -> Result<(), QuotaError> {
        self.with_record(user_id, |record, now| {
            if record.has_scan_key(scan_key) {
                tracing::debug!(user = user_id, scan_key, "duplicate scan key, consumption already recorded");
                return Ok(Outcome::Unchanged(()));
            }

            apply_trial_expiry(record, now);
            roll_if_elapsed(record, now);

            let resolved = resolve_tier(record, now, &self.options);
            let used = counter_value(record, resolved.counter);
            if !resolved.limit.allows(used) {
                tracing::warn!(user = user_id, tier = %resolved.tier, used, "consumption denied, quota exceeded");
                return Err(QuotaError::QuotaExceeded);
            }

            match resolved.counter {
                CounterKind::Trial => record.trial_scans_used += 1,
                CounterKind::Monthly => record.monthly_scans_used += 1,
            }
            record.remember_scan_key(scan_key);
            tracing::debug!(user = user_id, tier = %resolved.tier, used = used + 1, "scan recorded");
            Ok(Outcome::Write(()))
        })
        .await
    }

    /// One-time, time-windowed trial extension. Reverts an automatic
    /// freemium downgrade if one already occurred.
    pub async fn extend_trial(&self, user_id: &str) -> Result<(), ExtensionError> {
        self.with_record(user_id, |record, now| {
            if record.trial_extended {
                return Err(ExtensionError::AlreadyExtended);
            }
            if record.has_valid_paid_plan(now) {
                return Err(ExtensionError::NotEligible);
            }
            if now - record.trial_end > Duration::days(self.options.trial_grace_days) {
                return Err(ExtensionError::ExtensionWindowClosed);
            }

            record.trial_end = now + Duration::days(self.options.trial_extension_days);
            record.trial_extended = true;
            record.status = SubscriptionStatus::Trial;
            if record.plan_id.as_deref() == Some(FREEMIUM_PLAN_ID) {
                record.plan_id = None;
            }
            tracing::info!(user = user_id, trial_end = %record.trial_end, "trial extended");
            Ok(Outcome::Write(()))
        })
        .await
    }

    /// Activate a paid plan. Called by the payment-verification collaborator
    /// after it has independently confirmed payment.
    ///
    /// A record arriving straight from the trial gets a fresh billing window
    /// anchored to its trial start; an upgrade mid-window keeps the current
    /// window and counter.
    pub async fn activate_plan(
        &self,
        user_id: &str,
        plan_id: &str,
        subscription_end: Option<DateTime<Utc>>,
    ) -> Result<(), QuotaError> {
        if self.options.find_plan(plan_id).is_none() {
            return Err(QuotaError::UnknownPlan(plan_id.to_string()));
        }

        self.with_record(user_id, |record, now| {
            record.status = SubscriptionStatus::Active;
            record.plan_id = Some(plan_id.to_string());
            record.subscription_end = subscription_end;
            if record.billing_period_end.is_none() {
                let window = window_containing(record.trial_start, now);
                record.billing_period_start = Some(window.start);
                record.billing_period_end = Some(window.end);
                record.monthly_scans_used = 0;
            } else {
                roll_if_elapsed(record, now);
            }
            tracing::info!(user = user_id, plan = plan_id, "paid plan activated");
            Ok(Outcome::Write(()))
        })
        .await
    }

    /// Mark a paid subscription cancelled. Paid limits are retained until
    /// `subscription_end` passes.
    pub async fn cancel_plan(&self, user_id: &str) -> Result<(), QuotaError> {
        self.with_record(user_id, |record, _now| {
            if record.status != SubscriptionStatus::Active {
                tracing::warn!(user = user_id, status = %record.status, "cancel requested without an active plan");
                return Ok(Outcome::Unchanged(()));
            }
            record.status = SubscriptionStatus::Cancelled;
            tracing::info!(user = user_id, "plan cancelled");
            Ok(Outcome::Write(()))
        })
        .await
    }

    /// Paid-only surface check. Unlike consumption, a lapsed or absent paid
    /// plan here is a hard error rather than a freemium fall-through.
    pub async fn require_paid(&self, user_id: &str) -> Result<EntitlementSnapshot, QuotaError> {
        let snapshot = self.get_status(user_id).await?;
        match snapshot.tier {
            EffectiveTier::Paid { .. } => Ok(snapshot),
            _ => Err(QuotaError::ExpiredSubscription),
        }
    }

    /// Run `f` against the user's record as one atomic unit: optimistic
    /// read, pure mutation, conditional write, bounded retry on conflict.
    /// The clock is re-read on every attempt.
    async fn with_record<T, E, F>(&self, user_id: &str, mut f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnMut(&mut EntitlementRecord, DateTime<Utc>) -> Result<Outcome<T>, E>,
    {
        let mut conflicts = 0;
        loop {
            let now = self.clock.now();
            let versioned = self
                .store
                .load(user_id)
                .await
                .map_err(E::from)?
                .ok_or_else(|| E::from(StoreError::NotFound))?;

            let mut record = versioned.record;
            match f(&mut record, now)? {
                Outcome::Unchanged(value) => return Ok(value),
                Outcome::Write(value) => {
                    record.updated_at = now;
                    match self.store.update(versioned.version, record).await {
                        Ok(_) => return Ok(value),
                        Err(StoreError::VersionConflict) if conflicts < CAS_MAX_RETRIES => {
                            conflicts += 1;
                            tracing::debug!(user = user_id, conflicts, "version conflict, retrying transaction");
                            continue;
                        }
                        Err(err) => return Err(E::from(err)),
                    }
                }
            }
        }
    }
}
