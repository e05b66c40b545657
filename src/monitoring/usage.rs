//! Per-provider call accounting with daily quotas.
//!
//! Counters for the current day reset at 00:00 UTC. Lifetime totals are
//! kept for the life of the process and are never persisted.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::config::QuotaConfig;
use crate::models::SourceKind;

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    calls: u64,
    errors: u64,
}

#[derive(Debug)]
struct UsageState {
    day: NaiveDate,
    today: HashMap<SourceKind, Counters>,
    lifetime: HashMap<SourceKind, Counters>,
}

impl UsageState {
    fn roll_over(&mut self, now: DateTime<Utc>) {
        let day = now.date_naive();
        if day != self.day {
            tracing::info!("Daily usage counters reset for {}", day);
            self.day = day;
            self.today.clear();
        }
    }
}

/// Usage of one provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderUsage {
    pub calls_today: u64,
    pub errors_today: u64,
    pub total_calls: u64,
    pub total_errors: u64,
    /// Daily ceiling, `None` when unlimited
    pub daily_limit: Option<u64>,
    pub remaining: Option<u64>,
}

/// Usage of every provider for the current UTC day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    pub date: NaiveDate,
    /// When the daily counters next reset
    pub reset_time: DateTime<Utc>,
    pub providers: BTreeMap<SourceKind, ProviderUsage>,
}

/// Tracks upstream calls and errors per provider
#[derive(Debug)]
pub struct UsageTracker {
    state: Mutex<UsageState>,
    limits: HashMap<SourceKind, u64>,
}

impl UsageTracker {
    /// Tracker enforcing the ceilings in `quotas`
    pub fn new(quotas: &QuotaConfig) -> Self {
        let limits = SourceKind::ALL
            .into_iter()
            .filter_map(|kind| quotas.limit_for(kind).map(|limit| (kind, limit)))
            .collect();
        Self::with_limits(limits)
    }

    /// Tracker without any ceiling
    pub fn unlimited() -> Self {
        Self::with_limits(HashMap::new())
    }

    pub fn with_limits(limits: HashMap<SourceKind, u64>) -> Self {
        Self {
            state: Mutex::new(UsageState {
                day: Utc::now().date_naive(),
                today: HashMap::new(),
                lifetime: HashMap::new(),
            }),
            limits,
        }
    }

    fn with_state<T>(&self, now: DateTime<Utc>, f: impl FnOnce(&mut UsageState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.roll_over(now);
        f(&mut guard)
    }

    /// Count one failed upstream call
    pub fn record_error(&self, kind: SourceKind) {
        self.record_error_at(kind, Utc::now());
    }

    pub(crate) fn record_error_at(&self, kind: SourceKind, now: DateTime<Utc>) {
        self.with_state(now, |state| {
            state.today.entry(kind).or_default().errors += 1;
            state.lifetime.entry(kind).or_default().errors += 1;
        });
    }

    /// Calls made today
    pub fn calls_today(&self, kind: SourceKind) -> u64 {
        self.with_state(Utc::now(), |state| {
            state.today.get(&kind).map_or(0, |c| c.calls)
        })
    }

    /// Calls left today, `None` when the provider is unlimited
    pub fn remaining(&self, kind: SourceKind) -> Option<u64> {
        self.remaining_at(kind, Utc::now())
    }

    pub(crate) fn remaining_at(&self, kind: SourceKind, now: DateTime<Utc>) -> Option<u64> {
        let limit = *self.limits.get(&kind)?;
        let used = self.with_state(now, |state| state.today.get(&kind).map_or(0, |c| c.calls));
        Some(limit.saturating_sub(used))
    }

    /// Count one call if today's quota allows it, `Err(seconds_until_reset)`
    /// otherwise. Check and count happen under one lock.
    pub fn try_consume(&self, kind: SourceKind) -> Result<(), u64> {
        self.try_consume_at(kind, Utc::now())
    }

    pub(crate) fn try_consume_at(&self, kind: SourceKind, now: DateTime<Utc>) -> Result<(), u64> {
        let limit = self.limits.get(&kind).copied();
        self.with_state(now, |state| {
            let used = state.today.get(&kind).map_or(0, |c| c.calls);
            if limit.is_some_and(|limit| used >= limit) {
                let wait = (next_reset(now) - now).num_seconds().max(1);
                return Err(wait as u64);
            }
            state.today.entry(kind).or_default().calls += 1;
            state.lifetime.entry(kind).or_default().calls += 1;
            Ok(())
        })
    }

    /// Usage of every provider that has been used or has a ceiling
    pub fn report(&self) -> UsageReport {
        self.report_at(Utc::now())
    }

    pub(crate) fn report_at(&self, now: DateTime<Utc>) -> UsageReport {
        self.with_state(now, |state| {
            let providers = SourceKind::ALL
                .into_iter()
                .map(|kind| {
                    let today = state.today.get(&kind).copied().unwrap_or_default();
                    let lifetime = state.lifetime.get(&kind).copied().unwrap_or_default();
                    let daily_limit = self.limits.get(&kind).copied();
                    let usage = ProviderUsage {
                        calls_today: today.calls,
                        errors_today: today.errors,
                        total_calls: lifetime.calls,
                        total_errors: lifetime.errors,
                        daily_limit,
                        remaining: daily_limit.map(|l| l.saturating_sub(today.calls)),
                    };
                    (kind, usage)
                })
                .collect();

            UsageReport {
                date: state.day,
                reset_time: next_reset(now),
                providers,
            }
        })
    }
}

/// Next 00:00 UTC after `now`
fn next_reset(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.date_naive() + ChronoDuration::days(1);
    tomorrow
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now + ChronoDuration::days(1))
}
