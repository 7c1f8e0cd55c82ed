//! Per-run call budget for web lookups.
//!
//! A `SearchBudget` caps how many lookups one analysis run may issue and
//! spaces the ones it grants with a fixed-interval gate. Acquisition is a
//! synchronous counter update under a mutex and never sleeps; the spacing is
//! carried by the returned `SearchPermit`, which the caller awaits right
//! before issuing the physical request.
//!
//! One budget belongs to exactly one run. Create it at the start of the run
//! and drop it at the end; never share it across runs.

use crate::config::LookupConfig;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Default number of lookups per run.
pub const DEFAULT_MAX_WEB_SEARCHES: usize = 3;

#[derive(Debug, Default)]
struct BudgetState {
    used: usize,
    /// Earliest instant at which the next granted lookup may start.
    next_slot: Option<Instant>,
}

/// Counted, spaced allowance of web lookups for one run.
#[derive(Debug)]
pub struct SearchBudget {
    max: usize,
    cooldown: Duration,
    state: Mutex<BudgetState>,
}

impl SearchBudget {
    pub fn new(max: usize, cooldown: Duration) -> Self {
        Self {
            max,
            cooldown,
            state: Mutex::new(BudgetState::default()),
        }
    }

    pub fn from_config(config: &LookupConfig) -> Self {
        Self::new(config.max_web_searches, config.cooldown())
    }

    /// Try to take one lookup from the budget.
    ///
    /// Returns `None` once `max` permits have been granted; a refused call
    /// changes nothing. Each granted permit is scheduled `cooldown` after the
    /// previous one.
    pub fn try_acquire(&self) -> Option<SearchPermit> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.used >= self.max {
            return None;
        }
        state.used += 1;

        let now = Instant::now();
        let slot = match state.next_slot {
            Some(next) if next > now => next,
            _ => now,
        };
        state.next_slot = Some(slot + self.cooldown);

        Some(SearchPermit { not_before: slot })
    }

    pub fn used(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).used
    }

    pub fn remaining(&self) -> usize {
        self.max.saturating_sub(self.used())
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WEB_SEARCHES, Duration::from_secs(1))
    }
}

/// A granted lookup slot.
#[derive(Debug)]
#[must_use = "a permit should be awaited with `ready()` before issuing the lookup"]
pub struct SearchPermit {
    not_before: Instant,
}

impl SearchPermit {
    pub fn not_before(&self) -> Instant {
        self.not_before
    }

    /// Wait until this slot opens.
    pub async fn ready(self) {
        tokio::time::sleep_until(self.not_before).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_exactly_max_acquisitions() {
        let budget = SearchBudget::new(3, Duration::ZERO);
        assert!(budget.try_acquire().is_some());
        assert!(budget.try_acquire().is_some());
        assert!(budget.try_acquire().is_some());
        assert_eq!(budget.remaining(), 0);

        assert!(budget.try_acquire().is_none());
        assert!(budget.try_acquire().is_none());
        assert_eq!(budget.used(), 3);
    }

    #[test]
    fn test_zero_budget_refuses_everything() {
        let budget = SearchBudget::new(0, Duration::ZERO);
        assert!(budget.try_acquire().is_none());
        assert_eq!(budget.used(), 0);
    }

    #[test]
    fn test_from_config() {
        let budget = SearchBudget::from_config(&LookupConfig::default());
        assert_eq!(budget.max(), 3);
        assert_eq!(budget.cooldown(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permits_are_spaced_by_cooldown() {
        let budget = SearchBudget::new(3, Duration::from_secs(1));
        let start = Instant::now();

        let first = budget.try_acquire().unwrap();
        let second = budget.try_acquire().unwrap();
        let third = budget.try_acquire().unwrap();

        assert_eq!(first.not_before(), start);
        assert_eq!(second.not_before(), start + Duration::from_secs(1));
        assert_eq!(third.not_before(), start + Duration::from_secs(2));

        first.ready().await;
        assert_eq!(Instant::now(), start);
        third.ready().await;
        assert!(Instant::now() >= start + Duration::from_secs(2));
        drop(second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_gap_does_not_accumulate_debt() {
        let budget = SearchBudget::new(3, Duration::from_secs(1));
        budget.try_acquire().unwrap().ready().await;

        tokio::time::advance(Duration::from_secs(5)).await;
        let now = Instant::now();
        let permit = budget.try_acquire().unwrap();
        assert_eq!(permit.not_before(), now);
    }

    #[tokio::test]
    async fn test_concurrent_acquisition_is_exclusive() {
        let budget = Arc::new(SearchBudget::new(3, Duration::ZERO));
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let budget = Arc::clone(&budget);
                tokio::spawn(async move { budget.try_acquire().is_some() })
            })
            .collect();

        let mut granted = 0;
        for task in tasks {
            if task.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 3);
        assert_eq!(budget.used(), 3);
    }
}
