//! Multi-dimension admission ledger.

use crate::window::SlidingWindow;
use crate::{Demand, QuotaDimension, QuotaUnit, ReservationId, Tier};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tollgate_core::BudgetConfig;
use tollgate_error::{RateLimitError, RateLimitErrorKind};
use tracing::{debug, instrument, warn};

/// Handle for consumption committed by a granted [`QuotaTracker::reserve`].
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct Reservation {
    id: ReservationId,
    granted_at: Instant,
    demand: Demand,
}

/// Result of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Consumption was committed against every dimension.
    Granted(Reservation),
    /// Nothing was committed; every dimension has headroom at `wait_until`
    /// unless other reservations get there first.
    Denied {
        /// Earliest instant the demand fits
        wait_until: Instant,
    },
}

impl Admission {
    /// Returns true for [`Admission::Granted`].
    pub fn is_granted(&self) -> bool {
        matches!(self, Admission::Granted(_))
    }
}

/// Point-in-time view of one dimension.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct DimensionUsage {
    name: String,
    unit: QuotaUnit,
    window: Duration,
    capacity: u64,
    used: u64,
    remaining: u64,
}

#[derive(Debug)]
struct TrackerState {
    windows: Vec<SlidingWindow>,
    next_reservation: u64,
    throttled_until: Option<Instant>,
    clock: Instant,
}

impl TrackerState {
    /// Clamps `now` so the ledger never observes time running backwards.
    fn advance(&mut self, now: Instant) -> Instant {
        let now = now.max(self.clock);
        self.clock = now;
        for window in &mut self.windows {
            window.prune(now);
        }
        now
    }
}

/// Single source of truth for quota admission.
///
/// Holds one sliding window per [`QuotaDimension`]. A reservation is checked
/// against every dimension at once and either commits to all of them or to
/// none. Share it between workers behind an `Arc`.
///
/// # Example
///
/// ```
/// use tollgate_rate_limit::{Admission, Demand, QuotaDimension, QuotaTracker, QuotaUnit};
///
/// let tracker = QuotaTracker::new(vec![
///     QuotaDimension::per_minute("rpm", QuotaUnit::Requests, 1),
/// ]);
///
/// let demand = Demand::new(1, 0, 0);
/// assert!(tracker.reserve(&demand).unwrap().is_granted());
/// assert!(matches!(tracker.reserve(&demand).unwrap(), Admission::Denied { .. }));
/// ```
#[derive(Debug)]
pub struct QuotaTracker {
    state: Mutex<TrackerState>,
}

impl QuotaTracker {
    /// Creates a tracker enforcing the given dimensions.
    pub fn new(dimensions: Vec<QuotaDimension>) -> Self {
        let windows = dimensions.into_iter().map(SlidingWindow::new).collect();
        Self {
            state: Mutex::new(TrackerState {
                windows,
                next_reservation: 0,
                throttled_until: None,
                clock: Instant::now(),
            }),
        }
    }

    /// Creates a tracker from a tier's limits scaled by a budget.
    pub fn from_tier<T: Tier + ?Sized>(tier: &T, budget: &BudgetConfig) -> Self {
        debug!(tier = tier.name(), "Building quota tracker from tier");
        Self::new(tier.dimensions(budget))
    }

    /// Tracker with no dimensions; every demand is granted.
    pub fn unlimited() -> Self {
        Self::new(Vec::new())
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dimensions currently enforced.
    pub fn dimensions(&self) -> Vec<QuotaDimension> {
        self.lock()
            .windows
            .iter()
            .map(|w| w.dimension().clone())
            .collect()
    }

    /// Attempts to admit `demand` now.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitErrorKind::DemandExceedsCapacity`] if the demand is
    /// larger than some dimension's capacity and can never be admitted.
    pub fn reserve(&self, demand: &Demand) -> Result<Admission, RateLimitError> {
        let mut state = self.lock();
        let now = Instant::now();
        Self::reserve_locked(&mut state, demand, now)
    }

    /// Attempts to admit `demand` at an explicit instant.
    ///
    /// Instants earlier than one already observed are treated as the latest
    /// observed instant.
    pub fn reserve_at(&self, demand: &Demand, now: Instant) -> Result<Admission, RateLimitError> {
        let mut state = self.lock();
        Self::reserve_locked(&mut state, demand, now)
    }

    fn reserve_locked(
        state: &mut TrackerState,
        demand: &Demand,
        now: Instant,
    ) -> Result<Admission, RateLimitError> {
        let now = state.advance(now);

        for window in &state.windows {
            let dimension = window.dimension();
            let amount = demand.amount(*dimension.unit());
            if amount > *dimension.capacity() {
                return Err(RateLimitError::new(
                    RateLimitErrorKind::DemandExceedsCapacity {
                        dimension: dimension.name().clone(),
                        demand: amount,
                        capacity: *dimension.capacity(),
                    },
                ));
            }
        }

        let mut wait_until = state.throttled_until.filter(|until| *until > now);
        for window in &state.windows {
            let amount = demand.amount(*window.dimension().unit());
            if amount == 0 {
                continue;
            }
            let at = window.available_at(amount, now);
            if at > now {
                debug!(
                    dimension = %window.dimension().name(),
                    used = window.used(),
                    amount,
                    "Dimension saturated"
                );
                wait_until = Some(wait_until.map_or(at, |until| until.max(at)));
            }
        }

        if let Some(wait_until) = wait_until {
            return Ok(Admission::Denied { wait_until });
        }

        let id = ReservationId(state.next_reservation);
        state.next_reservation += 1;
        // Token events are kept at zero so reconcile can record actual usage.
        for window in &mut state.windows {
            let unit = *window.dimension().unit();
            let amount = demand.amount(unit);
            if amount > 0 || unit == QuotaUnit::Tokens {
                window.commit(now, amount, id);
            }
        }

        Ok(Admission::Granted(Reservation {
            id,
            granted_at: now,
            demand: *demand,
        }))
    }

    /// Replaces the estimated token consumption of `reservation` with the
    /// actual figure reported by the provider.
    ///
    /// Events that already left their window are not touched.
    #[instrument(skip(self, reservation), fields(reservation = reservation.id.0))]
    pub fn reconcile(&self, reservation: &Reservation, actual_tokens: u64) {
        let mut state = self.lock();
        for window in &mut state.windows {
            if *window.dimension().unit() != QuotaUnit::Tokens {
                continue;
            }
            if let Some(estimated) = window.adjust(reservation.id, actual_tokens) {
                debug!(
                    dimension = %window.dimension().name(),
                    estimated,
                    actual_tokens,
                    "Reconciled token usage"
                );
            }
        }
    }

    /// Blocks every reservation for `duration` from now.
    pub fn throttle(&self, duration: Duration) {
        self.throttle_at(duration, Instant::now());
    }

    /// Blocks every reservation until `now + duration`.
    ///
    /// A shorter throttle never shortens one already in effect. A duration
    /// too large to represent as an instant leaves the current throttle as
    /// it is.
    pub fn throttle_at(&self, duration: Duration, now: Instant) {
        let mut state = self.lock();
        let Some(until) = now.checked_add(duration) else {
            warn!(
                delay_secs = duration.as_secs(),
                "Ignoring throttle beyond the clock's range"
            );
            return;
        };
        let until = state.throttled_until.map_or(until, |current| current.max(until));
        debug!(delay_ms = duration.as_millis() as u64, "Throttling admissions");
        state.throttled_until = Some(until);
    }

    /// Overrides the capacity of a named dimension.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitErrorKind::UnknownDimension`] if no dimension has
    /// this name.
    pub fn set_capacity(&self, name: &str, capacity: u64) -> Result<(), RateLimitError> {
        let mut state = self.lock();
        let window = state
            .windows
            .iter_mut()
            .find(|w| w.dimension().name() == name)
            .ok_or_else(|| {
                RateLimitError::new(RateLimitErrorKind::UnknownDimension(name.to_string()))
            })?;
        debug!(dimension = name, capacity, "Setting capacity");
        window.dimension_mut().set_capacity(capacity);
        Ok(())
    }

    /// Lowers the capacity of every dimension matching `unit` and `window`
    /// to `capacity`. Capacities are never raised. Returns how many
    /// dimensions changed.
    pub fn tighten(&self, unit: QuotaUnit, window: Duration, capacity: u64) -> usize {
        let mut state = self.lock();
        let mut changed = 0;
        for w in &mut state.windows {
            let dimension = w.dimension();
            if *dimension.unit() == unit
                && *dimension.window() == window
                && capacity < *dimension.capacity()
            {
                debug!(
                    dimension = %dimension.name(),
                    from = *dimension.capacity(),
                    to = capacity,
                    "Tightening capacity"
                );
                w.dimension_mut().set_capacity(capacity);
                changed += 1;
            }
        }
        changed
    }

    /// Usage of every dimension at the current instant.
    pub fn usage(&self) -> Vec<DimensionUsage> {
        let mut state = self.lock();
        state.advance(Instant::now());
        state
            .windows
            .iter()
            .map(|w| {
                let dimension = w.dimension();
                DimensionUsage {
                    name: dimension.name().clone(),
                    unit: *dimension.unit(),
                    window: *dimension.window(),
                    capacity: *dimension.capacity(),
                    used: w.used(),
                    remaining: dimension.capacity().saturating_sub(w.used()),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_has_no_side_effects() {
        let tracker = QuotaTracker::new(vec![
            QuotaDimension::per_minute("rpm", QuotaUnit::Requests, 10),
            QuotaDimension::per_minute("tpm", QuotaUnit::Tokens, 100),
        ]);
        let start = Instant::now();

        assert!(
            tracker
                .reserve_at(&Demand::new(1, 80, 0), start)
                .unwrap()
                .is_granted()
        );
        let denied = tracker.reserve_at(&Demand::new(1, 50, 0), start).unwrap();
        assert!(!denied.is_granted());

        let usage = tracker.usage();
        assert_eq!(*usage[0].used(), 1);
        assert_eq!(*usage[1].used(), 80);
    }

    #[test]
    fn test_reservation_ids_increase() {
        let tracker = QuotaTracker::unlimited();
        let Admission::Granted(first) = tracker.reserve(&Demand::new(1, 1, 0)).unwrap() else {
            panic!("unlimited tracker denied");
        };
        let Admission::Granted(second) = tracker.reserve(&Demand::new(1, 1, 0)).unwrap() else {
            panic!("unlimited tracker denied");
        };
        assert!(second.id() > first.id());
    }
}
