//! Sliding-window consumption log for a single quota dimension.

use crate::QuotaDimension;
use std::collections::VecDeque;
use tokio::time::Instant;

/// Identifies the consumption events committed by one reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReservationId(pub(crate) u64);

#[derive(Debug, Clone)]
struct ConsumptionEvent {
    at: Instant,
    amount: u64,
    reservation: ReservationId,
}

/// Pruned, timestamped event log.
///
/// An event committed at `t` counts against the window for every instant in
/// `[t, t + window)`. Events are appended in timestamp and reservation order,
/// so the oldest event is always at the front.
#[derive(Debug, Clone)]
pub(crate) struct SlidingWindow {
    dimension: QuotaDimension,
    events: VecDeque<ConsumptionEvent>,
    used: u64,
}

impl SlidingWindow {
    pub(crate) fn new(dimension: QuotaDimension) -> Self {
        Self {
            dimension,
            events: VecDeque::new(),
            used: 0,
        }
    }

    pub(crate) fn dimension(&self) -> &QuotaDimension {
        &self.dimension
    }

    pub(crate) fn dimension_mut(&mut self) -> &mut QuotaDimension {
        &mut self.dimension
    }

    pub(crate) fn used(&self) -> u64 {
        self.used
    }

    /// Drops every event whose window has fully elapsed at `now`.
    pub(crate) fn prune(&mut self, now: Instant) {
        let window = *self.dimension.window();
        while let Some(front) = self.events.front() {
            if front.at + window > now {
                break;
            }
            self.used -= front.amount;
            self.events.pop_front();
        }
    }

    /// Earliest instant at which `amount` more units fit.
    ///
    /// Assumes the window has been pruned at `now` and that `amount` does not
    /// exceed the capacity.
    pub(crate) fn available_at(&self, amount: u64, now: Instant) -> Instant {
        let capacity = *self.dimension.capacity();
        if self.used + amount <= capacity {
            return now;
        }

        let window = *self.dimension.window();
        let mut freed = 0;
        for event in &self.events {
            freed += event.amount;
            if self.used - freed + amount <= capacity {
                return event.at + window;
            }
        }

        // Only reachable when the capacity was lowered below the demand.
        self.events.back().map(|e| e.at + window).unwrap_or(now)
    }

    pub(crate) fn commit(&mut self, at: Instant, amount: u64, reservation: ReservationId) {
        self.events.push_back(ConsumptionEvent {
            at,
            amount,
            reservation,
        });
        self.used += amount;
    }

    /// Replaces the amount recorded for `reservation`, if its event is still
    /// inside the window. Returns the previous amount.
    pub(crate) fn adjust(&mut self, reservation: ReservationId, actual: u64) -> Option<u64> {
        let index = self
            .events
            .binary_search_by_key(&reservation, |e| e.reservation)
            .ok()?;
        let event = &mut self.events[index];
        let previous = event.amount;
        self.used = self.used - previous + actual;
        event.amount = actual;
        Some(previous)
    }
}
