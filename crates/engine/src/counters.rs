// Copyright The Toolgate Authors
// SPDX-License-Identifier: Apache-2.0

//! Admission counters.
//!
//! All counters are "single-threaded" and updated via `Cell`. A snapshot is
//! not globally consistent across fields (it is diagnostic, not accounting),
//! but each field read is itself consistent because no await point can sit
//! inside a read or update sequence.

use crate::overload::RejectReason;
use serde::Serialize;
use std::cell::Cell;

/// Mutable tally of in-flight, queued, and rejected arrivals.
#[derive(Debug, Default)]
pub(crate) struct CounterSet {
    active: Cell<u32>,
    queued: Cell<u32>,
    rejected_queue_full: Cell<u64>,
    rejected_queue_timeout: Cell<u64>,
    rejected_concurrency_limit: Cell<u64>,
}

impl CounterSet {
    pub(crate) fn inc_active(&self) {
        self.active.set(self.active.get() + 1);
    }

    pub(crate) fn dec_active(&self) {
        self.active.set(self.active.get().saturating_sub(1));
    }

    pub(crate) fn inc_queued(&self) {
        self.queued.set(self.queued.get() + 1);
    }

    pub(crate) fn dec_queued(&self) {
        self.queued.set(self.queued.get().saturating_sub(1));
    }

    pub(crate) fn inc_rejected(&self, reason: RejectReason) {
        let counter = match reason {
            RejectReason::QueueFull => &self.rejected_queue_full,
            RejectReason::QueueTimeout => &self.rejected_queue_timeout,
            RejectReason::ConcurrencyLimit => &self.rejected_concurrency_limit,
        };
        counter.set(counter.get() + 1);
    }

    pub(crate) fn queued(&self) -> u32 {
        self.queued.get()
    }

    pub(crate) fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            active: self.active.get(),
            queued: self.queued.get(),
            rejected_queue_full: self.rejected_queue_full.get(),
            rejected_queue_timeout: self.rejected_queue_timeout.get(),
            rejected_concurrency_limit: self.rejected_concurrency_limit.get(),
        }
    }
}

/// Read-only observability snapshot of the admission counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[must_use]
pub struct CounterSnapshot {
    /// Arrivals currently executing.
    pub active: u32,
    /// Arrivals currently parked in the wait queue.
    pub queued: u32,
    /// Cumulative rejections because the wait queue was at capacity.
    pub rejected_queue_full: u64,
    /// Cumulative rejections because the queue deadline fired first.
    pub rejected_queue_timeout: u64,
    /// Cumulative rejections because no queue is configured.
    pub rejected_concurrency_limit: u64,
}

impl CounterSnapshot {
    /// Cumulative rejections across all reasons.
    #[must_use]
    pub const fn rejected_total(&self) -> u64 {
        self.rejected_queue_full + self.rejected_queue_timeout + self.rejected_concurrency_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_and_queued_tally() {
        let counters = CounterSet::default();
        counters.inc_active();
        counters.inc_active();
        counters.inc_queued();
        counters.dec_active();

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.active, 1);
        assert_eq!(snapshot.queued, 1);
        assert_eq!(snapshot.rejected_total(), 0);
    }

    #[test]
    fn test_decrement_saturates() {
        let counters = CounterSet::default();
        counters.dec_active();
        counters.dec_queued();

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.active, 0);
        assert_eq!(snapshot.queued, 0);
    }

    #[test]
    fn test_rejections_tracked_by_reason() {
        let counters = CounterSet::default();
        counters.inc_rejected(RejectReason::QueueFull);
        counters.inc_rejected(RejectReason::QueueFull);
        counters.inc_rejected(RejectReason::QueueTimeout);
        counters.inc_rejected(RejectReason::ConcurrencyLimit);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.rejected_queue_full, 2);
        assert_eq!(snapshot.rejected_queue_timeout, 1);
        assert_eq!(snapshot.rejected_concurrency_limit, 1);
        assert_eq!(snapshot.rejected_total(), 4);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let counters = CounterSet::default();
        counters.inc_active();
        let snapshot = counters.snapshot();
        counters.inc_active();

        assert_eq!(snapshot.active, 1);
        assert_eq!(counters.snapshot().active, 2);
    }
}
