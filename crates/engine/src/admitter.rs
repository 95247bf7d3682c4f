// Copyright The Toolgate Authors
// SPDX-License-Identifier: Apache-2.0

//! Admission controller (single-threaded, thread-per-core friendly).
//!
//! [`Admitter::admit`] runs the admission protocol for one arrival:
//!
//! 1. **Fast path**: take a free capacity slot and return a [`Permit`].
//! 2. **No queue**: reject with `concurrency_limit`.
//! 3. **Queue entry**: reserve a slot in the bounded wait queue, or reject
//!    with `queue_full`.
//! 4. **Parked**: wait until a releaser hands this waiter a slot (admitted),
//!    or the deadline fires (`queue_timeout`), or the caller stops polling
//!    (cancelled; no payload, nothing leaked).
//!
//! Releasing a permit hands the freed unit directly to the head waiter in
//! the same synchronous section, so a concurrent admitter can never observe
//! free capacity alongside a non-empty queue.

use crate::capacity::{CapacityPool, Permit};
use crate::counters::{CounterSet, CounterSnapshot};
use crate::error::Error;
use crate::overload::{OverloadError, RejectReason};
use crate::queue::{Parked, Ticket, WaitQueue};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use tokio::time::Instant;
use toolgate_config::AdmissionSettings;

/// Observer invoked synchronously on each rejection.
type OverloadObserverFn = dyn Fn(&OverloadError);

/// The decision returned by admission attempts.
#[derive(Debug)]
#[must_use]
pub enum AdmitDecision {
    /// The arrival was admitted. The permit must be kept alive for the
    /// lifetime of the work; dropping it releases the slot.
    Admitted(Permit),
    /// The arrival was rejected with a structured overload payload.
    Rejected(Box<OverloadError>),
}

impl AdmitDecision {
    /// True when the arrival was admitted.
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        matches!(self, AdmitDecision::Admitted(_))
    }

    /// Converts the decision into a `Result`, unboxing the overload payload.
    ///
    /// # Errors
    ///
    /// Returns the overload payload when the arrival was rejected.
    pub fn into_result(self) -> Result<Permit, OverloadError> {
        match self {
            AdmitDecision::Admitted(permit) => Ok(permit),
            AdmitDecision::Rejected(error) => Err(*error),
        }
    }
}

/// Shared state of one admission controller instance.
pub(crate) struct Inner {
    settings: AdmissionSettings,
    pub(crate) counters: CounterSet,
    pub(crate) capacity: CapacityPool,
    pub(crate) queue: WaitQueue,
    observer: RefCell<Option<Rc<OverloadObserverFn>>>,
}

impl Inner {
    /// Fast-path acquisition: unit taken and guard armed in one synchronous
    /// step. No "bare decrement then attach guard later" window exists.
    fn try_acquire(core: &Rc<Self>) -> Option<Permit> {
        if core.capacity.try_take_unit() {
            Some(Permit::grant(Rc::clone(core)))
        } else {
            None
        }
    }

    /// Reserves a wait-queue slot iff the queue is below capacity.
    fn try_reserve(core: &Rc<Self>) -> Option<Ticket> {
        if core.counters.queued() >= core.settings.queue_size {
            return None;
        }
        Some(Ticket::new(Rc::clone(core)))
    }

    /// Hands a released unit to the head waiter or returns it to the free
    /// pool. Runs synchronously from `Permit::drop`, so no admitter can
    /// observe the unit in between.
    pub(crate) fn release_unit(core: &Rc<Self>) {
        loop {
            let Some(handoff) = core.queue.pop_head() else {
                core.capacity.return_unit();
                return;
            };
            if handoff.is_closed() {
                // Waiter already departed; offer the unit to the next one.
                continue;
            }
            let granted = Permit::grant(Rc::clone(core));
            if let Err(refused) = handoff.send(granted) {
                // The reclaimed permit re-runs this release when dropped,
                // offering the unit to the next waiter or freeing it.
                drop(refused.inner());
            }
            return;
        }
    }

    /// Rejects with a snapshot taken now.
    fn reject(&self, reason: RejectReason) -> AdmitDecision {
        let snapshot = self.counters.snapshot();
        self.reject_with_snapshot(reason, snapshot)
    }

    /// Rejects with a caller-provided snapshot. The snapshot is taken before
    /// the reject counter bump and before the observer runs, so the payload
    /// reflects the state that caused the rejection.
    fn reject_with_snapshot(&self, reason: RejectReason, snapshot: CounterSnapshot) -> AdmitDecision {
        let error = OverloadError::new(reason, &snapshot, &self.settings);
        self.counters.inc_rejected(reason);
        tracing::debug!(
            reason = %reason,
            active = snapshot.active,
            queued = snapshot.queued,
            "admission rejected"
        );
        self.notify_observer(&error);
        AdmitDecision::Rejected(Box::new(error))
    }

    fn notify_observer(&self, error: &OverloadError) {
        let observer = self.observer.borrow().clone();
        if let Some(observer) = observer {
            // A failing observer must not replace the structured overload
            // result returned to the caller.
            let outcome = catch_unwind(AssertUnwindSafe(|| observer(error)));
            if outcome.is_err() {
                tracing::warn!(reason = %error.reason(), "overload observer panicked; ignoring");
            }
        }
    }
}

/// Admission controller (single-threaded).
///
/// Bounds in-flight work at `max_concurrent`, optionally parks up to
/// `queue_size` arrivals for at most `queue_timeout` each, and rejects the
/// rest with a structured overload payload.
///
/// Note: This type is `Rc`-based and not thread-safe. It is intended to be
/// used in a thread-per-core model where each core has its own `Admitter`
/// instance. Cloning is cheap and hands out another handle to the same
/// instance.
#[derive(Clone)]
#[must_use]
pub struct Admitter {
    inner: Rc<Inner>,
}

impl Admitter {
    /// Constructs a new `Admitter` from validated settings.
    ///
    /// # Errors
    ///
    /// Returns a config error when the settings fail validation
    /// (`max_concurrent` must be at least 1).
    pub fn new(settings: AdmissionSettings) -> Result<Self, Error> {
        settings.validate().map_err(Box::new)?;
        Ok(Self {
            inner: Rc::new(Inner {
                counters: CounterSet::default(),
                capacity: CapacityPool::new(settings.max_concurrent),
                queue: WaitQueue::default(),
                observer: RefCell::new(None),
                settings,
            }),
        })
    }

    /// Registers an observer invoked synchronously on every rejection with
    /// the full overload payload. A panicking observer is isolated and does
    /// not affect the rejection result. Replaces any previous observer.
    pub fn set_overload_observer(&self, observer: impl Fn(&OverloadError) + 'static) {
        *self.inner.observer.borrow_mut() = Some(Rc::new(observer));
    }

    /// Admits, parks, or rejects one arrival.
    ///
    /// On `Admitted`, the caller runs the downstream handler while holding
    /// the permit and drops it afterwards; the freed slot is handed to the
    /// head waiter, if any. On `Rejected`, the payload carries the reason
    /// and a counter snapshot from the rejection instant.
    ///
    /// # Cancellation Safety
    ///
    /// The future suspends in at most one place (parked on the wait queue).
    /// Dropping it at any point releases every acquired resource: the queue
    /// slot, the `queued` count, and a capacity unit that was handed off but
    /// not yet claimed. Cancellation produces no rejection payload and bumps
    /// no reject counter.
    pub async fn admit(&self) -> AdmitDecision {
        // Step A: fast path.
        if let Some(permit) = Inner::try_acquire(&self.inner) {
            return AdmitDecision::Admitted(permit);
        }

        // Step B: no queue configured.
        if !self.inner.settings.queue_enabled() {
            return self.inner.reject(RejectReason::ConcurrencyLimit);
        }

        // Step C: try to enter the queue.
        let Some(mut ticket) = Inner::try_reserve(&self.inner) else {
            return self.inner.reject(RejectReason::QueueFull);
        };

        // Step D: parked until handoff or deadline.
        let deadline = Instant::now()
            .checked_add(self.inner.settings.queue_timeout)
            .expect("queue_timeout must not overflow Instant");
        match ticket.park(deadline).await {
            Parked::Woken(permit) => AdmitDecision::Admitted(permit),
            Parked::TimedOut => {
                // Snapshot before the ticket releases the queue slot: the
                // payload counts the timed-out waiter itself as queued.
                let snapshot = self.inner.counters.snapshot();
                drop(ticket);
                self.inner
                    .reject_with_snapshot(RejectReason::QueueTimeout, snapshot)
            }
        }
    }

    /// Admits one arrival and, when admitted, runs `work` while holding the
    /// permit. The permit is released on every exit path, including an
    /// unwinding `work`.
    ///
    /// # Errors
    ///
    /// Returns the overload payload when the arrival was rejected.
    pub async fn run<F: Future>(&self, work: F) -> Result<F::Output, OverloadError> {
        let permit = self.admit().await.into_result()?;
        let output = work.await;
        drop(permit);
        Ok(output)
    }

    /// Read-only observability snapshot of the admission counters.
    pub fn metrics(&self) -> CounterSnapshot {
        self.inner.counters.snapshot()
    }
}

impl fmt::Debug for Admitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Admitter")
            .field("settings", &self.inner.settings)
            .field("counters", &self.inner.counters)
            .finish_non_exhaustive()
    }
}
