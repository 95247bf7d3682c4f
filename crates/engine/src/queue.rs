// Copyright The Toolgate Authors
// SPDX-License-Identifier: Apache-2.0

//! Bounded FIFO wait queue for admission attempts.
//!
//! Each parked waiter is a one-shot channel: the sending half sits in the
//! queue for a releaser to hand a [`Permit`] through, the receiving half is
//! held by the waiter's [`Ticket`] and awaited with a deadline. The ticket is
//! the queue-slot guard: while it is alive the waiter counts as queued, and
//! dropping it (on wake, timeout, or caller cancellation) releases the slot
//! exactly once and re-releases a permit that was delivered but never claimed.

use crate::admitter::Inner;
use crate::capacity::Permit;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use tokio::time::Instant;
use toolgate_channel::oneshot;

/// FIFO of handoff channels, one per parked waiter.
#[derive(Debug, Default)]
pub(crate) struct WaitQueue {
    entries: RefCell<VecDeque<WaiterEntry>>,
    next_seq: Cell<u64>,
}

#[derive(Debug)]
struct WaiterEntry {
    seq: u64,
    handoff: oneshot::Sender<Permit>,
}

impl WaitQueue {
    /// Appends a waiter, returning the sequence number identifying its entry.
    fn push(&self, handoff: oneshot::Sender<Permit>) -> u64 {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.entries
            .borrow_mut()
            .push_back(WaiterEntry { seq, handoff });
        seq
    }

    /// Detaches the head waiter's handoff channel, oldest first.
    pub(crate) fn pop_head(&self) -> Option<oneshot::Sender<Permit>> {
        self.entries.borrow_mut().pop_front().map(|e| e.handoff)
    }

    /// Removes the entry with the given sequence number, if still parked.
    fn remove(&self, seq: u64) {
        let mut entries = self.entries.borrow_mut();
        if let Some(index) = entries.iter().position(|e| e.seq == seq) {
            drop(entries.remove(index));
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// Outcome of parking on the wait queue.
#[derive(Debug)]
pub(crate) enum Parked {
    /// A releaser handed this waiter a capacity unit.
    Woken(Permit),
    /// The deadline fired before a unit arrived.
    TimedOut,
}

/// A reserved queue slot.
///
/// Reservation, the `queued` counter increment, and the release guard are a
/// single synchronous step; there is no point at which the slot is held
/// without a guard armed.
pub(crate) struct Ticket {
    core: Rc<Inner>,
    seq: u64,
    handoff: oneshot::Receiver<Permit>,
}

impl Ticket {
    pub(crate) fn new(core: Rc<Inner>) -> Self {
        let (tx, rx) = oneshot::channel();
        let seq = core.queue.push(tx);
        core.counters.inc_queued();
        Self {
            core,
            seq,
            handoff: rx,
        }
    }

    /// Parks until a unit is handed off or the deadline fires.
    ///
    /// The select is biased toward the handoff: a waiter that won the race
    /// before its deadline observes `Woken`, not `TimedOut`, even when both
    /// are ready at the same poll.
    pub(crate) async fn park(&mut self, deadline: Instant) -> Parked {
        tokio::select! {
            biased;
            received = &mut self.handoff => match received {
                Ok(permit) => Parked::Woken(permit),
                // Entries are removed only by this ticket's own Drop, so the
                // sending half cannot disappear while we are parked.
                Err(_) => unreachable!("waiter handoff closed while parked"),
            },
            () = tokio::time::sleep_until(deadline) => Parked::TimedOut,
        }
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.core.queue.remove(self.seq);
        self.core.counters.dec_queued();
        // The receiver half drops with this ticket; a permit that was
        // delivered but never claimed is dropped with it, and its own Drop
        // hands the unit to the next waiter or frees it.
    }
}
