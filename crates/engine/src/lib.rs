// Copyright The Toolgate Authors
// SPDX-License-Identifier: Apache-2.0

//! Backpressure admission control for request-handler pipelines.
//!
//! The [`admitter::Admitter`] sits in front of a handler chain (typically tool
//! invocations in a JSON-RPC server) and decides, per arrival, whether to run
//! it now, park it in a bounded wait queue, or reject it with a structured
//! overload payload:
//!
//! - **Fast path**: a free capacity slot exists, the arrival runs immediately
//!   holding a [`capacity::Permit`].
//! - **Queued path**: all slots are busy but the wait queue has room; the
//!   arrival parks until a releaser hands it a slot or its deadline fires.
//! - **Reject path**: no slot and no queue room (or no queue at all); the
//!   arrival gets an [`overload::OverloadError`] value, never an exception.
//!
//! Every acquired resource (capacity slot, queue slot, counter increment) is
//! owned by a guard armed in the same synchronous section as the acquisition,
//! so a caller that stops polling `admit` at any point leaks nothing.
//!
//! Note: The controller is `Rc`-based and not thread-safe. It is intended to
//! be used in a thread-per-core model where each core has its own instance
//! running on a single-threaded async runtime.

pub mod admitter;
pub mod capacity;
pub mod counters;
pub mod error;
pub mod overload;

mod queue;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use admitter::{AdmitDecision, Admitter};
pub use capacity::Permit;
pub use counters::CounterSnapshot;
pub use overload::{OverloadError, RejectReason};
