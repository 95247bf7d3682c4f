// SPDX-License-Identifier: Apache-2.0

//! Single-producer, single-consumer one-shot channel optimized for single-threaded async.
//!
//! The channel transfers exactly one value. `send` consumes the sender and hands the
//! value back inside the error when the receiver has already departed, so a caller
//! holding a scarce resource can offer it to the next taker instead of losing it.
//! Dropping the receiver drops an undelivered value in place, which runs its `Drop`
//! hook and lets guard-style payloads release themselves.

use crate::error::{RecvError, SendError};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

struct ChannelState<T> {
    value: Option<T>,
    sender_alive: bool,
    receiver_alive: bool,
    receiver_waker: Option<Waker>,
}

/// Creates a new one-shot channel.
#[must_use]
pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let state = Rc::new(RefCell::new(ChannelState {
        value: None,
        sender_alive: true,
        receiver_alive: true,
        receiver_waker: None,
    }));

    (
        Sender {
            state: state.clone(),
        },
        Receiver { state },
    )
}

/// The sending half of a one-shot channel.
pub struct Sender<T> {
    state: Rc<RefCell<ChannelState<T>>>,
}

/// The receiving half of a one-shot channel.
///
/// The receiver is itself a future resolving to the delivered value, or to
/// [`RecvError::Closed`] if the sender was dropped without sending.
pub struct Receiver<T> {
    state: Rc<RefCell<ChannelState<T>>>,
}

impl<T> Sender<T> {
    /// Delivers a value to the receiver, consuming the sender.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Closed`] carrying the value back when the receiver
    /// has already been dropped.
    pub fn send(self, value: T) -> Result<(), SendError<T>> {
        let mut state = self.state.borrow_mut();

        if !state.receiver_alive {
            return Err(SendError::Closed(value));
        }

        state.value = Some(value);

        if let Some(waker) = state.receiver_waker.take() {
            waker.wake();
        }

        Ok(())
    }

    /// Returns true when the receiver has departed and a `send` would fail.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        !self.state.borrow().receiver_alive
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.sender_alive = false;
        // Wake a parked receiver so it observes the closure.
        if let Some(waker) = state.receiver_waker.take() {
            waker.wake();
        }
    }
}

impl<T> Receiver<T> {
    /// Takes the value if one has been delivered.
    ///
    /// # Errors
    ///
    /// Returns [`RecvError::Empty`] when no value has arrived yet and
    /// [`RecvError::Closed`] when the sender was dropped without sending.
    pub fn try_recv(&mut self) -> Result<T, RecvError> {
        let mut state = self.state.borrow_mut();

        if let Some(value) = state.value.take() {
            Ok(value)
        } else if state.sender_alive {
            Err(RecvError::Empty)
        } else {
            Err(RecvError::Closed)
        }
    }
}

impl<T> Future for Receiver<T> {
    type Output = Result<T, RecvError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.state.borrow_mut();

        if let Some(value) = state.value.take() {
            Poll::Ready(Ok(value))
        } else if !state.sender_alive {
            Poll::Ready(Err(RecvError::Closed))
        } else {
            state.receiver_waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        // Take the undelivered value out of the shared state before dropping it:
        // the value's own Drop may re-enter unrelated shared state and must not
        // run while this channel's cell is borrowed.
        let abandoned = {
            let mut state = self.state.borrow_mut();
            state.receiver_alive = false;
            state.value.take()
        };
        drop(abandoned);
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("sender_alive", &self.state.borrow().sender_alive)
            .finish()
    }
}
