// Copyright The Toolgate Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the channels.
//!
//! Important note: It is important not to use `!Send` data types in errors (e.g. avoid using Rc) to
//! ensure these errors can be emitted in both `Send` and `!Send` contexts.

/// Errors that can occur sending a value to a channel.
#[derive(thiserror::Error, Debug)]
pub enum SendError<T> {
    /// The receiving side has departed and the value could not be delivered.
    #[error("Channel is closed and the value could not be delivered")]
    Closed(T),
}

impl<T> SendError<T> {
    /// Returns the value that could not be delivered; useful for callers that
    /// want the value back to offer it elsewhere.
    pub fn inner(self) -> T {
        match self {
            Self::Closed(t) => t,
        }
    }
}

/// Errors that can occur when consuming a value from a channel.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RecvError {
    /// The sending side was dropped without delivering a value.
    #[error("The channel is closed")]
    Closed,

    /// No value has been delivered yet.
    #[error("The channel is empty")]
    Empty,
}
