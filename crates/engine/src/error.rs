// Copyright The Toolgate Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the admission engine.
//!
//! These cover construction time only. At runtime, overload is reported as a
//! value ([`crate::overload::OverloadError`]) and never as an error.

/// All errors that can occur in the admission engine infrastructure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A wrapper for the config errors.
    #[error("A config error occurred: {0}")]
    ConfigError(#[from] Box<toolgate_config::Error>),
}
