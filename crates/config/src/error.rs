// Copyright The Toolgate Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the config crate.

use miette::Diagnostic;

/// Errors that can occur while validating admission settings.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum Error {
    /// The concurrency limit is outside its allowed range.
    #[error("`max_concurrent` must be at least 1 (got {value})")]
    #[diagnostic(code(admission::invalid_max_concurrent), url(docsrs))]
    InvalidMaxConcurrent {
        /// The rejected value.
        value: u32,
    },
}
