// Copyright The Toolgate Authors
// SPDX-License-Identifier: Apache-2.0

//! Toolgate admission controller configuration.
//!
//! Data model:
//! - admission settings
//!   - concurrency limit (required)
//!   - wait queue sizing and deadline (optional)
//!   - overload error surface (JSON-RPC error code)
//!
//! Settings are immutable after construction. [`AdmissionSettings::validate`]
//! enforces the config-time rules; the engine constructor calls it, so an
//! invalid configuration is rejected before any request is admitted.

pub mod error;
pub mod settings;

pub use error::Error;
pub use settings::AdmissionSettings;
