// Copyright The Toolgate Authors
// SPDX-License-Identifier: Apache-2.0

//! Admission settings.
//!
//! This module contains the sizing and overload-surface configuration of the
//! admission controller.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Admission controller configuration.
///
/// `max_concurrent` bounds in-flight work; `queue_size` (0 disables queueing)
/// bounds how many arrivals may wait for a slot, each for at most
/// `queue_timeout`. The overload error code is opaque to the controller and
/// only embedded in the structured rejection payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AdmissionSettings {
    /// Maximum number of requests executing at once. Must be at least 1.
    pub max_concurrent: u32,

    /// Number of arrivals allowed to wait for a free slot. 0 disables queueing.
    #[serde(default)]
    pub queue_size: u32,

    /// How long a queued arrival may wait before it is rejected.
    /// Ignored when `queue_size` is 0.
    #[serde(with = "humantime_serde", default = "default_queue_timeout")]
    pub queue_timeout: Duration,

    /// JSON-RPC error code carried by overload rejections.
    #[serde(default = "default_overload_error_code")]
    pub overload_error_code: i32,
}

const fn default_queue_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_overload_error_code() -> i32 {
    -32001
}

impl AdmissionSettings {
    /// Creates settings with the given concurrency limit and defaults for
    /// everything else (no queue, 30s queue timeout, code -32001).
    #[must_use]
    pub const fn new(max_concurrent: u32) -> Self {
        Self {
            max_concurrent,
            queue_size: 0,
            queue_timeout: default_queue_timeout(),
            overload_error_code: default_overload_error_code(),
        }
    }

    /// Enables queueing with the given capacity and wait deadline.
    #[must_use]
    pub const fn with_queue(mut self, queue_size: u32, queue_timeout: Duration) -> Self {
        self.queue_size = queue_size;
        self.queue_timeout = queue_timeout;
        self
    }

    /// Overrides the JSON-RPC error code used for overload rejections.
    #[must_use]
    pub const fn with_overload_error_code(mut self, code: i32) -> Self {
        self.overload_error_code = code;
        self
    }

    /// True when a wait queue is configured.
    #[must_use]
    pub const fn queue_enabled(&self) -> bool {
        self.queue_size > 0
    }

    /// The queue timeout in whole milliseconds, saturating on overflow.
    #[must_use]
    pub fn queue_timeout_ms(&self) -> u64 {
        u64::try_from(self.queue_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Validate the admission settings.
    ///
    /// Returns an error if `max_concurrent` is 0. Negative sizes and timeouts
    /// are unrepresentable by construction (`u32` / `Duration`).
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_concurrent == 0 {
            return Err(Error::InvalidMaxConcurrent {
                value: self.max_concurrent,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to parse YAML into AdmissionSettings.
    fn parse(yaml: &str) -> AdmissionSettings {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_defaults() {
        // Constructor defaults match serde defaults.
        let settings = AdmissionSettings::new(8);
        assert_eq!(settings.max_concurrent, 8);
        assert_eq!(settings.queue_size, 0);
        assert_eq!(settings.queue_timeout, Duration::from_secs(30));
        assert_eq!(settings.overload_error_code, -32001);

        let parsed = parse("max_concurrent: 8");
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_humantime_durations() {
        let settings = parse("{ max_concurrent: 2, queue_size: 4, queue_timeout: 250ms }");
        assert_eq!(settings.queue_timeout, Duration::from_millis(250));
        assert_eq!(settings.queue_timeout_ms(), 250);

        let settings = parse("{ max_concurrent: 2, queue_timeout: 1m 30s }");
        assert_eq!(settings.queue_timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result =
            serde_yaml::from_str::<AdmissionSettings>("{ max_concurrent: 2, max_rate: 10 }");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let err = AdmissionSettings::new(0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidMaxConcurrent { value: 0 }));
        assert!(err.to_string().contains("max_concurrent"));
    }

    #[test]
    fn test_validate_accepts_queueless() {
        assert!(AdmissionSettings::new(1).validate().is_ok());
    }

    #[test]
    fn test_queue_enabled() {
        assert!(!AdmissionSettings::new(1).queue_enabled());
        assert!(
            AdmissionSettings::new(1)
                .with_queue(2, Duration::from_secs(5))
                .queue_enabled()
        );
    }

    #[test]
    fn test_json_round_trip() {
        let settings = AdmissionSettings::new(4).with_queue(16, Duration::from_secs(10));
        let json = serde_json::to_string(&settings).unwrap();
        let back: AdmissionSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
