// Copyright The Toolgate Authors
// SPDX-License-Identifier: Apache-2.0

//! Structured overload rejections.
//!
//! Overload is a value, not an exception: the admitter returns an
//! [`OverloadError`] shaped exactly like a JSON-RPC error object (`code`,
//! `message`, `data`) so the host serializer can embed it verbatim. The
//! payload layout is stable across versions.

use crate::counters::CounterSnapshot;
use serde::Serialize;
use std::fmt;
use toolgate_config::AdmissionSettings;

/// Fixed `message` string carried by every overload rejection.
pub const OVERLOAD_MESSAGE: &str = "SERVER_OVERLOADED";

/// Advisory retry delay used when no queue is configured.
const DEFAULT_RETRY_AFTER_MS: u64 = 1_000;

/// Why an arrival was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The wait queue was already at capacity.
    QueueFull,
    /// The arrival was parked and its deadline fired before a slot was handed off.
    QueueTimeout,
    /// No slot was free and no queue is configured.
    ConcurrencyLimit,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RejectReason::QueueFull => "queue_full",
            RejectReason::QueueTimeout => "queue_timeout",
            RejectReason::ConcurrencyLimit => "concurrency_limit",
        };
        write!(f, "{label}")
    }
}

/// A structured overload rejection.
///
/// Serializes to the stable wire shape:
///
/// ```json
/// {
///   "code": -32001,
///   "message": "SERVER_OVERLOADED",
///   "data": {
///     "reason": "queue_full",
///     "active": 4,
///     "queued": 2,
///     "max_concurrent": 4,
///     "queue_size": 2,
///     "queue_timeout_ms": 30000,
///     "retry_after_ms": 30000
///   }
/// }
/// ```
#[derive(thiserror::Error, Debug, Clone, Serialize)]
#[error("{message}: {} (active={}, queued={})", .data.reason, .data.active, .data.queued)]
pub struct OverloadError {
    /// JSON-RPC error code; opaque to the controller.
    pub code: i32,
    /// Always [`OVERLOAD_MESSAGE`].
    pub message: &'static str,
    /// Diagnostic payload describing the overload.
    pub data: OverloadData,
}

/// Diagnostic payload embedded in an overload rejection.
///
/// `active` and `queued` come from the counter snapshot taken at the moment
/// of rejection; the remaining fields restate the configuration so a client
/// can size its retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverloadData {
    /// Why the arrival was rejected.
    pub reason: RejectReason,
    /// Arrivals executing when the rejection was decided.
    pub active: u32,
    /// Arrivals parked when the rejection was decided.
    pub queued: u32,
    /// Configured concurrency limit.
    pub max_concurrent: u32,
    /// Configured wait queue capacity.
    pub queue_size: u32,
    /// Configured queue deadline in milliseconds.
    pub queue_timeout_ms: u64,
    /// Advisory delay before the client should retry.
    pub retry_after_ms: u64,
}

impl OverloadError {
    /// Builds the rejection payload from the snapshot taken at the rejection
    /// instant and the immutable settings.
    pub(crate) fn new(
        reason: RejectReason,
        snapshot: &CounterSnapshot,
        settings: &AdmissionSettings,
    ) -> Self {
        let retry_after_ms = if settings.queue_enabled() {
            settings.queue_timeout_ms()
        } else {
            DEFAULT_RETRY_AFTER_MS
        };
        Self {
            code: settings.overload_error_code,
            message: OVERLOAD_MESSAGE,
            data: OverloadData {
                reason,
                active: snapshot.active,
                queued: snapshot.queued,
                max_concurrent: settings.max_concurrent,
                queue_size: settings.queue_size,
                queue_timeout_ms: settings.queue_timeout_ms(),
                retry_after_ms,
            },
        }
    }

    /// The rejection reason.
    #[must_use]
    pub const fn reason(&self) -> RejectReason {
        self.data.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn snapshot(active: u32, queued: u32) -> CounterSnapshot {
        CounterSnapshot {
            active,
            queued,
            rejected_queue_full: 0,
            rejected_queue_timeout: 0,
            rejected_concurrency_limit: 0,
        }
    }

    #[test]
    fn test_reason_labels_match_wire_strings() {
        for (reason, label) in [
            (RejectReason::QueueFull, "queue_full"),
            (RejectReason::QueueTimeout, "queue_timeout"),
            (RejectReason::ConcurrencyLimit, "concurrency_limit"),
        ] {
            assert_eq!(reason.to_string(), label);
            assert_eq!(serde_json::to_value(reason).unwrap(), label);
        }
    }

    #[test]
    fn test_payload_shape_is_stable() {
        let settings = AdmissionSettings::new(4).with_queue(2, Duration::from_secs(30));
        let error = OverloadError::new(RejectReason::QueueFull, &snapshot(4, 2), &settings);

        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["code"], -32001);
        assert_eq!(value["message"], "SERVER_OVERLOADED");
        assert_eq!(value["data"]["reason"], "queue_full");
        assert_eq!(value["data"]["active"], 4);
        assert_eq!(value["data"]["queued"], 2);
        assert_eq!(value["data"]["max_concurrent"], 4);
        assert_eq!(value["data"]["queue_size"], 2);
        assert_eq!(value["data"]["queue_timeout_ms"], 30_000);
        assert_eq!(value["data"]["retry_after_ms"], 30_000);
    }

    #[test]
    fn test_retry_after_without_queue() {
        let settings = AdmissionSettings::new(2);
        let error = OverloadError::new(RejectReason::ConcurrencyLimit, &snapshot(2, 0), &settings);

        assert_eq!(error.data.retry_after_ms, 1_000);
        assert_eq!(error.reason(), RejectReason::ConcurrencyLimit);
    }

    #[test]
    fn test_custom_error_code() {
        let settings = AdmissionSettings::new(1).with_overload_error_code(-32099);
        let error = OverloadError::new(RejectReason::ConcurrencyLimit, &snapshot(1, 0), &settings);
        assert_eq!(error.code, -32099);
    }

    #[test]
    fn test_display_names_reason() {
        let settings = AdmissionSettings::new(1);
        let error = OverloadError::new(RejectReason::ConcurrencyLimit, &snapshot(1, 0), &settings);
        let rendered = error.to_string();
        assert!(rendered.contains("SERVER_OVERLOADED"));
        assert!(rendered.contains("concurrency_limit"));
    }
}
