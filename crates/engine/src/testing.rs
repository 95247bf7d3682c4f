// SPDX-License-Identifier: Apache-2.0

//! Common testing utilities for admission tests.
//!
//! The controller targets a single-threaded async runtime; tests run on a
//! current-thread runtime with a `LocalSet` so `!Send` tasks can be spawned.

use tokio::runtime::Builder;
use tokio::task::LocalSet;

/// Creates a single-threaded runtime with a local task set for testing.
pub fn setup_test_runtime() -> (tokio::runtime::Runtime, LocalSet) {
    let rt = Builder::new_current_thread().enable_all().build().unwrap();
    let local_tasks = LocalSet::new();
    (rt, local_tasks)
}

/// Yields to the local scheduler `n` times, letting spawned tasks progress.
pub async fn ticks(n: usize) {
    for _ in 0..n {
        tokio::task::yield_now().await;
    }
}
