// SPDX-License-Identifier: MPL-2.0

//! Shared async runtime for the command-line front end.
//!
//! The binary is synchronous at the top; every network-bound operation is
//! driven through this one runtime instead of building a runtime per command.

use once_cell::sync::Lazy;
use std::future::Future;
use tokio::runtime::Runtime;

/// Two workers; each command runs its pipeline steps in sequence.
static RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("pagectx-async")
        .build()
        .expect("failed to create async runtime")
});

/// Execute a future on the shared runtime, blocking until completion.
pub fn block_on<F: Future>(future: F) -> F::Output {
    RUNTIME.block_on(future)
}
