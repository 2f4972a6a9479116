//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//

//! Tools for dealing with eventually consistent tests.
//!
//! A test that reads from a remote service right after writing to it may see
//! stale data for a little while. Wrapping the check in [`call`] (or the whole
//! test body in [`mark`]) retries it with exponential backoff until the
//! assertion holds or the attempts run out:
//! ```
//! # use eventually_consistent::call;
//! # use std::cell::Cell;
//! let replicated = Cell::new(0);
//! call(|| {
//!     replicated.set(replicated.get() + 1);
//!     assert!(replicated.get() >= 2, "row not visible yet");
//! });
//! assert_eq!(replicated.get(), 2);
//! ```
//! The callable runs immediately. It is retried up to 3 times in total,
//! waiting 100ms before the second attempt and 200ms before the third.
//! If every attempt fails, the last assertion failure is raised again exactly
//! as the callable raised it.
//!
//! Fallible callables work too. The retried kinds are chosen with [`call_with`]:
//! ```
//! # use eventually_consistent::{call_with, AnyError};
//! let mut reads = vec![None, None, Some(10)].into_iter();
//! let rows: Result<i32, String> = call_with(
//!     || reads.next().flatten().ok_or_else(|| "not found".to_owned()),
//!     AnyError,
//!     3,
//! );
//! assert_eq!(rows, Ok(10));
//! ```

#![deny(
    clippy::all,
    clippy::cargo,
    clippy::else_if_without_else,
    clippy::empty_line_after_outer_attr,
    clippy::multiple_inherent_impl,
    clippy::mut_mut,
    clippy::path_buf_push_overwrite
)]
#![warn(
    clippy::cargo_common_metadata,
    clippy::mutex_integer,
    clippy::needless_borrow,
    clippy::similar_names
)]
#![allow(clippy::multiple_crate_versions)]

mod attempts;
pub mod caller;
pub mod error;
pub mod failure;
pub mod outcome;
pub mod retry_async;
pub mod retry_policy;
pub mod retry_result;
pub mod retry_sync;
pub mod trace;

pub use caller::RetryingCaller;
pub use error::Error;
pub use failure::{error_of, when, AnyError, AnyPanic, Assertion, ErrorOf, Failure, RetryOn};
pub use outcome::Outcome;
pub use retry_policy::RetryPolicy;

use std::future::Future;

/// Marks an entire test as eventually consistent.
///
/// Returns a function that runs `f` with up to 3 attempts, retrying only
/// assertion failures. Nothing runs until the returned function is called.
pub fn mark<F, R>(f: F) -> impl Fn() -> R
where
    F: Fn() -> R,
    R: Outcome,
{
    RetryingCaller::new(Assertion).mark(f)
}

/// Call `f` now and treat it as eventually consistent: up to 3 attempts,
/// retrying assertion failures only.
pub fn call<F, R>(f: F) -> R
where
    F: FnMut() -> R,
    R: Outcome,
{
    RetryingCaller::new(Assertion).call(f)
}

/// Call `f` now, retrying the failures `exceptions` selects, with up to
/// `tries` attempts in total. A `tries` of 0 still runs `f` once.
pub fn call_with<F, R, K>(f: F, exceptions: K, tries: u32) -> R
where
    F: FnMut() -> R,
    R: Outcome,
    K: RetryOn<R::Error>,
{
    RetryingCaller::with_policy(RetryPolicy::with_max_attempts(tries), exceptions).call(f)
}

/// The async version of [`call`], for tests running on tokio.
pub async fn call_async<F, Fut, R>(f: F) -> R
where
    F: FnMut() -> Fut,
    Fut: Future<Output = R>,
    R: Outcome,
{
    RetryingCaller::new(Assertion).call_async(f).await
}
