//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//

use crate::failure::{Assertion, Failure, RetryOn};
use crate::outcome::Outcome;
use crate::retry_async::retry_async;
use crate::retry_policy::RetryPolicy;
use crate::retry_result::{RetryError, RetryResult};
use crate::retry_sync::retry_internal;
use futures::FutureExt;
use getset::Getters;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, trace};

/// Runs a callable under a retry policy, retrying the failures `K` selects.
///
/// Every attempt runs under `catch_unwind`, so assertion panics count as
/// failures like returned errors do. When the caller gives up, the last
/// failure is handed back untouched: errors are returned and panics are
/// resumed with their original payload.
///
/// A caller holds no per-invocation state and can be shared between threads.
///
/// A retried panic still passes through the global panic hook, so its message
/// (and a backtrace, if enabled) is printed once per attempt. The test harness
/// captures that output for the test's own thread but not for threads the test
/// spawns. Install a quieter hook with `std::panic::set_hook` if that noise
/// matters.
#[derive(Debug, Clone, Getters)]
pub struct RetryingCaller<K> {
    #[get = "pub"]
    policy: RetryPolicy,
    #[get = "pub"]
    retry_on: K,
}

impl Default for RetryingCaller<Assertion> {
    fn default() -> Self {
        RetryingCaller::new(Assertion)
    }
}

impl<K> RetryingCaller<K> {
    pub fn new(retry_on: K) -> Self {
        RetryingCaller::with_policy(RetryPolicy::default(), retry_on)
    }

    pub fn with_policy(policy: RetryPolicy, retry_on: K) -> Self {
        RetryingCaller { policy, retry_on }
    }

    /// Run `operation` now, retrying it until it succeeds, fails with a
    /// kind outside `K`, or runs out of attempts.
    pub fn call<F, R>(&self, mut operation: F) -> R
    where
        F: FnMut() -> R,
        R: Outcome,
        K: RetryOn<R::Error>,
    {
        let result = retry_internal(self.policy.schedule(), |attempt| {
            trace!("running attempt {} of {}", attempt, self.policy.max_attempts());
            let failure = match panic::catch_unwind(AssertUnwindSafe(&mut operation)) {
                Ok(outcome) => match outcome.into_result() {
                    Ok(value) => return RetryResult::Success(value),
                    Err(e) => Failure::Error(e),
                },
                Err(payload) => Failure::Panic(payload),
            };
            self.classify(failure)
        });
        settle(result)
    }

    /// Like `call`, for callables producing futures. Waits between attempts
    /// with `tokio::time::sleep`, so it must run inside a tokio runtime.
    pub async fn call_async<F, Fut, R>(&self, mut operation: F) -> R
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = R>,
        R: Outcome,
        K: RetryOn<R::Error>,
    {
        let result = retry_async(self.policy.schedule(), || {
            let started = panic::catch_unwind(AssertUnwindSafe(&mut operation));
            async move {
                let finished = match started {
                    Ok(attempt) => AssertUnwindSafe(attempt).catch_unwind().await,
                    Err(payload) => Err(payload),
                };
                let failure = match finished {
                    Ok(outcome) => match outcome.into_result() {
                        Ok(value) => return RetryResult::Success(value),
                        Err(e) => Failure::Error(e),
                    },
                    Err(payload) => Failure::Panic(payload),
                };
                self.classify(failure)
            }
        })
        .await;
        settle(result)
    }

    /// Wrap `operation` so that every call of the returned function runs
    /// under this caller. Nothing runs until the returned function is called.
    pub fn mark<F, R>(self, operation: F) -> impl Fn() -> R
    where
        F: Fn() -> R,
        R: Outcome,
        K: RetryOn<R::Error>,
    {
        move || self.call(&operation)
    }

    fn classify<T, E>(&self, failure: Failure<E>) -> RetryResult<T, Failure<E>>
    where
        K: RetryOn<E>,
    {
        if self.retry_on.matches(&failure) {
            if let Some(msg) = failure.panic_message() {
                debug!("retryable assertion failure: {}", msg);
            }
            RetryResult::Retry(failure)
        } else {
            RetryResult::Fail(failure)
        }
    }
}

/// Turn the engine's verdict back into what the callable itself would have produced.
fn settle<R: Outcome>(result: Result<R::Value, RetryError<Failure<R::Error>>>) -> R {
    match result {
        Ok(value) => R::from_result(Ok(value)),
        Err(err) => {
            debug!(
                "returning last failure after {} attempts and {:?} of backoff",
                err.tries, err.total_delay
            );
            match err.into_inner() {
                Failure::Error(e) => R::from_result(Err(e)),
                Failure::Panic(payload) => panic::resume_unwind(payload),
            }
        }
    }
}
