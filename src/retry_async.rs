/*
 * Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 */

use crate::attempts::{Attempts, Next};
use crate::retry_policy::BackoffSchedule;
use crate::retry_result::{RetryError, RetryResult};
use std::future::Future;
use tokio::time::sleep;

/// Async counterpart of `retry_sync`. Waits with `tokio::time::sleep`, so it
/// must be polled inside a tokio runtime.
pub async fn retry_async<F, T, E>(
    retry_schedule: impl BackoffSchedule,
    mut operation: impl FnMut() -> F,
) -> Result<T, RetryError<E>>
where
    F: Future<Output = RetryResult<T, E>>,
{
    let mut attempts = Attempts::new(retry_schedule);
    loop {
        let verdict = operation().await;
        match attempts.record(verdict) {
            Next::Sleep(delay) => sleep(delay).await,
            Next::Settle(result) => return result,
        }
    }
}
