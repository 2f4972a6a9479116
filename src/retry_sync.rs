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
use std::thread::sleep;

/// Run `operation` until it succeeds, returns `Fail`, or the schedule runs dry.
/// Waits block the calling thread.
pub fn retry_sync<O, T, E>(retry_schedule: impl BackoffSchedule, mut operation: O) -> Result<T, RetryError<E>>
where
    O: FnMut() -> RetryResult<T, E>,
{
    retry_internal(retry_schedule, |_| operation())
}

/// Same as `retry_sync`, but the operation is told which attempt it is running, starting at 1.
pub fn retry_internal<O, T, E>(retry_schedule: impl BackoffSchedule, mut operation: O) -> Result<T, RetryError<E>>
where
    O: FnMut(u64) -> RetryResult<T, E>,
{
    let mut attempts = Attempts::new(retry_schedule);
    loop {
        let verdict = operation(attempts.current());
        match attempts.record(verdict) {
            Next::Sleep(delay) => sleep(delay),
            Next::Settle(result) => return result,
        }
    }
}
