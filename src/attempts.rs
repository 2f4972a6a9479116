//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//

use crate::retry_policy::BackoffSchedule;
use crate::retry_result::{RetryError, RetryResult};
use std::time::Duration;
use tracing::{debug, trace};

/// Bookkeeping for one retried invocation. Lives on the caller's stack and is
/// dropped when the invocation settles.
pub(crate) struct Attempts<S> {
    schedule: S,
    current: u64,
    waited: Duration,
}

/// What the engine does after an attempt.
pub(crate) enum Next<T, E> {
    Sleep(Duration),
    Settle(Result<T, RetryError<E>>),
}

impl<S: BackoffSchedule> Attempts<S> {
    pub(crate) fn new(schedule: S) -> Self {
        Attempts {
            schedule,
            current: 1,
            waited: Duration::default(),
        }
    }

    /// The attempt about to run, starting at 1.
    pub(crate) fn current(&self) -> u64 {
        self.current
    }

    /// Feed in the verdict of the current attempt.
    pub(crate) fn record<T, E>(&mut self, verdict: RetryResult<T, E>) -> Next<T, E> {
        let error = match verdict {
            RetryResult::Success(value) => {
                trace!("attempt {} succeeded", self.current);
                return Next::Settle(Ok(value));
            }
            RetryResult::Fail(error) => {
                debug!("attempt {} failed with a non-retryable error", self.current);
                return self.settle(error);
            }
            RetryResult::Retry(error) => error,
        };
        match self.schedule.next() {
            Some(delay) => {
                debug!("attempt {} failed, retrying in {:?}", self.current, delay);
                self.current += 1;
                self.waited += delay;
                Next::Sleep(delay)
            }
            None => {
                debug!("attempt {} failed and no attempts are left", self.current);
                self.settle(error)
            }
        }
    }

    fn settle<T, E>(&self, error: E) -> Next<T, E> {
        Next::Settle(Err(RetryError {
            error,
            total_delay: self.waited,
            tries: self.current,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn sleep_of<T, E>(next: Next<T, E>) -> Duration {
        match next {
            Next::Sleep(delay) => delay,
            Next::Settle(_) => panic!("expected another attempt"),
        }
    }

    fn settled<T, E>(next: Next<T, E>) -> Result<T, RetryError<E>> {
        match next {
            Next::Settle(result) => result,
            Next::Sleep(delay) => panic!("expected to settle, got a {:?} wait", delay),
        }
    }

    #[test]
    fn test_counts_attempts_and_waits() {
        let mut attempts = Attempts::new(vec![ms(3), ms(5)].into_iter());
        assert_eq!(attempts.current(), 1);
        assert_eq!(sleep_of(attempts.record::<(), _>(RetryResult::Retry("stale"))), ms(3));
        assert_eq!(attempts.current(), 2);
        assert_eq!(sleep_of(attempts.record::<(), _>(RetryResult::Retry("stale"))), ms(5));
        assert_eq!(attempts.current(), 3);

        let err = settled(attempts.record::<(), _>(RetryResult::Retry("still stale"))).unwrap_err();
        assert_eq!(err.error, "still stale");
        assert_eq!(err.tries, 3);
        assert_eq!(err.total_delay, ms(8));
    }

    #[test]
    fn test_fail_settles_without_consuming_schedule() {
        let mut attempts = Attempts::new(vec![ms(3)].into_iter());
        let err = settled(attempts.record::<(), _>(RetryResult::Fail("denied"))).unwrap_err();
        assert_eq!(err.tries, 1);
        assert_eq!(err.total_delay, ms(0));
        assert_eq!(attempts.schedule.next(), Some(ms(3)));
    }

    #[test]
    fn test_success_after_retry_returns_value() {
        let mut attempts = Attempts::new(vec![ms(2)].into_iter());
        sleep_of(attempts.record::<u8, &str>(RetryResult::Retry("stale")));
        assert_eq!(settled(attempts.record::<u8, &str>(RetryResult::Success(9))), Ok(9));
    }
}
