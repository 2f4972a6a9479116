/*
 * Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 */

use crate::error::Error;
use derive_builder::*;
use getset::CopyGetters;
use num::checked_pow;
use std::iter::Iterator;
use std::time::Duration;

/// Delay before the first retry.
pub const BASE_DELAY: Duration = Duration::from_millis(100);
/// No delay between attempts ever exceeds this.
pub const MAX_DELAY: Duration = Duration::from_millis(1000);
/// Total invocations, first attempt included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const BACKOFF_COEFFICIENT: u32 = 2;

/// A sequence of delays, one per retry.
/// The engine stops retrying when the sequence ends.
pub trait BackoffSchedule: Iterator<Item = Duration> {}

/// Any implementation which implements the Iterator trait would also implement BackoffSchedule.
impl<T> BackoffSchedule for T where T: Iterator<Item = Duration> {}

/// How often and how patiently a callable is retried.
///
/// The default is the policy used by `mark` and `call`: three attempts, waiting
/// 100ms before the second and 200ms before the third. Longer policies keep
/// doubling until the wait reaches one second and stay there.
#[derive(Builder, Debug, CopyGetters, Clone, Copy, PartialEq, Eq)]
#[builder(setter(into), build_fn(validate = "Self::validate", error = "Error"))]
pub struct RetryPolicy {
    #[get_copy = "pub"]
    #[builder(default = "BASE_DELAY")]
    base_delay: Duration,

    #[get_copy = "pub"]
    #[builder(default = "MAX_DELAY")]
    max_delay: Duration,

    #[get_copy = "pub"]
    #[builder(default = "DEFAULT_MAX_ATTEMPTS")]
    max_attempts: u32,
}

impl RetryPolicyBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_attempts == Some(0) {
            return Err("max_attempts must be at least 1".to_owned());
        }
        let base = self.base_delay.unwrap_or(BASE_DELAY);
        let max = self.max_delay.unwrap_or(MAX_DELAY);
        if base > max {
            return Err(format!(
                "base_delay {:?} is longer than max_delay {:?}",
                base, max
            ));
        }
        Ok(())
    }
}

impl From<UninitializedFieldError> for Error {
    fn from(e: UninitializedFieldError) -> Self {
        Error::InvalidPolicy { msg: e.to_string() }
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::InvalidPolicy { msg }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            base_delay: BASE_DELAY,
            max_delay: MAX_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// The default backoff with a different attempt budget.
    /// Zero attempts still runs the callable once.
    pub fn with_max_attempts(tries: u32) -> Self {
        RetryPolicy {
            max_attempts: tries.max(1),
            ..RetryPolicy::default()
        }
    }

    /// The wait before the given attempt, numbered from 1.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::from_millis(0);
        }
        backoff_delay(self.base_delay, self.max_delay, attempt - 2)
    }

    /// The delays this policy sleeps for, in order.
    pub fn schedule(&self) -> RetryWithBackoff {
        RetryWithBackoff::default()
            .initial_delay(self.base_delay)
            .max_delay(self.max_delay)
            .max_attempt(self.max_attempts.saturating_sub(1) as usize)
    }
}

fn backoff_delay(initial_delay: Duration, max_delay: Duration, exponent: u32) -> Duration {
    checked_pow(BACKOFF_COEFFICIENT, exponent as usize)
        .and_then(|coefficient| initial_delay.checked_mul(coefficient))
        .map_or(max_delay, |delay| delay.min(max_delay))
}

/// Exponential backoff as an iterator of delays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryWithBackoff {
    attempt: usize,

    initial_delay: Duration,
    max_attempt: Option<usize>,
    max_delay: Duration,
}

impl Default for RetryWithBackoff {
    fn default() -> Self {
        RetryWithBackoff {
            attempt: 0,
            initial_delay: BASE_DELAY,
            max_attempt: None,
            max_delay: MAX_DELAY,
        }
    }
}

impl RetryWithBackoff {
    /// Apply a initial delay.
    pub fn initial_delay(mut self, initial_delay: Duration) -> RetryWithBackoff {
        self.initial_delay = initial_delay;
        self
    }

    /// Apply a maximum number of retries. The iterator ends after this many delays.
    pub fn max_attempt(mut self, attempt: usize) -> RetryWithBackoff {
        self.max_attempt = Some(attempt);
        self
    }

    /// Apply a maximum delay. No retry delay will be longer than this `Duration`.
    pub fn max_delay(mut self, duration: Duration) -> RetryWithBackoff {
        self.max_delay = duration;
        self
    }
}

impl Iterator for RetryWithBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if let Some(max_attempt) = self.max_attempt {
            if self.attempt >= max_attempt {
                return None;
            }
        }
        let exponent = self.attempt as u32;
        self.attempt += 1;
        Some(backoff_delay(self.initial_delay, self.max_delay, exponent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn test_default_schedule_has_two_delays() {
        let delays: Vec<Duration> = RetryPolicy::default().schedule().collect();
        assert_eq!(delays, vec![millis(100), millis(200)]);
    }

    #[test]
    fn test_schedule_plateaus_at_max_delay() {
        let delays: Vec<Duration> = RetryPolicy::with_max_attempts(9).schedule().collect();
        assert_eq!(
            delays,
            vec![
                millis(100),
                millis(200),
                millis(400),
                millis(800),
                millis(1000),
                millis(1000),
                millis(1000),
                millis(1000),
            ]
        );
    }

    #[test]
    fn test_delay_before_matches_schedule() {
        let policy = RetryPolicy::with_max_attempts(12);
        assert_eq!(policy.delay_before(0), millis(0));
        assert_eq!(policy.delay_before(1), millis(0));
        for (i, delay) in policy.schedule().enumerate() {
            assert_eq!(policy.delay_before(i as u32 + 2), delay);
        }
    }

    #[test]
    fn test_huge_attempt_saturates_at_max_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_before(40), MAX_DELAY);
        assert_eq!(policy.delay_before(u32::MAX), MAX_DELAY);
    }

    #[test]
    fn test_single_attempt_never_sleeps() {
        assert_eq!(RetryPolicy::with_max_attempts(1).schedule().next(), None);
        assert_eq!(RetryPolicy::with_max_attempts(0).schedule().next(), None);
        assert_eq!(RetryPolicy::with_max_attempts(0).max_attempts(), 1);
    }

    #[test]
    fn test_unbounded_iterator_keeps_yielding() {
        let mut s = RetryWithBackoff::default()
            .initial_delay(millis(1))
            .max_delay(millis(12));

        assert_eq!(s.next(), Some(millis(1)));
        assert_eq!(s.next(), Some(millis(2)));
        assert_eq!(s.next(), Some(millis(4)));
        assert_eq!(s.next(), Some(millis(8)));
        assert_eq!(s.next(), Some(millis(12)));
        assert_eq!(s.next(), Some(millis(12)));
    }

    #[test]
    fn returns_max_when_max_less_than_base() {
        let mut s = RetryWithBackoff::default()
            .initial_delay(millis(20))
            .max_delay(millis(10));
        assert_eq!(s.next(), Some(millis(10)));
        assert_eq!(s.next(), Some(millis(10)));
    }

    #[test]
    fn test_builder_defaults() {
        let policy = RetryPolicy::builder().build().unwrap();
        assert_eq!(policy, RetryPolicy::default());
        assert_eq!(policy.base_delay(), millis(100));
        assert_eq!(policy.max_delay(), millis(1000));
        assert_eq!(policy.max_attempts(), 3);
    }

    #[test]
    fn test_builder_overrides() {
        let policy = RetryPolicy::builder()
            .base_delay(millis(5))
            .max_delay(millis(20))
            .max_attempts(5u32)
            .build()
            .unwrap();
        let delays: Vec<Duration> = policy.schedule().collect();
        assert_eq!(delays, vec![millis(5), millis(10), millis(20), millis(20)]);
    }

    #[test]
    fn test_builder_rejects_zero_attempts() {
        let res = RetryPolicy::builder().max_attempts(0u32).build();
        assert!(matches!(res, Err(Error::InvalidPolicy { .. })));
    }

    #[test]
    fn test_builder_rejects_base_longer_than_max() {
        let res = RetryPolicy::builder()
            .base_delay(millis(2000))
            .build();
        match res {
            Err(Error::InvalidPolicy { msg }) => assert!(msg.contains("max_delay")),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
