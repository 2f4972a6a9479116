//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//

//! Failure kinds and the matchers that decide which of them are retried.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::marker::PhantomData;

/// One failed attempt of the retried callable.
pub enum Failure<E> {
    /// The callable panicked. Holds the payload as caught by `catch_unwind`.
    Panic(Box<dyn Any + Send + 'static>),
    /// The callable returned an error.
    Error(E),
}

impl<E> Failure<E> {
    /// The panic message, if the callable panicked with one.
    pub fn panic_message(&self) -> Option<&str> {
        match self {
            Failure::Panic(payload) => message_of(payload.as_ref()),
            Failure::Error(_) => None,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Failure::Panic(_))
    }
}

impl<E: fmt::Debug> fmt::Debug for Failure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Panic(_) => match self.panic_message() {
                Some(msg) => f.debug_tuple("Panic").field(&msg).finish(),
                None => f.debug_tuple("Panic").field(&"<non-string payload>").finish(),
            },
            Failure::Error(e) => f.debug_tuple("Error").field(e).finish(),
        }
    }
}

fn message_of(payload: &(dyn Any + Send)) -> Option<&str> {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        Some(*msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        Some(msg.as_str())
    } else {
        None
    }
}

/// Decides whether a failure belongs to the retryable kinds.
pub trait RetryOn<E> {
    fn matches(&self, failure: &Failure<E>) -> bool;

    /// A set holding both `self` and `other`.
    fn or<R>(self, other: R) -> Or<Self, R>
    where
        Self: Sized,
        R: RetryOn<E>,
    {
        Or(self, other)
    }
}

/// Assertion failures: panics raised with a message, which is what `assert!`,
/// `assert_eq!`, `panic!` and friends produce.
///
/// Panics the standard library raises for programming errors are excluded:
/// out-of-bounds indexing and slicing, arithmetic overflow, division by zero
/// and `RefCell` borrow conflicts. Typed payloads thrown with
/// `std::panic::panic_any` are not assertion failures either. Use `AnyPanic`
/// to retry those.
///
/// `unwrap` and `expect` panics do count as assertion failures. Tests use them
/// to assert that a value is present, e.g. `store.get(key).unwrap()` on a row
/// that has not replicated yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Assertion;

impl<E> RetryOn<E> for Assertion {
    fn matches(&self, failure: &Failure<E>) -> bool {
        failure.panic_message().map_or(false, |msg| !is_runtime_error(msg))
    }
}

/// Message prefixes of std panics raised for indexing and borrow bugs.
const RUNTIME_ERROR_PREFIXES: &[&str] = &[
    "index out of bounds",
    "byte index",
    "range start index",
    "range end index",
    "slice index starts at",
    "already borrowed",
    "already mutably borrowed",
    "RefCell already",
];

/// Suffixes of the `attempt to ...` arithmetic panics.
const ARITHMETIC_ERROR_SUFFIXES: &[&str] = &["with overflow", "by zero", "divisor of zero"];

fn is_runtime_error(msg: &str) -> bool {
    if RUNTIME_ERROR_PREFIXES.iter().any(|prefix| msg.starts_with(prefix)) {
        return true;
    }
    msg.starts_with("attempt to ") && ARITHMETIC_ERROR_SUFFIXES.iter().any(|suffix| msg.ends_with(suffix))
}

/// Every panic, whatever its payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnyPanic;

impl<E> RetryOn<E> for AnyPanic {
    fn matches(&self, failure: &Failure<E>) -> bool {
        failure.is_panic()
    }
}

/// Every error returned by the callable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnyError;

impl<E> RetryOn<E> for AnyError {
    fn matches(&self, failure: &Failure<E>) -> bool {
        !failure.is_panic()
    }
}

/// Failures of type `T`, including errors that wrap a `T`.
///
/// A returned error matches when it is a `T` or when a `T` appears anywhere
/// in its `source()` chain. A panic matches when its payload is a `T`.
pub struct ErrorOf<T>(PhantomData<fn() -> T>);

impl<T> ErrorOf<T> {
    pub fn new() -> Self {
        ErrorOf(PhantomData)
    }
}

impl<T> Default for ErrorOf<T> {
    fn default() -> Self {
        ErrorOf::new()
    }
}

impl<T> Clone for ErrorOf<T> {
    fn clone(&self) -> Self {
        ErrorOf::new()
    }
}

impl<T> Copy for ErrorOf<T> {}

impl<T> fmt::Debug for ErrorOf<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ErrorOf<{}>", std::any::type_name::<T>())
    }
}

/// Shorthand for `ErrorOf::<T>::new()`.
pub fn error_of<T>() -> ErrorOf<T> {
    ErrorOf::new()
}

impl<T, E> RetryOn<E> for ErrorOf<T>
where
    T: StdError + 'static,
    E: StdError + 'static,
{
    fn matches(&self, failure: &Failure<E>) -> bool {
        match failure {
            Failure::Panic(payload) => (**payload).is::<T>(),
            Failure::Error(e) => {
                let mut current: Option<&(dyn StdError + 'static)> = Some(e as &(dyn StdError + 'static));
                while let Some(err) = current {
                    if err.is::<T>() {
                        return true;
                    }
                    current = err.source();
                }
                false
            }
        }
    }
}

/// Errors selected by a predicate, typically a `matches!` over enum variants.
#[derive(Clone, Copy)]
pub struct ErrorWhere<F>(F);

/// Retry returned errors for which `predicate` holds.
pub fn when<E, F>(predicate: F) -> ErrorWhere<F>
where
    F: Fn(&E) -> bool,
{
    ErrorWhere(predicate)
}

impl<F> fmt::Debug for ErrorWhere<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorWhere(..)")
    }
}

impl<E, F> RetryOn<E> for ErrorWhere<F>
where
    F: Fn(&E) -> bool,
{
    fn matches(&self, failure: &Failure<E>) -> bool {
        match failure {
            Failure::Error(e) => (self.0)(e),
            Failure::Panic(_) => false,
        }
    }
}

/// Either of two kinds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Or<A, B>(pub A, pub B);

impl<E, A, B> RetryOn<E> for Or<A, B>
where
    A: RetryOn<E>,
    B: RetryOn<E>,
{
    fn matches(&self, failure: &Failure<E>) -> bool {
        self.0.matches(failure) || self.1.matches(failure)
    }
}

impl<E, A, B> RetryOn<E> for (A, B)
where
    A: RetryOn<E>,
    B: RetryOn<E>,
{
    fn matches(&self, failure: &Failure<E>) -> bool {
        self.0.matches(failure) || self.1.matches(failure)
    }
}

impl<E, A, B, C> RetryOn<E> for (A, B, C)
where
    A: RetryOn<E>,
    B: RetryOn<E>,
    C: RetryOn<E>,
{
    fn matches(&self, failure: &Failure<E>) -> bool {
        self.0.matches(failure) || self.1.matches(failure) || self.2.matches(failure)
    }
}

impl<E, K> RetryOn<E> for Vec<K>
where
    K: RetryOn<E>,
{
    fn matches(&self, failure: &Failure<E>) -> bool {
        self.iter().any(|kind| kind.matches(failure))
    }
}

impl<E, K> RetryOn<E> for Box<K>
where
    K: RetryOn<E> + ?Sized,
{
    fn matches(&self, failure: &Failure<E>) -> bool {
        (**self).matches(failure)
    }
}

impl<'a, E, K> RetryOn<E> for &'a K
where
    K: RetryOn<E> + ?Sized,
{
    fn matches(&self, failure: &Failure<E>) -> bool {
        (**self).matches(failure)
    }
}
