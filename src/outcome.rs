//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//

use std::convert::Infallible;

/// What a retried callable may return.
///
/// Plain test bodies return `()` and fail by panicking. Fallible bodies
/// return a `Result` and fail with `Err`. Either way the retried call hands
/// back the same type the callable does.
pub trait Outcome: Sized {
    type Value;
    type Error;

    fn into_result(self) -> Result<Self::Value, Self::Error>;

    fn from_result(result: Result<Self::Value, Self::Error>) -> Self;
}

impl Outcome for () {
    type Value = ();
    type Error = Infallible;

    fn into_result(self) -> Result<(), Infallible> {
        Ok(())
    }

    fn from_result(result: Result<(), Infallible>) -> Self {
        match result {
            Ok(()) => (),
            Err(never) => match never {},
        }
    }
}

impl<T, E> Outcome for Result<T, E> {
    type Value = T;
    type Error = E;

    fn into_result(self) -> Result<T, E> {
        self
    }

    fn from_result(result: Result<T, E>) -> Self {
        result
    }
}
