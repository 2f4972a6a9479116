//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//

use snafu::Snafu;

/// Errors raised by this crate itself.
///
/// Failures of the retried callable are never converted into this type; they
/// reach the caller exactly as the callable produced them.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum Error {
    #[snafu(display("Retry policy is invalid: {}", msg))]
    InvalidPolicy { msg: String },
}
