//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//

use tracing::Level;

/// Install a fmt subscriber so retry attempts show up in test output.
///
/// Safe to call from every test: if a global subscriber is already set this
/// does nothing.
pub fn init() {
    init_with_level(Level::DEBUG);
}

pub fn init_with_level(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_ansi(true)
        .with_max_level(level)
        .try_init();
}
