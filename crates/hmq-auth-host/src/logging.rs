// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logging initialisation for embedders and the CLI tools.

use log::LevelFilter;

/// Initialise console logging at a fixed level.
///
/// Returns `false` when a logger was already installed (the call is
/// then a no-op).
pub fn init(level: LevelFilter) -> bool {
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

/// Initialise console logging, honouring `RUST_LOG` when set and
/// falling back to `default_level` otherwise.
pub fn init_env(default_level: LevelFilter) -> bool {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level.to_string()),
    )
    .format_timestamp_millis()
    .try_init()
    .is_ok()
}

/// Initialise console logging from a filter string such as
/// `"hmq_auth_host=debug,info"`.
pub fn init_with_filter(filter: &str) -> bool {
    env_logger::Builder::new()
        .parse_filters(filter)
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}
