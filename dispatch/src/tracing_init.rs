// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Optional diagnostics bootstrap for the dispatch runtime.
//!
//! The runtime itself only *emits* through [`tracing`] macros and never installs a
//! subscriber - that is the embedding application's call. [`init_tracing()`] is a
//! convenience for binaries and tests that just want the runtime's diagnostics on
//! stderr, filtered by the [`TRACE_LEVEL_ENV_VAR`] environment variable.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Environment variable read by [`init_tracing()`] for the diagnostic filter, using
/// [`EnvFilter`] directive syntax (e.g. `debug`, `r3bl_dispatch=trace`).
pub const TRACE_LEVEL_ENV_VAR: &str = "R3BL_DISPATCH_LOG";

/// Installs a compact stderr subscriber filtered by [`TRACE_LEVEL_ENV_VAR`]
/// (defaulting to `error` when unset or invalid). Idempotent: the first call wins,
/// later calls are no-ops - as is this call entirely when the application already
/// installed a global subscriber.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(TRACE_LEVEL_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new("error"));
        drop(
            tracing_subscriber::fmt()
                .compact()
                .without_time()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init(),
        );
    });
}
