// SPDX-License-Identifier: MPL-2.0

//! Tracing setup for the binary.

use crate::config::{APP_NAME, LOG_ENV};
use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Install the global subscriber.
///
/// Filter directives come from `PAGECTX_LOG` (e.g. `pagectx=debug`), falling
/// back to `pagectx=info`. Output goes to stderr so stdout stays clean JSON.
/// Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(format!("{APP_NAME}=info")));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .init();
    });
}
