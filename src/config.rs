// SPDX-License-Identifier: MPL-2.0

pub const APP_ID: &str = "io.github.sethcottle.Pagectx";
pub const APP_NAME: &str = "pagectx";

pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_GRAPH_VERSION: &str = "v18.0";

/// Posts fetched per context when the caller gives no limit.
pub const DEFAULT_POST_LIMIT: usize = 10;

pub const HTTP_TIMEOUT_SECS: u64 = 30;
pub const USER_AGENT: &str = "pagectx/0.1";

/// Env var holding the tracing filter directives.
pub const LOG_ENV: &str = "PAGECTX_LOG";
