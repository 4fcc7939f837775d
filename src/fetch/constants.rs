//! Constants for the fetch module (timeouts).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default per-request timeout (40 seconds, page images are small).
pub const READ_TIMEOUT_SECS: u64 = 40;
