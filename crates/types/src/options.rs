use serde::{Deserialize, Serialize};

/// Per-call transport settings. A client carries defaults; a method may take
/// a `RequestOptions` parameter to override them for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub follow_redirects: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            read_timeout_ms: 60_000,
            follow_redirects: true,
        }
    }
}
