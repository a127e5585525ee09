use std::time::Duration;

use bindery_util::{body_preview, redact_header, redact_sensitive};
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::{
    config::LogLevel,
    http::{Request, Response},
};

const BODY_PREVIEW_LIMIT: usize = 1024;

pub(crate) fn log_request(level: LogLevel, config_key: &str, request: &Request) {
    if level == LogLevel::None {
        return;
    }
    info!(config_key, method = %request.method, url = %redact_sensitive(&request.url), "sending request");
    if level >= LogLevel::Headers {
        log_headers(config_key, "request", &request.headers);
    }
    if level == LogLevel::Full
        && let Some(body) = &request.body
    {
        debug!(config_key, body = %redact_sensitive(&body_preview(body, Some(BODY_PREVIEW_LIMIT))), "request body");
    }
}

pub(crate) fn log_response(level: LogLevel, config_key: &str, response: &Response, elapsed: Duration) {
    if level == LogLevel::None {
        return;
    }
    info!(
        config_key,
        status = response.status,
        elapsed_ms = elapsed.as_millis() as u64,
        "received response"
    );
    if level >= LogLevel::Headers {
        log_headers(config_key, "response", &response.headers);
    }
    if level == LogLevel::Full && !response.body.is_empty() {
        debug!(config_key, body = %redact_sensitive(&body_preview(&response.body, Some(BODY_PREVIEW_LIMIT))), "response body");
    }
}

fn log_headers(config_key: &str, direction: &str, headers: &IndexMap<String, Vec<String>>) {
    for (name, values) in headers {
        for value in values {
            debug!(config_key, direction, header = %name, value = %redact_header(name, value));
        }
    }
}
