//! Redaction of secrets before request details reach the logs.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const REDACTED: &str = "<redacted>";

/// Header names whose values are never logged.
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-auth-token",
];

static REDACT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(authorization:\s*)([^\r\n]+)").unwrap(),
        Regex::new(r"(?i)((?:^|\b)Bearer\s+)([A-Za-z0-9\-._~+/]+=*)").unwrap(),
        Regex::new(r"(?i)((?:^|\b)Basic\s+)([A-Za-z0-9+/]+=*)").unwrap(),
        Regex::new(r"(?i)([A-Z0-9_]*(?:KEY|TOKEN|SECRET|PASSWORD)=)([^\s&]+)").unwrap(),
    ]
});

/// Redacts values that look like secrets in free text.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in REDACT_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |captures: &Captures| {
                let prefix = captures.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{prefix}{REDACTED}")
            })
            .into_owned();
    }
    redacted
}

/// Value of a header as it may be logged.
pub fn redact_header(name: &str, value: &str) -> String {
    if SENSITIVE_HEADERS.iter().any(|sensitive| sensitive.eq_ignore_ascii_case(name)) {
        REDACTED.to_string()
    } else {
        redact_sensitive(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_tokens_in_text() {
        assert_eq!(redact_sensitive("Authorization: token abc123"), "Authorization: <redacted>");
        assert_eq!(redact_sensitive("GET /x?API_KEY=s3cr3t&page=2"), "GET /x?API_KEY=<redacted>&page=2");
        assert_eq!(redact_sensitive("curl -H 'Bearer abc.def'"), "curl -H 'Bearer <redacted>'");
    }

    #[test]
    fn sensitive_headers_are_fully_hidden() {
        assert_eq!(redact_header("Authorization", "token abc"), "<redacted>");
        assert_eq!(redact_header("Accept", "application/json"), "application/json");
    }
}
