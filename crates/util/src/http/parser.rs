//! Helpers for turning HTTP responses into readable messages.

const DEFAULT_PREVIEW_LIMIT: usize = 512;

/// Return a hint for status codes that usually need user action.
///
/// # Example
/// ```rust
/// use bindery_util::http::status_error_message;
///
/// assert!(status_error_message(401).unwrap().contains("Unauthorized"));
/// assert!(status_error_message(404).is_none());
/// ```
pub fn status_error_message(status_code: u16) -> Option<String> {
    match status_code {
        401 => Some("Unauthorized (401). Hint: check the Authorization header or token".into()),
        403 => Some("Forbidden (403). Hint: check permissions for this resource".into()),
        429 => Some("Too Many Requests (429). Hint: the server is rate limiting, retry later".into()),
        _ => None,
    }
}

/// Lossy UTF-8 preview of a response body, cut at `limit` characters.
pub fn body_preview(body: &[u8], limit: Option<usize>) -> String {
    let limit = limit.unwrap_or(DEFAULT_PREVIEW_LIMIT);
    let text = String::from_utf8_lossy(body);
    let mut preview: String = text.chars().take(limit).collect();
    if text.chars().count() > limit {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_bodies() {
        assert_eq!(body_preview(b"short", None), "short");
        assert_eq!(body_preview(b"abcdef", Some(3)), "abc...");
    }
}
