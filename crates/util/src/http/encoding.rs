//! Percent-encoding for resolved URL parts.
//!
//! Everything outside the unreserved set (`ALPHA DIGIT - . _ ~`) is encoded,
//! including `/` in path values; callers that want slashes kept restore them
//! with [`decode_slash`].

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters encoded inside a single path value.
pub const PATH_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Characters encoded inside a query name or value.
pub const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

pub fn encode_path_value(value: &str) -> String {
    utf8_percent_encode(value, PATH_VALUE).to_string()
}

pub fn encode_query_component(value: &str) -> String {
    utf8_percent_encode(value, QUERY_COMPONENT).to_string()
}

/// Restores encoded slashes (`%2F`, either case).
pub fn decode_slash(value: &str) -> String {
    value.replace("%2F", "/").replace("%2f", "/")
}

/// Restores literal braces escaped as `%7B`/`%7D` in body templates.
pub fn decode_braces(value: &str) -> String {
    value
        .replace("%7B", "{")
        .replace("%7b", "{")
        .replace("%7D", "}")
        .replace("%7d", "}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_values_encode_reserved_characters() {
        assert_eq!(encode_path_value("feign/core"), "feign%2Fcore");
        assert_eq!(encode_path_value("a b~c"), "a%20b~c");
        assert_eq!(decode_slash(&encode_path_value("feign/core")), "feign/core");
    }

    #[test]
    fn query_components_encode_separators() {
        assert_eq!(encode_query_component("a&b=c"), "a%26b%3Dc");
    }

    #[test]
    fn braces_are_restored() {
        assert_eq!(decode_braces("%7B\"a\": 1%7d"), "{\"a\": 1}");
    }
}
