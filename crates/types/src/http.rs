use std::{error::Error, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// HTTP verb carried by a request line.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
        }
    }

    /// Rust variant name, used when emitting construction recipes.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Get => "Get",
            Self::Post => "Post",
            Self::Put => "Put",
            Self::Delete => "Delete",
            Self::Patch => "Patch",
            Self::Head => "Head",
            Self::Options => "Options",
            Self::Trace => "Trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ParseHttpMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "TRACE" => Ok(Self::Trace),
            other => Err(ParseHttpMethodError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseHttpMethodError(pub String);

impl fmt::Display for ParseHttpMethodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown HTTP method '{}'", self.0)
    }
}

impl Error for ParseHttpMethodError {}

/// How a multi-valued variable is written into a single query or path slot.
///
/// `Exploded` repeats the parameter (`q=a&q=b`); the other formats join the
/// values with their separator (already percent-encoded where needed).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionFormat {
    #[default]
    Exploded,
    Csv,
    Ssv,
    Tsv,
    Pipes,
}

impl CollectionFormat {
    pub fn separator(&self) -> Option<&'static str> {
        match self {
            Self::Exploded => None,
            Self::Csv => Some(","),
            Self::Ssv => Some("%20"),
            Self::Tsv => Some("%09"),
            Self::Pipes => Some("%7C"),
        }
    }

    /// Joins already-encoded values into one slot. Exploded values fall back
    /// to a comma, which is how a list renders inside a path segment.
    pub fn join(&self, values: &[String]) -> String {
        values.join(self.separator().unwrap_or(","))
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Exploded => "Exploded",
            Self::Csv => "Csv",
            Self::Ssv => "Ssv",
            Self::Tsv => "Tsv",
            Self::Pipes => "Pipes",
        }
    }
}

impl FromStr for CollectionFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EXPLODED" => Ok(Self::Exploded),
            "CSV" => Ok(Self::Csv),
            "SSV" => Ok(Self::Ssv),
            "TSV" => Ok(Self::Tsv),
            "PIPES" => Ok(Self::Pipes),
            other => Err(format!("unknown collection format '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_method_parses_only_uppercase_verbs() {
        assert_eq!("PATCH".parse::<HttpMethod>(), Ok(HttpMethod::Patch));
        assert!("get".parse::<HttpMethod>().is_err());
        assert_eq!(HttpMethod::Options.to_string(), "OPTIONS");
    }

    #[test]
    fn collection_format_joins_with_separator() {
        let values = vec!["a".to_string(), "b".to_string()];
        assert_eq!(CollectionFormat::Csv.join(&values), "a,b");
        assert_eq!(CollectionFormat::Pipes.join(&values), "a%7Cb");
        assert_eq!(CollectionFormat::Exploded.join(&values), "a,b");
        assert_eq!("ssv".parse::<CollectionFormat>(), Ok(CollectionFormat::Ssv));
    }
}
