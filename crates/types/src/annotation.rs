//! The annotation model consumed by contract processors.
//!
//! Declarations carry annotations as single-key entries (`{ RequestLine: "GET /x" }`
//! or a bare `QueryMap`). [`Annotation::from_value`] is the only place that
//! turns such an entry into a typed annotation, so every declaration source
//! reads payloads the same way. Kinds without a built-in variant are kept as
//! [`Annotation::Custom`] for application registered processors.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::{CollectionFormat, Expander};

/// Kind tags of the built-in annotations.
pub mod kinds {
    pub const REQUEST_LINE: &str = "RequestLine";
    pub const HEADERS: &str = "Headers";
    pub const BODY: &str = "Body";
    pub const PATH: &str = "Path";
    pub const PARAM: &str = "Param";
    pub const QUERY_MAP: &str = "QueryMap";
    pub const HEADER_MAP: &str = "HeaderMap";
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    RequestLine {
        value: String,
        decode_slash: bool,
        collection_format: CollectionFormat,
    },
    Headers(Vec<String>),
    Body(String),
    /// Type level path prefix.
    Path(String),
    Param {
        value: String,
        expander: Expander,
        encoded: bool,
    },
    QueryMap {
        encoded: bool,
    },
    HeaderMap,
    Custom {
        kind: String,
        value: Value,
    },
}

impl Annotation {
    pub fn request_line(value: impl Into<String>) -> Self {
        Self::RequestLine {
            value: value.into(),
            decode_slash: true,
            collection_format: CollectionFormat::Exploded,
        }
    }

    pub fn headers<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Headers(lines.into_iter().map(Into::into).collect())
    }

    pub fn body(value: impl Into<String>) -> Self {
        Self::Body(value.into())
    }

    pub fn path(value: impl Into<String>) -> Self {
        Self::Path(value.into())
    }

    pub fn param(name: impl Into<String>) -> Self {
        Self::Param {
            value: name.into(),
            expander: Expander::ToString,
            encoded: false,
        }
    }

    pub fn query_map() -> Self {
        Self::QueryMap { encoded: false }
    }

    pub fn custom(kind: impl Into<String>, value: Value) -> Self {
        Self::Custom { kind: kind.into(), value }
    }

    /// Sets `decode_slash` on a request line; other kinds are returned unchanged.
    pub fn decode_slash(mut self, enabled: bool) -> Self {
        if let Self::RequestLine { decode_slash, .. } = &mut self {
            *decode_slash = enabled;
        }
        self
    }

    pub fn collection_format(mut self, format: CollectionFormat) -> Self {
        if let Self::RequestLine { collection_format, .. } = &mut self {
            *collection_format = format;
        }
        self
    }

    /// Marks a `Param` or `QueryMap` as pre-encoded.
    pub fn encoded(mut self, enabled: bool) -> Self {
        match &mut self {
            Self::Param { encoded, .. } | Self::QueryMap { encoded } => *encoded = enabled,
            _ => {}
        }
        self
    }

    pub fn expander(mut self, with: Expander) -> Self {
        if let Self::Param { expander, .. } = &mut self {
            *expander = with;
        }
        self
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::RequestLine { .. } => kinds::REQUEST_LINE,
            Self::Headers(_) => kinds::HEADERS,
            Self::Body(_) => kinds::BODY,
            Self::Path(_) => kinds::PATH,
            Self::Param { .. } => kinds::PARAM,
            Self::QueryMap { .. } => kinds::QUERY_MAP,
            Self::HeaderMap => kinds::HEADER_MAP,
            Self::Custom { kind, .. } => kind,
        }
    }

    /// Reads one declaration entry: a single-key map or a bare kind name.
    pub fn from_value(entry: &Value) -> Result<Self, String> {
        match entry {
            Value::String(kind) => Self::from_entry(kind, &Value::Null),
            Value::Object(map) if map.len() == 1 => {
                let (kind, payload) = map.iter().next().ok_or("empty annotation entry")?;
                Self::from_entry(kind, payload)
            }
            other => Err(format!("annotation entries must be a kind name or a single-key map, got {other}")),
        }
    }

    pub fn from_entry(kind: &str, payload: &Value) -> Result<Self, String> {
        match kind {
            kinds::REQUEST_LINE => match payload {
                Value::String(value) => Ok(Self::request_line(value.as_str())),
                Value::Object(fields) => {
                    let collection_format = match fields.get("collection_format").and_then(Value::as_str) {
                        Some(raw) => raw.parse()?,
                        None => CollectionFormat::Exploded,
                    };
                    Ok(Self::RequestLine {
                        value: required_str(fields, "value", kind)?,
                        decode_slash: optional_bool(fields, "decode_slash", kind)?.unwrap_or(true),
                        collection_format,
                    })
                }
                other => Err(format!("{kind} expects a string or a map, got {other}")),
            },
            kinds::HEADERS => match payload {
                Value::String(line) => Ok(Self::Headers(vec![line.clone()])),
                Value::Array(lines) => lines
                    .iter()
                    .map(|line| line.as_str().map(str::to_string).ok_or(format!("{kind} entries must be strings")))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Self::Headers),
                Value::Null => Ok(Self::Headers(Vec::new())),
                other => Err(format!("{kind} expects a string or a list, got {other}")),
            },
            kinds::BODY => scalar_str(payload, kind).map(Self::Body),
            kinds::PATH => scalar_str(payload, kind).map(Self::Path),
            kinds::PARAM => match payload {
                Value::String(name) => Ok(Self::param(name.as_str())),
                Value::Object(fields) => Ok(Self::Param {
                    value: required_str(fields, "value", kind)?,
                    expander: fields
                        .get("expander")
                        .and_then(Value::as_str)
                        .map(Expander::from_name)
                        .unwrap_or_default(),
                    encoded: optional_bool(fields, "encoded", kind)?.unwrap_or(false),
                }),
                other => Err(format!("{kind} expects a string or a map, got {other}")),
            },
            kinds::QUERY_MAP => match payload {
                Value::Null => Ok(Self::query_map()),
                Value::Bool(encoded) => Ok(Self::QueryMap { encoded: *encoded }),
                Value::Object(fields) => Ok(Self::QueryMap {
                    encoded: optional_bool(fields, "encoded", kind)?.unwrap_or(false),
                }),
                other => Err(format!("{kind} expects nothing or a map, got {other}")),
            },
            kinds::HEADER_MAP => match payload {
                Value::Null => Ok(Self::HeaderMap),
                Value::Object(fields) if fields.is_empty() => Ok(Self::HeaderMap),
                other => Err(format!("{kind} takes no payload, got {other}")),
            },
            other => Ok(Self::custom(other, payload.clone())),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::RequestLine {
                value,
                decode_slash,
                collection_format,
            } => {
                if *decode_slash && *collection_format == CollectionFormat::Exploded {
                    json!({ kinds::REQUEST_LINE: value })
                } else {
                    json!({ kinds::REQUEST_LINE: {
                        "value": value,
                        "decode_slash": decode_slash,
                        "collection_format": collection_format,
                    }})
                }
            }
            Self::Headers(lines) => json!({ kinds::HEADERS: lines }),
            Self::Body(value) => json!({ kinds::BODY: value }),
            Self::Path(value) => json!({ kinds::PATH: value }),
            Self::Param {
                value,
                expander,
                encoded,
            } => {
                if expander.is_default() && !encoded {
                    json!({ kinds::PARAM: value })
                } else {
                    json!({ kinds::PARAM: { "value": value, "expander": expander, "encoded": encoded } })
                }
            }
            Self::QueryMap { encoded } => json!({ kinds::QUERY_MAP: { "encoded": encoded } }),
            Self::HeaderMap => Value::String(kinds::HEADER_MAP.to_string()),
            Self::Custom { kind, value } => {
                let mut map = Map::new();
                map.insert(kind.clone(), value.clone());
                Value::Object(map)
            }
        }
    }
}

fn scalar_str(payload: &Value, kind: &str) -> Result<String, String> {
    payload
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("{kind} expects a string, got {payload}"))
}

fn required_str(fields: &Map<String, Value>, key: &str, kind: &str) -> Result<String, String> {
    match fields.get(key) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(format!("{kind}.{key} must be a string, got {other}")),
        None => Ok(String::new()),
    }
}

fn optional_bool(fields: &Map<String, Value>, key: &str, kind: &str) -> Result<Option<bool>, String> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(other) => Err(format!("{kind}.{key} must be a boolean, got {other}")),
    }
}

impl Serialize for Annotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Annotation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entry = Value::deserialize(deserializer)?;
        Self::from_value(&entry).map_err(serde::de::Error::custom)
    }
}
