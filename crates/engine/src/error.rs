//! Errors raised while building, sending and decoding a request.

use std::error::Error as StdError;

use bindery_types::{ContractError, UnboundExpanderError};
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Failure turning arguments into a concrete request.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("URI parameter {index} was null")]
    NullUrl { index: usize },

    #[error("Body parameter {index} was null")]
    NullBody { index: usize },

    #[error("path variable '{name}' is required but has no value")]
    MissingPathVariable { name: String },

    #[error("HeaderMap parameter {index} must be an object, got {found}")]
    HeaderMapNotObject { index: usize, found: String },

    #[error("RequestOptions parameter {index} is invalid: {source}")]
    InvalidOptions {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Expander(#[from] UnboundExpanderError),

    #[error("resolved URL '{url}' is invalid: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Failure of an [`Encoder`](crate::Encoder) or [`QueryMapEncoder`](crate::QueryMapEncoder).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EncodeError {
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

impl EncodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Failure of a [`Decoder`](crate::Decoder).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DecodeError {
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Failure reported by a [`Transport`](crate::Transport).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub timed_out: bool,
    #[source]
    pub source: Option<BoxError>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
            source: Some(source.into()),
        }
    }

    pub fn timed_out(mut self) -> Self {
        self.timed_out = true;
        self
    }
}

/// Error returned by dispatch, one variant per failing stage.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("{config_key}: {source}")]
    Resolve {
        config_key: String,
        #[source]
        source: ResolveError,
    },

    #[error("{config_key}: encoding failed: {source}")]
    Encode {
        config_key: String,
        #[source]
        source: EncodeError,
    },

    #[error("{config_key}: transport failed: {source}")]
    Transport {
        config_key: String,
        #[source]
        source: TransportError,
    },

    #[error("{config_key}: status {status}: {body}")]
    Status {
        config_key: String,
        status: u16,
        reason: Option<String>,
        body: String,
    },

    #[error("{config_key}: decoding failed: {source}")]
    Decode {
        config_key: String,
        #[source]
        source: DecodeError,
    },

    #[error("no method bound for {0}")]
    UnknownMethod(String),

    #[error("argument could not be converted: {0}")]
    Argument(#[source] serde_json::Error),
}

impl ClientError {
    pub fn config_key(&self) -> Option<&str> {
        match self {
            Self::Resolve { config_key, .. }
            | Self::Encode { config_key, .. }
            | Self::Transport { config_key, .. }
            | Self::Status { config_key, .. }
            | Self::Decode { config_key, .. } => Some(config_key),
            Self::UnknownMethod(config_key) => Some(config_key),
            Self::Contract(_) | Self::Argument(_) => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
