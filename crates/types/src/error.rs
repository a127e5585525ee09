//! Errors raised while compiling and validating a contract.

use thiserror::Error;

/// Validation failure found while compiling a declared interface.
///
/// Method level variants name the offending `config_key`; interface level
/// variants name the interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("Parameterized types unsupported: {0}")]
    ParameterizedType(String),

    #[error("Only single inheritance supported: {0}")]
    MultipleInheritance(String),

    #[error("Only single-level inheritance supported: {0}")]
    InheritanceDepth(String),

    #[error("Interface {interface} extends unknown interface {parent}")]
    UnknownParent { interface: String, parent: String },

    #[error("Interface {0} not declared")]
    UnknownInterface(String),

    #[error("Method {0} not annotated with HTTP method type (ex. GET, POST)")]
    MissingHttpMethod(String),

    #[error("Overrides unsupported: {0}")]
    DuplicateConfigKey(String),

    #[error("Body parameters cannot be used with form parameters: {0}")]
    BodyWithFormParams(String),

    #[error("Method has too many Body parameters: {0}")]
    TooManyBodyParams(String),

    #[error("{annotation} annotation was present on multiple parameters: {config_key}")]
    DuplicateParameterRole { annotation: &'static str, config_key: String },

    #[error("Parameter {index} of {config_key} has more than one special role")]
    ConflictingParameterRoles { config_key: String, index: usize },

    #[error("{annotation} parameter of {config_key} cannot also be bound by name")]
    MapParameterBound { annotation: &'static str, config_key: String },

    #[error("{annotation} parameter must be a Map: {config_key} ({found})")]
    NotAMap {
        annotation: &'static str,
        config_key: String,
        found: String,
    },

    #[error("{annotation} key must be a String: {config_key} ({found})")]
    NonStringMapKey {
        annotation: &'static str,
        config_key: String,
        found: String,
    },

    #[error("{annotation} annotation was empty on {target}")]
    EmptyAnnotation { annotation: String, target: String },

    #[error("RequestLine annotation didn't start with an HTTP verb on method {config_key}: {value}")]
    InvalidRequestLine { config_key: String, value: String },

    #[error("Header '{header}' on {target} is not in 'Name: value' form")]
    MalformedHeader { target: String, header: String },

    #[error("Invalid {annotation} annotation on {target}: {message}")]
    InvalidAnnotation {
        annotation: String,
        target: String,
        message: String,
    },

    #[error("Invalid type on {target}: {message}")]
    InvalidType { target: String, message: String },
}

impl ContractError {
    pub fn empty_annotation(annotation: impl Into<String>, target: impl Into<String>) -> Self {
        Self::EmptyAnnotation {
            annotation: annotation.into(),
            target: target.into(),
        }
    }

    pub fn invalid_annotation(annotation: impl Into<String>, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAnnotation {
            annotation: annotation.into(),
            target: target.into(),
            message: message.into(),
        }
    }
}
