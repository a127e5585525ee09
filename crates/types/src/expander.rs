//! Value-to-string expansion policies for bound parameters.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

pub type ExpandFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// An application supplied expander, identified by name.
///
/// Specs compiled at build time only know the name (a function path); the
/// function value is bound when the spec is used. Two custom expanders are
/// equal when their names are equal.
#[derive(Clone)]
pub struct CustomExpander {
    name: String,
    function: Option<ExpandFn>,
}

impl CustomExpander {
    pub fn new(name: impl Into<String>, function: impl Fn(&Value) -> String + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            function: Some(Arc::new(function)),
        }
    }

    pub fn unbound(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            function: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_bound(&self) -> bool {
        self.function.is_some()
    }

    pub fn bind(&mut self, function: ExpandFn) {
        self.function = Some(function);
    }
}

impl fmt::Debug for CustomExpander {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomExpander")
            .field("name", &self.name)
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl PartialEq for CustomExpander {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("expander '{0}' has no function bound")]
pub struct UnboundExpanderError(pub String);

/// Expansion policy for one parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Expander {
    /// Strings verbatim, everything else through its JSON rendering.
    #[default]
    ToString,
    /// Always the JSON rendering (strings keep their quotes).
    Json,
    Lowercase,
    Uppercase,
    Custom(CustomExpander),
}

impl Expander {
    pub fn from_name(name: &str) -> Self {
        match name {
            "to_string" => Self::ToString,
            "json" => Self::Json,
            "lowercase" => Self::Lowercase,
            "uppercase" => Self::Uppercase,
            other => Self::Custom(CustomExpander::unbound(other)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::ToString => "to_string",
            Self::Json => "json",
            Self::Lowercase => "lowercase",
            Self::Uppercase => "uppercase",
            Self::Custom(custom) => custom.name(),
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::ToString)
    }

    pub fn expand(&self, value: &Value) -> Result<String, UnboundExpanderError> {
        match self {
            Self::ToString => Ok(value_to_string(value)),
            Self::Json => Ok(value.to_string()),
            Self::Lowercase => Ok(value_to_string(value).to_lowercase()),
            Self::Uppercase => Ok(value_to_string(value).to_uppercase()),
            Self::Custom(custom) => match &custom.function {
                Some(function) => Ok(function(value)),
                None => Err(UnboundExpanderError(custom.name.clone())),
            },
        }
    }
}

impl Serialize for Expander {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Expander {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

/// Renders a scalar the way it appears in a URL: strings without quotes.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtin_expanders_render_scalars() {
        assert_eq!(Expander::ToString.expand(&json!("Acme")).unwrap(), "Acme");
        assert_eq!(Expander::ToString.expand(&json!(42)).unwrap(), "42");
        assert_eq!(Expander::Json.expand(&json!("Acme")).unwrap(), "\"Acme\"");
        assert_eq!(Expander::Lowercase.expand(&json!("Acme")).unwrap(), "acme");
    }

    #[test]
    fn custom_expanders_compare_by_name() {
        let bound = Expander::Custom(CustomExpander::new("slug", |value| value_to_string(value).replace(' ', "-")));
        let unbound = Expander::from_name("slug");
        assert_eq!(bound, unbound);
        assert_eq!(bound.expand(&json!("a b")).unwrap(), "a-b");
        assert_eq!(unbound.expand(&json!("a b")), Err(UnboundExpanderError("slug".into())));
    }
}
