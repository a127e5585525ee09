//! Semantic type descriptors.
//!
//! A [`TypeDescriptor`] is the contract layer's view of a declared Rust type:
//! a path name plus generic arguments. The core never interprets it beyond a
//! few structural questions (is this a map, is the key string-like, is this a
//! target URI); encoders and decoders receive it unchanged.

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const URI_TYPES: &[&str] = &["Url", "Uri", "URI"];
const MAP_TYPES: &[&str] = &["HashMap", "BTreeMap", "IndexMap", "Map"];
const STRING_TYPES: &[&str] = &["String", "str", "Cow"];
const REQUEST_OPTIONS_TYPE: &str = "RequestOptions";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    /// Path of the type as declared (`String`, `std::collections::HashMap`, `()`).
    pub name: String,
    /// Generic arguments in declaration order.
    pub args: Vec<TypeDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid type '{input}': {message}")]
pub struct TypeParseError {
    pub input: String,
    pub message: String,
}

impl TypeDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeDescriptor>) -> Self {
        Self { name: name.into(), args }
    }

    pub fn unit() -> Self {
        Self::named("()")
    }

    pub fn string() -> Self {
        Self::named("String")
    }

    /// Declared type handed to the encoder for form-encoded bodies.
    pub fn form_map() -> Self {
        Self::generic("Map", vec![Self::string(), Self::named("?")])
    }

    pub fn parse(input: &str) -> Result<Self, TypeParseError> {
        let mut parser = TypeParser { input, position: 0 };
        let parsed = parser.parse_type()?;
        parser.skip_whitespace();
        if parser.position != input.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(parsed)
    }

    /// Last path segment with any reference marker removed (`&str` → `str`).
    pub fn simple_name(&self) -> &str {
        let without_reference = self.name.trim_start_matches('&').trim_start_matches("mut ").trim();
        without_reference.rsplit("::").next().unwrap_or(without_reference)
    }

    pub fn is_unit(&self) -> bool {
        self.name == "()" && self.args.is_empty()
    }

    pub fn is_uri(&self) -> bool {
        URI_TYPES.contains(&self.simple_name())
    }

    pub fn is_request_options(&self) -> bool {
        self.simple_name() == REQUEST_OPTIONS_TYPE
    }

    pub fn is_map(&self) -> bool {
        MAP_TYPES.contains(&self.simple_name())
    }

    pub fn is_string_like(&self) -> bool {
        STRING_TYPES.contains(&self.simple_name())
    }

    /// Key type of a map whose generics are visible. Raw maps yield `None`.
    pub fn map_key(&self) -> Option<&TypeDescriptor> {
        if self.is_map() && self.args.len() == 2 {
            self.args.first()
        } else {
            None
        }
    }

    /// Replaces type variables named in `bindings` throughout the descriptor.
    pub fn substitute(&self, bindings: &IndexMap<String, TypeDescriptor>) -> TypeDescriptor {
        if self.args.is_empty()
            && let Some(bound) = bindings.get(&self.name)
        {
            return bound.clone();
        }
        TypeDescriptor {
            name: self.name.clone(),
            args: self.args.iter().map(|arg| arg.substitute(bindings)).collect(),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name == "()" {
            f.write_str("(")?;
            write_args(f, &self.args)?;
            return f.write_str(")");
        }
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            write_args(f, &self.args)?;
            f.write_str(">")?;
        }
        Ok(())
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[TypeDescriptor]) -> fmt::Result {
    for (index, arg) in args.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl FromStr for TypeDescriptor {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Lenient conversion for builder call sites: unparsable input is kept as an
/// opaque name instead of failing.
impl From<&str> for TypeDescriptor {
    fn from(value: &str) -> Self {
        Self::parse(value).unwrap_or_else(|_| Self::named(value.trim()))
    }
}

impl Serialize for TypeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

struct TypeParser<'a> {
    input: &'a str,
    position: usize,
}

impl TypeParser<'_> {
    fn parse_type(&mut self) -> Result<TypeDescriptor, TypeParseError> {
        self.skip_whitespace();
        if self.eat('(') {
            let args = self.parse_list(')')?;
            return Ok(TypeDescriptor::generic("()", args));
        }
        let name = self.parse_path()?;
        self.skip_whitespace();
        let args = if self.eat('<') { self.parse_list('>')? } else { Vec::new() };
        Ok(TypeDescriptor { name, args })
    }

    fn parse_list(&mut self, close: char) -> Result<Vec<TypeDescriptor>, TypeParseError> {
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_type()?);
            self.skip_whitespace();
            if self.eat(',') {
                self.skip_whitespace();
                if self.eat(close) {
                    return Ok(items);
                }
                continue;
            }
            if self.eat(close) {
                return Ok(items);
            }
            return Err(self.error(&format!("expected ',' or '{close}'")));
        }
    }

    fn parse_path(&mut self) -> Result<String, TypeParseError> {
        let start = self.position;
        if self.eat('&') {
            self.skip_whitespace();
            if self.rest().starts_with("mut ") {
                self.position += 4;
            }
        }
        while let Some(character) = self.peek() {
            if character.is_ascii_alphanumeric() || matches!(character, '_' | ':' | '?') {
                self.position += character.len_utf8();
            } else {
                break;
            }
        }
        let path = self.input[start..self.position].trim();
        if path.is_empty() || path.ends_with(':') || path == "&" {
            return Err(self.error("expected a type name"));
        }
        Ok(path.to_string())
    }

    fn rest(&self) -> &str {
        &self.input[self.position..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.position += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(character) = self.peek() {
            if !character.is_whitespace() {
                break;
            }
            self.position += character.len_utf8();
        }
    }

    fn error(&self, message: &str) -> TypeParseError {
        TypeParseError {
            input: self.input.to_string(),
            message: format!("{message} at offset {}", self.position),
        }
    }
}
