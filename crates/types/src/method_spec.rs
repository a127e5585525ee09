//! The canonical per-method contract record.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::{CollectionFormat, ContractError, Expander, HttpMethod, TypeDescriptor, template};

/// Request body declared on a method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyTemplate {
    /// Literal bytes sent as-is.
    Fixed(String),
    /// Text with `{name}` expressions resolved per call.
    Template(String),
}

impl BodyTemplate {
    pub fn from_declared(value: &str) -> Self {
        if value.contains('{') {
            Self::Template(value.to_string())
        } else {
            Self::Fixed(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Fixed(text) | Self::Template(text) => text,
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(self, Self::Template(_))
    }
}

/// Everything needed to build a request for one declared method.
///
/// Produced by the contract scanner or by a generated recipe; both must yield
/// equal values. Ordered collections compare by iteration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodSpec {
    pub config_key: String,
    pub http_method: Option<HttpMethod>,
    #[serde(default)]
    pub url_template: String,
    #[serde(default)]
    pub url_append: bool,
    #[serde(default = "default_decode_slash")]
    pub decode_slash: bool,
    #[serde(default)]
    pub collection_format: CollectionFormat,
    #[serde(default)]
    pub headers: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub body: Option<BodyTemplate>,
    #[serde(default)]
    pub form_params: IndexSet<String>,
    #[serde(default)]
    pub index_to_name: IndexMap<usize, Vec<String>>,
    #[serde(default)]
    pub index_to_encoded: IndexMap<usize, bool>,
    #[serde(default)]
    pub index_to_expander: IndexMap<usize, Expander>,
    #[serde(default)]
    pub body_index: Option<usize>,
    #[serde(default)]
    pub url_index: Option<usize>,
    #[serde(default)]
    pub query_map_index: Option<usize>,
    #[serde(default)]
    pub header_map_index: Option<usize>,
    #[serde(default)]
    pub options_index: Option<usize>,
    #[serde(default)]
    pub query_map_encoded: bool,
    #[serde(default)]
    pub ignored_params: IndexSet<usize>,
    #[serde(default = "TypeDescriptor::unit")]
    pub return_type: TypeDescriptor,
    #[serde(default)]
    pub body_type: Option<TypeDescriptor>,
}

fn default_decode_slash() -> bool {
    true
}

impl MethodSpec {
    pub fn new(config_key: impl Into<String>) -> Self {
        Self {
            config_key: config_key.into(),
            http_method: None,
            url_template: String::new(),
            url_append: false,
            decode_slash: true,
            collection_format: CollectionFormat::Exploded,
            headers: IndexMap::new(),
            body: None,
            form_params: IndexSet::new(),
            index_to_name: IndexMap::new(),
            index_to_encoded: IndexMap::new(),
            index_to_expander: IndexMap::new(),
            body_index: None,
            url_index: None,
            query_map_index: None,
            header_map_index: None,
            options_index: None,
            query_map_encoded: false,
            ignored_params: IndexSet::new(),
            return_type: TypeDescriptor::unit(),
            body_type: None,
        }
    }

    /// Binds `name` to the parameter at `index`, keeping earlier names.
    pub fn name_param(&mut self, index: usize, name: impl Into<String>) {
        self.index_to_name.entry(index).or_default().push(name.into());
    }

    /// Whether `name` is referenced by the URL (path or query) or a header
    /// template. Body templates do not count.
    pub fn has_request_variable(&self, name: &str) -> bool {
        template::references(&self.url_template, name)
            || self
                .headers
                .values()
                .flatten()
                .any(|value| template::references(value, name))
    }

    /// Indices carrying a special role, paired with the role's annotation name.
    pub fn special_indices(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        [
            ("Body", self.body_index),
            ("URI", self.url_index),
            ("QueryMap", self.query_map_index),
            ("HeaderMap", self.header_map_index),
            ("RequestOptions", self.options_index),
        ]
        .into_iter()
        .filter_map(|(role, index)| index.map(|index| (role, index)))
    }

    pub fn validate(&self) -> Result<(), ContractError> {
        if self.http_method.is_none() {
            return Err(ContractError::MissingHttpMethod(self.config_key.clone()));
        }
        if self.body_index.is_some() && !self.form_params.is_empty() {
            return Err(ContractError::BodyWithFormParams(self.config_key.clone()));
        }

        let mut seen = IndexSet::new();
        for (_, index) in self.special_indices() {
            if !seen.insert(index) {
                return Err(ContractError::ConflictingParameterRoles {
                    config_key: self.config_key.clone(),
                    index,
                });
            }
        }

        if let Some(index) = self.query_map_index
            && self.index_to_name.contains_key(&index)
        {
            return Err(ContractError::MapParameterBound {
                annotation: "QueryMap",
                config_key: self.config_key.clone(),
            });
        }
        if let Some(index) = self.header_map_index
            && self.index_to_name.contains_key(&index)
        {
            return Err(ContractError::MapParameterBound {
                annotation: "HeaderMap",
                config_key: self.config_key.clone(),
            });
        }
        Ok(())
    }
}

impl PartialEq for MethodSpec {
    fn eq(&self, other: &Self) -> bool {
        self.config_key == other.config_key
            && self.http_method == other.http_method
            && self.url_template == other.url_template
            && self.url_append == other.url_append
            && self.decode_slash == other.decode_slash
            && self.collection_format == other.collection_format
            && self.headers.iter().eq(other.headers.iter())
            && self.body == other.body
            && self.form_params.iter().eq(other.form_params.iter())
            && self.index_to_name.iter().eq(other.index_to_name.iter())
            && self.index_to_encoded.iter().eq(other.index_to_encoded.iter())
            && self.index_to_expander.iter().eq(other.index_to_expander.iter())
            && self.body_index == other.body_index
            && self.url_index == other.url_index
            && self.query_map_index == other.query_map_index
            && self.header_map_index == other.header_map_index
            && self.options_index == other.options_index
            && self.query_map_encoded == other.query_map_encoded
            && self.ignored_params.iter().eq(other.ignored_params.iter())
            && self.return_type == other.return_type
            && self.body_type == other.body_type
    }
}
