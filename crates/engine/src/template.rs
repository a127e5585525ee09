//! Per-call request templates and variable substitution.
//!
//! A [`RequestTemplate`] starts as a copy of the static parts of a
//! [`MethodSpec`] and is resolved in place against the variables bound for
//! one call. Each request part has its own rules:
//!
//! - path: values are percent-encoded unless pre-encoded, `decode_slash`
//!   restores `/` in resolved values, and a missing variable is an error;
//! - query: values are percent-encoded unless pre-encoded, unresolved values
//!   are dropped, and a parameter with no values left is dropped;
//! - headers: values are used as-is, unresolved values are dropped;
//! - body template: values are used as-is, unresolved expressions expand to
//!   nothing, and `%7B`/`%7D` become literal braces.

use bindery_types::{BodyTemplate, CollectionFormat, HttpMethod, MethodSpec, template::Chunk, template::chunks};
use bindery_util::{decode_braces, decode_slash, encode_path_value, encode_query_component};
use indexmap::IndexMap;

use crate::{ResolveError, http::Request, http::header_value};

/// Expanded values bound to one template variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub values: Vec<String>,
    /// The argument was a list; list values follow the collection format.
    pub multi: bool,
    /// Values are already percent-encoded.
    pub encoded: bool,
}

impl Variable {
    pub fn single(value: impl Into<String>) -> Self {
        Self {
            values: vec![value.into()],
            multi: false,
            encoded: false,
        }
    }

    pub fn list(values: Vec<String>) -> Self {
        Self {
            values,
            multi: true,
            encoded: false,
        }
    }

    pub fn encoded(mut self, encoded: bool) -> Self {
        self.encoded = encoded;
        self
    }

    fn raw(&self) -> String {
        self.values.join(",")
    }

    fn encoded_values(&self, encode: fn(&str) -> String) -> Vec<String> {
        if self.encoded {
            self.values.clone()
        } else {
            self.values.iter().map(|value| encode(value)).collect()
        }
    }
}

pub type Variables = IndexMap<String, Variable>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateBody {
    Bytes(Vec<u8>),
    Template(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    method: HttpMethod,
    target: Option<String>,
    path: String,
    queries: IndexMap<String, Vec<String>>,
    headers: IndexMap<String, Vec<String>>,
    body: Option<TemplateBody>,
    decode_slash: bool,
    collection_format: CollectionFormat,
}

impl RequestTemplate {
    pub fn new(method: HttpMethod, url_template: &str) -> Self {
        let (path, query) = split_query(url_template);
        Self {
            method,
            target: None,
            path: path.to_string(),
            queries: parse_query(query),
            headers: IndexMap::new(),
            body: None,
            decode_slash: true,
            collection_format: CollectionFormat::Exploded,
        }
    }

    /// Copies the static parts of `spec`. Specs without a verb fall back to GET;
    /// compiled specs always carry one.
    pub fn from_spec(spec: &MethodSpec) -> Self {
        let mut template = Self::new(spec.http_method.unwrap_or(HttpMethod::Get), &spec.url_template);
        template.headers = spec.headers.clone();
        template.body = spec.body.as_ref().map(|body| match body {
            BodyTemplate::Fixed(text) => TemplateBody::Bytes(text.clone().into_bytes()),
            BodyTemplate::Template(text) => TemplateBody::Template(text.clone()),
        });
        template.decode_slash = spec.decode_slash;
        template.collection_format = spec.collection_format;
        template
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn set_target(&mut self, target: impl Into<String>) {
        self.target = Some(target.into());
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn queries(&self) -> &IndexMap<String, Vec<String>> {
        &self.queries
    }

    pub fn headers(&self) -> &IndexMap<String, Vec<String>> {
        &self.headers
    }

    pub fn body(&self) -> Option<&TemplateBody> {
        self.body.as_ref()
    }

    /// Replaces every value of the query parameter `name`.
    pub fn set_query(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.queries.insert(name.into(), values);
    }

    pub fn append_header(&mut self, name: &str, values: impl IntoIterator<Item = String>) {
        let key = self
            .headers
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| name.to_string());
        self.headers.entry(key).or_default().extend(values);
    }

    /// Sets a header unless one with the same name (any case) exists.
    pub fn header_if_absent(&mut self, name: &str, value: impl Into<String>) {
        if header_value(&self.headers, name).is_none() {
            self.headers.insert(name.to_string(), vec![value.into()]);
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        header_value(&self.headers, "Content-Type")
    }

    pub fn set_body(&mut self, bytes: Vec<u8>) {
        self.body = Some(TemplateBody::Bytes(bytes));
    }

    /// Substitutes `variables` into the path, query, headers and body template.
    pub fn resolve(&mut self, variables: &Variables) -> Result<(), ResolveError> {
        self.path = self.resolve_path(variables)?;
        self.queries = self.resolve_queries(variables);
        self.headers = resolve_headers(&self.headers, variables);
        if let Some(TemplateBody::Template(text)) = &self.body {
            self.body = Some(TemplateBody::Bytes(expand_body(text, variables).into_bytes()));
        }
        Ok(())
    }

    fn resolve_path(&self, variables: &Variables) -> Result<String, ResolveError> {
        let mut path = String::with_capacity(self.path.len());
        for chunk in chunks(&self.path) {
            match chunk {
                Chunk::Literal(text) => path.push_str(text),
                Chunk::Expression(name) => {
                    let variable = variables
                        .get(name)
                        .ok_or_else(|| ResolveError::MissingPathVariable { name: name.to_string() })?;
                    let mut rendered = self.collection_format.join(&variable.encoded_values(encode_path_value));
                    if self.decode_slash {
                        rendered = decode_slash(&rendered);
                    }
                    path.push_str(&rendered);
                }
            }
        }
        Ok(path)
    }

    fn resolve_queries(&self, variables: &Variables) -> IndexMap<String, Vec<String>> {
        let mut resolved = IndexMap::new();
        for (name, templates) in &self.queries {
            if templates.is_empty() {
                resolved.insert(name.clone(), Vec::new());
                continue;
            }
            let mut values = Vec::new();
            for template in templates {
                match single_expression(template) {
                    Some(variable_name) => {
                        let Some(variable) = variables.get(variable_name) else {
                            continue;
                        };
                        let encoded = variable.encoded_values(encode_query_component);
                        match (variable.multi, self.collection_format.separator()) {
                            (true, Some(separator)) if !encoded.is_empty() => values.push(encoded.join(separator)),
                            (true, Some(_)) => {}
                            _ => values.extend(encoded),
                        }
                    }
                    None => {
                        let render = |variable: &Variable| variable.encoded_values(encode_query_component).join(",");
                        if let Some(text) = substitute(template, variables, render) {
                            values.push(text);
                        }
                    }
                }
            }
            if !values.is_empty() {
                resolved.insert(name.clone(), values);
            }
        }
        resolved
    }

    /// The absolute URL: explicit target or `base_url`, path, then query.
    pub fn url(&self, base_url: &str) -> String {
        let mut url = self.target.as_deref().unwrap_or(base_url).trim_end_matches('/').to_string();
        if !self.path.is_empty() {
            if !self.path.starts_with('/') {
                url.push('/');
            }
            url.push_str(&self.path);
        }
        let query = self.query_string();
        if !query.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&query);
        }
        url
    }

    pub fn query_string(&self) -> String {
        let mut pairs = Vec::new();
        for (name, values) in &self.queries {
            if values.is_empty() {
                pairs.push(name.clone());
            }
            for value in values {
                pairs.push(format!("{name}={value}"));
            }
        }
        pairs.join("&")
    }

    pub fn request(&self, base_url: &str) -> Result<Request, ResolveError> {
        let url = self.url(base_url);
        if let Err(source) = url::Url::parse(&url) {
            return Err(ResolveError::InvalidUrl { url, source });
        }
        let body = self.body.as_ref().map(|body| match body {
            TemplateBody::Bytes(bytes) => bytes.clone(),
            TemplateBody::Template(text) => decode_braces(text).into_bytes(),
        });
        Ok(Request {
            method: self.method,
            url,
            headers: self.headers.clone(),
            body,
        })
    }
}

fn split_query(url_template: &str) -> (&str, &str) {
    match url_template.split_once('?') {
        Some((path, query)) => (path, query),
        None => (url_template, ""),
    }
}

/// `a=b&c={c}&flag` into name → value templates; name-only parameters get no values.
fn parse_query(query: &str) -> IndexMap<String, Vec<String>> {
    let mut queries: IndexMap<String, Vec<String>> = IndexMap::new();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        match pair.split_once('=') {
            Some((name, value)) => queries.entry(name.to_string()).or_default().push(value.to_string()),
            None => {
                queries.entry(pair.to_string()).or_default();
            }
        }
    }
    queries
}

fn resolve_headers(headers: &IndexMap<String, Vec<String>>, variables: &Variables) -> IndexMap<String, Vec<String>> {
    let mut resolved = IndexMap::new();
    for (name, templates) in headers {
        let values: Vec<String> = templates
            .iter()
            .filter_map(|template| substitute(template, variables, Variable::raw))
            .collect();
        if !values.is_empty() {
            resolved.insert(name.clone(), values);
        }
    }
    resolved
}

/// The variable name when `template` is exactly one `{expression}`.
fn single_expression(template: &str) -> Option<&str> {
    match chunks(template).as_slice() {
        [Chunk::Expression(name)] => Some(*name),
        _ => None,
    }
}

/// Substitutes every expression, or `None` when any of them is unresolved.
fn substitute(template: &str, variables: &Variables, render: impl Fn(&Variable) -> String) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    for chunk in chunks(template) {
        match chunk {
            Chunk::Literal(text) => out.push_str(text),
            Chunk::Expression(name) => out.push_str(&render(variables.get(name)?)),
        }
    }
    Some(out)
}

/// Expands a body template. Unresolved expressions become empty and only the
/// literal text is brace-decoded, so substituted values pass through untouched.
fn expand_body(template: &str, variables: &Variables) -> String {
    chunks(template)
        .into_iter()
        .map(|chunk| match chunk {
            Chunk::Literal(text) => decode_braces(text),
            Chunk::Expression(name) => variables.get(name).map(Variable::raw).unwrap_or_default(),
        })
        .collect()
}
