//! Annotation processor tables and the default contract.

use std::{fmt, sync::Arc};

use bindery_types::{
    Annotation, BodyTemplate, ContractError, ExpandFn, HttpMethod, MethodSpec, kinds,
};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::utils::{group_header_lines, join_path};

pub type TypeProcessor = Arc<dyn Fn(&Annotation, &mut MethodSpec) -> Result<(), ContractError> + Send + Sync>;
pub type MethodProcessor = Arc<dyn Fn(&Annotation, &mut MethodSpec) -> Result<(), ContractError> + Send + Sync>;
/// Returns whether the processor claims the parameter for the request.
pub type ParameterProcessor =
    Arc<dyn Fn(&Annotation, &mut MethodSpec, usize) -> Result<bool, ContractError> + Send + Sync>;

static REQUEST_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Z]+)[ ]*(.*)$").expect("request line pattern"));

/// Ordered processor tables keyed by annotation kind.
///
/// Registering a kind twice replaces the processor but keeps its position.
#[derive(Clone, Default)]
pub struct ContractRegistry {
    type_processors: IndexMap<String, TypeProcessor>,
    method_processors: IndexMap<String, MethodProcessor>,
    parameter_processors: IndexMap<String, ParameterProcessor>,
    expanders: IndexMap<String, ExpandFn>,
}

impl fmt::Debug for ContractRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractRegistry")
            .field("type_processors", &self.type_processors.keys().collect::<Vec<_>>())
            .field("method_processors", &self.method_processors.keys().collect::<Vec<_>>())
            .field("parameter_processors", &self.parameter_processors.keys().collect::<Vec<_>>())
            .field("expanders", &self.expanders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ContractRegistry {
    /// A registry with no processors at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The default contract: request line, body, headers, path prefix, param,
    /// query map and header map.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register_type_processor(kinds::HEADERS, process_type_headers);
        registry.register_type_processor(kinds::PATH, process_path);
        registry.register_method_processor(kinds::REQUEST_LINE, process_request_line);
        registry.register_method_processor(kinds::BODY, process_body);
        registry.register_method_processor(kinds::HEADERS, process_method_headers);
        registry.register_parameter_processor(kinds::PARAM, process_param);
        registry.register_parameter_processor(kinds::QUERY_MAP, process_query_map);
        registry.register_parameter_processor(kinds::HEADER_MAP, process_header_map);
        registry
    }

    pub fn register_type_processor<F>(&mut self, kind: impl Into<String>, processor: F) -> &mut Self
    where
        F: Fn(&Annotation, &mut MethodSpec) -> Result<(), ContractError> + Send + Sync + 'static,
    {
        self.type_processors.insert(kind.into(), Arc::new(processor));
        self
    }

    pub fn register_method_processor<F>(&mut self, kind: impl Into<String>, processor: F) -> &mut Self
    where
        F: Fn(&Annotation, &mut MethodSpec) -> Result<(), ContractError> + Send + Sync + 'static,
    {
        self.method_processors.insert(kind.into(), Arc::new(processor));
        self
    }

    pub fn register_parameter_processor<F>(&mut self, kind: impl Into<String>, processor: F) -> &mut Self
    where
        F: Fn(&Annotation, &mut MethodSpec, usize) -> Result<bool, ContractError> + Send + Sync + 'static,
    {
        self.parameter_processors.insert(kind.into(), Arc::new(processor));
        self
    }

    /// Binds the function used for custom expanders declared under `name`.
    pub fn register_expander<F>(&mut self, name: impl Into<String>, function: F) -> &mut Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.expanders.insert(name.into(), Arc::new(function));
        self
    }

    pub fn type_processors(&self) -> impl Iterator<Item = (&str, &TypeProcessor)> {
        self.type_processors.iter().map(|(kind, processor)| (kind.as_str(), processor))
    }

    pub fn method_processors(&self) -> impl Iterator<Item = (&str, &MethodProcessor)> {
        self.method_processors.iter().map(|(kind, processor)| (kind.as_str(), processor))
    }

    pub fn parameter_processors(&self) -> impl Iterator<Item = (&str, &ParameterProcessor)> {
        self.parameter_processors.iter().map(|(kind, processor)| (kind.as_str(), processor))
    }

    pub fn expander(&self, name: &str) -> Option<&ExpandFn> {
        self.expanders.get(name)
    }
}

fn process_type_headers(annotation: &Annotation, spec: &mut MethodSpec) -> Result<(), ContractError> {
    let Annotation::Headers(lines) = annotation else {
        return Ok(());
    };
    if lines.is_empty() {
        return Err(ContractError::empty_annotation(kinds::HEADERS, type_name(&spec.config_key)));
    }
    // Parents are processed first; their values win over the child's.
    let mut headers = group_header_lines(lines, type_name(&spec.config_key))?;
    headers.extend(std::mem::take(&mut spec.headers));
    spec.headers = headers;
    Ok(())
}

fn process_path(annotation: &Annotation, spec: &mut MethodSpec) -> Result<(), ContractError> {
    let Annotation::Path(prefix) = annotation else {
        return Ok(());
    };
    if prefix.trim().is_empty() {
        return Err(ContractError::empty_annotation(kinds::PATH, type_name(&spec.config_key)));
    }
    spec.url_template = prefix.trim().trim_end_matches('/').to_string();
    Ok(())
}

fn process_request_line(annotation: &Annotation, spec: &mut MethodSpec) -> Result<(), ContractError> {
    let Annotation::RequestLine {
        value,
        decode_slash,
        collection_format,
    } = annotation
    else {
        return Ok(());
    };
    if value.trim().is_empty() {
        return Err(ContractError::empty_annotation(kinds::REQUEST_LINE, spec.config_key.clone()));
    }
    if spec.http_method.is_some() {
        return Err(ContractError::InvalidAnnotation {
            annotation: kinds::REQUEST_LINE.to_string(),
            target: spec.config_key.clone(),
            message: "declared more than once".into(),
        });
    }
    let invalid = || ContractError::InvalidRequestLine {
        config_key: spec.config_key.clone(),
        value: value.clone(),
    };
    let captures = REQUEST_LINE.captures(value).ok_or_else(invalid)?;
    let verb: HttpMethod = captures[1].parse().map_err(|_| invalid())?;
    let uri = captures[2].trim_end();

    // Only the type-level Path prefix can have filled the template by now.
    if !spec.url_template.is_empty() {
        spec.url_template = join_path(&spec.url_template, uri);
        spec.url_append = true;
    } else {
        spec.url_template = uri.to_string();
    }
    spec.http_method = Some(verb);
    spec.decode_slash = *decode_slash;
    spec.collection_format = *collection_format;
    Ok(())
}

fn process_body(annotation: &Annotation, spec: &mut MethodSpec) -> Result<(), ContractError> {
    let Annotation::Body(value) = annotation else {
        return Ok(());
    };
    if value.trim().is_empty() {
        return Err(ContractError::empty_annotation(kinds::BODY, spec.config_key.clone()));
    }
    spec.body = Some(BodyTemplate::from_declared(value));
    Ok(())
}

fn process_method_headers(annotation: &Annotation, spec: &mut MethodSpec) -> Result<(), ContractError> {
    let Annotation::Headers(lines) = annotation else {
        return Ok(());
    };
    if lines.is_empty() {
        return Err(ContractError::empty_annotation(kinds::HEADERS, spec.config_key.clone()));
    }
    let grouped = group_header_lines(lines, &spec.config_key)?;
    spec.headers.extend(grouped);
    Ok(())
}

fn process_param(annotation: &Annotation, spec: &mut MethodSpec, index: usize) -> Result<bool, ContractError> {
    let Annotation::Param {
        value,
        expander,
        encoded,
    } = annotation
    else {
        return Ok(false);
    };
    let name = value.trim();
    if name.is_empty() {
        return Err(ContractError::empty_annotation(
            kinds::PARAM,
            format!("parameter {index} of {}", spec.config_key),
        ));
    }
    spec.name_param(index, name);
    if !expander.is_default() {
        spec.index_to_expander.insert(index, expander.clone());
    }
    spec.index_to_encoded.insert(index, *encoded);
    if !spec.has_request_variable(name) {
        spec.form_params.insert(name.to_string());
    }
    Ok(true)
}

fn process_query_map(annotation: &Annotation, spec: &mut MethodSpec, index: usize) -> Result<bool, ContractError> {
    let Annotation::QueryMap { encoded } = annotation else {
        return Ok(false);
    };
    if spec.query_map_index.is_some() {
        return Err(ContractError::DuplicateParameterRole {
            annotation: "QueryMap",
            config_key: spec.config_key.clone(),
        });
    }
    spec.query_map_index = Some(index);
    spec.query_map_encoded = *encoded;
    Ok(true)
}

fn process_header_map(annotation: &Annotation, spec: &mut MethodSpec, index: usize) -> Result<bool, ContractError> {
    if !matches!(annotation, Annotation::HeaderMap) {
        return Ok(false);
    }
    if spec.header_map_index.is_some() {
        return Err(ContractError::DuplicateParameterRole {
            annotation: "HeaderMap",
            config_key: spec.config_key.clone(),
        });
    }
    spec.header_map_index = Some(index);
    Ok(true)
}

fn type_name(config_key: &str) -> &str {
    config_key.split('#').next().unwrap_or(config_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> MethodSpec {
        MethodSpec::new("GitHub#contributors(String,String)")
    }

    #[test]
    fn request_line_sets_verb_and_template() {
        let mut spec = spec();
        process_request_line(&Annotation::request_line("GET /repos/{owner}/{repo}/contributors"), &mut spec)
            .expect("request line");
        assert_eq!(spec.http_method, Some(HttpMethod::Get));
        assert_eq!(spec.url_template, "/repos/{owner}/{repo}/contributors");
        assert!(!spec.url_append);
    }

    #[test]
    fn request_line_appends_to_type_level_path() {
        let mut spec = spec();
        process_path(&Annotation::path("/api/v3/"), &mut spec).expect("path");
        process_request_line(&Annotation::request_line("GET repos/{owner}"), &mut spec).expect("request line");
        assert_eq!(spec.url_template, "/api/v3/repos/{owner}");
        assert!(spec.url_append);
    }

    #[test]
    fn second_request_line_is_rejected_and_keeps_the_prefix() {
        let mut spec = spec();
        process_path(&Annotation::path("/api/v3"), &mut spec).expect("path");
        process_request_line(&Annotation::request_line("GET repos/{owner}"), &mut spec).expect("request line");
        let error = process_request_line(&Annotation::request_line("POST /other"), &mut spec).expect_err("duplicate");
        assert!(matches!(error, ContractError::InvalidAnnotation { ref annotation, .. } if annotation == kinds::REQUEST_LINE));
        assert_eq!(spec.http_method, Some(HttpMethod::Get));
        assert_eq!(spec.url_template, "/api/v3/repos/{owner}");
    }

    #[test]
    fn request_line_rejects_blank_lowercase_and_unknown_verbs() {
        for value in ["  ", "get /x", "FETCH /x"] {
            let mut spec = spec();
            assert!(process_request_line(&Annotation::request_line(value), &mut spec).is_err(), "{value}");
        }
    }

    #[test]
    fn body_without_braces_is_fixed() {
        let mut spec = spec();
        process_body(&Annotation::body("plain"), &mut spec).expect("body");
        assert_eq!(spec.body, Some(BodyTemplate::Fixed("plain".into())));
        process_body(&Annotation::body("%7B\"user\": \"{user}\"%7D"), &mut spec).expect("body");
        assert!(spec.body.as_ref().is_some_and(BodyTemplate::is_template));
    }

    #[test]
    fn method_headers_replace_type_headers_of_the_same_name() {
        let mut spec = spec();
        process_type_headers(&Annotation::headers(["Accept: text/plain", "X-Api: 1"]), &mut spec).expect("type");
        process_method_headers(&Annotation::headers(["Accept: application/json", "Accept: text/html"]), &mut spec)
            .expect("method");
        assert_eq!(spec.headers["Accept"], vec!["application/json", "text/html"]);
        assert_eq!(spec.headers["X-Api"], vec!["1"]);
        assert_eq!(spec.headers.keys().collect::<Vec<_>>(), vec!["Accept", "X-Api"]);
    }

    #[test]
    fn unreferenced_param_becomes_form_param() {
        let mut spec = spec();
        spec.url_template = "/repos/{owner}".into();
        assert!(process_param(&Annotation::param("owner"), &mut spec, 0).expect("param"));
        assert!(process_param(&Annotation::param("title").encoded(true), &mut spec, 1).expect("param"));
        assert_eq!(spec.form_params.iter().collect::<Vec<_>>(), vec!["title"]);
        assert_eq!(spec.index_to_encoded.get(&1), Some(&true));
        assert!(spec.index_to_expander.is_empty());
    }

    #[test]
    fn second_query_map_is_rejected() {
        let mut spec = spec();
        assert!(process_query_map(&Annotation::query_map(), &mut spec, 0).expect("first"));
        assert_eq!(
            process_query_map(&Annotation::query_map(), &mut spec, 1),
            Err(ContractError::DuplicateParameterRole {
                annotation: "QueryMap",
                config_key: "GitHub#contributors(String,String)".into()
            })
        );
    }

    #[test]
    fn registering_twice_keeps_position() {
        let mut registry = ContractRegistry::with_defaults();
        registry.register_method_processor(kinds::REQUEST_LINE, |_, _| Ok(()));
        let kinds: Vec<_> = registry.method_processors().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, vec!["RequestLine", "Body", "Headers"]);
    }
}
