//! Builds a resolved [`RequestTemplate`] from a spec and one call's arguments.

use std::sync::Arc;

use bindery_types::{Expander, MethodSpec, TypeDescriptor, value_to_string};
use bindery_util::encode_query_component;
use serde_json::{Map, Value};

use crate::{
    ClientError, EncodeError, ResolveError,
    codec::{Encoder, QueryMapEncoder},
    template::{RequestTemplate, Variable, Variables},
};

/// How the body of a request is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Unbound form parameters are collected into a map and encoded.
    FormEncoded,
    /// The argument at `body_index` is encoded.
    BodyEncoded,
    /// Only template substitution; any body comes from the spec.
    ResolveOnly,
}

impl Strategy {
    pub fn for_spec(spec: &MethodSpec) -> Self {
        let has_body_template = spec.body.as_ref().is_some_and(|body| body.is_template());
        if !spec.form_params.is_empty() && !has_body_template {
            Self::FormEncoded
        } else if spec.body_index.is_some() {
            Self::BodyEncoded
        } else {
            Self::ResolveOnly
        }
    }
}

#[derive(Clone)]
pub struct TemplateFactory {
    spec: Arc<MethodSpec>,
    strategy: Strategy,
    encoder: Arc<dyn Encoder>,
    query_map_encoder: Arc<dyn QueryMapEncoder>,
}

impl TemplateFactory {
    pub fn select(spec: Arc<MethodSpec>, encoder: Arc<dyn Encoder>, query_map_encoder: Arc<dyn QueryMapEncoder>) -> Self {
        let strategy = Strategy::for_spec(&spec);
        Self {
            spec,
            strategy,
            encoder,
            query_map_encoder,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn spec(&self) -> &MethodSpec {
        &self.spec
    }

    /// Resolves a fresh template for `argv`. Missing trailing arguments count as null.
    pub fn create(&self, argv: &[Value]) -> Result<RequestTemplate, ClientError> {
        let spec = &self.spec;
        let mut template = RequestTemplate::from_spec(spec);

        if let Some(index) = spec.url_index {
            match argument(argv, index) {
                Some(target) => template.set_target(value_to_string(target)),
                None => return Err(self.resolve_error(ResolveError::NullUrl { index })),
            }
        }

        let variables = self.variables(argv).map_err(|source| self.resolve_error(source))?;

        match self.strategy {
            Strategy::FormEncoded => {
                let form = self.form_map(argv, &variables);
                self.encoder
                    .encode(&Value::Object(form), &TypeDescriptor::form_map(), &mut template)
                    .map_err(|source| self.encode_error(source))?;
            }
            Strategy::BodyEncoded => {
                if let Some(index) = spec.body_index {
                    let body = argument(argv, index).ok_or_else(|| self.resolve_error(ResolveError::NullBody { index }))?;
                    let unknown = TypeDescriptor::named("?");
                    let body_type = spec.body_type.as_ref().unwrap_or(&unknown);
                    self.encoder
                        .encode(body, body_type, &mut template)
                        .map_err(|source| self.encode_error(source))?;
                }
            }
            Strategy::ResolveOnly => {}
        }

        template.resolve(&variables).map_err(|source| self.resolve_error(source))?;

        if let Some(index) = spec.query_map_index
            && let Some(query_map) = argument(argv, index)
        {
            self.apply_query_map(query_map, &mut template)?;
        }
        if let Some(index) = spec.header_map_index
            && let Some(header_map) = argument(argv, index)
        {
            apply_header_map(index, header_map, &mut template).map_err(|source| self.resolve_error(source))?;
        }
        Ok(template)
    }

    fn variables(&self, argv: &[Value]) -> Result<Variables, ResolveError> {
        let mut variables = Variables::new();
        let default_expander = Expander::ToString;
        for (index, names) in &self.spec.index_to_name {
            let Some(value) = argument(argv, *index) else {
                continue;
            };
            let expander = self.spec.index_to_expander.get(index).unwrap_or(&default_expander);
            let encoded = self.spec.index_to_encoded.get(index).copied().unwrap_or(false);
            let variable = match value {
                Value::Array(items) => Variable::list(
                    items
                        .iter()
                        .filter(|item| !item.is_null())
                        .map(|item| expander.expand(item))
                        .collect::<Result<_, _>>()?,
                ),
                other => Variable::single(expander.expand(other)?),
            }
            .encoded(encoded);
            for name in names {
                variables.insert(name.clone(), variable.clone());
            }
        }
        Ok(variables)
    }

    /// Form parameter name → argument. Arguments with a non-default expander
    /// contribute their expanded text.
    fn form_map(&self, argv: &[Value], variables: &Variables) -> Map<String, Value> {
        let mut form = Map::new();
        for name in &self.spec.form_params {
            let bound = self
                .spec
                .index_to_name
                .iter()
                .find(|(_, names)| names.contains(name))
                .map(|(index, _)| *index);
            let Some(index) = bound else {
                continue;
            };
            let Some(value) = argument(argv, index) else {
                continue;
            };
            let expanded = self
                .spec
                .index_to_expander
                .get(&index)
                .is_some_and(|expander| !expander.is_default());
            let entry = match variables.get(name) {
                Some(variable) if expanded && variable.multi => {
                    Value::Array(variable.values.iter().cloned().map(Value::String).collect())
                }
                Some(variable) if expanded => Value::String(variable.values.join(",")),
                _ => value.clone(),
            };
            form.insert(name.clone(), entry);
        }
        form
    }

    fn apply_query_map(&self, query_map: &Value, template: &mut RequestTemplate) -> Result<(), ClientError> {
        let entries = self
            .query_map_encoder
            .encode(query_map)
            .map_err(|source| self.encode_error(source))?;
        let encoded = self.spec.query_map_encoded;
        let encode = |text: String| if encoded { text } else { encode_query_component(&text) };
        for (name, value) in entries {
            let values = match value {
                Value::Null => continue,
                Value::Array(items) => items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(|item| encode(value_to_string(item)))
                    .collect(),
                other => vec![encode(value_to_string(&other))],
            };
            template.set_query(encode(name), values);
        }
        Ok(())
    }

    fn resolve_error(&self, source: ResolveError) -> ClientError {
        ClientError::Resolve {
            config_key: self.spec.config_key.clone(),
            source,
        }
    }

    fn encode_error(&self, source: EncodeError) -> ClientError {
        ClientError::Encode {
            config_key: self.spec.config_key.clone(),
            source,
        }
    }
}

fn argument(argv: &[Value], index: usize) -> Option<&Value> {
    argv.get(index).filter(|value| !value.is_null())
}

fn apply_header_map(index: usize, header_map: &Value, template: &mut RequestTemplate) -> Result<(), ResolveError> {
    let Value::Object(entries) = header_map else {
        return Err(ResolveError::HeaderMapNotObject {
            index,
            found: header_map.to_string(),
        });
    };
    for (name, value) in entries {
        let values: Vec<String> = match value {
            Value::Null => continue,
            Value::Array(items) => items.iter().filter(|item| !item.is_null()).map(value_to_string).collect(),
            other => vec![value_to_string(other)],
        };
        template.append_header(name, values);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{DefaultQueryMapEncoder, FormEncoder, JsonEncoder};
    use bindery_types::{BodyTemplate, CustomExpander, HttpMethod};
    use serde_json::json;

    fn factory(spec: MethodSpec) -> TemplateFactory {
        TemplateFactory::select(
            Arc::new(spec),
            Arc::new(FormEncoder::<JsonEncoder>::default()),
            Arc::new(DefaultQueryMapEncoder),
        )
    }

    fn issues_spec() -> MethodSpec {
        let mut spec = MethodSpec::new("GitHub#issues(String,String,Map)");
        spec.http_method = Some(HttpMethod::Get);
        spec.url_template = "/repos/{owner}/{repo}/issues?state={state}".into();
        spec.name_param(0, "owner");
        spec.name_param(1, "repo");
        spec.query_map_index = Some(2);
        spec
    }

    #[test]
    fn strategy_follows_form_and_body_bindings() {
        let mut form = MethodSpec::new("A#form(String)");
        form.form_params.insert("name".into());
        assert_eq!(Strategy::for_spec(&form), Strategy::FormEncoded);

        form.body = Some(BodyTemplate::Template("name={name}".into()));
        assert_eq!(Strategy::for_spec(&form), Strategy::ResolveOnly);

        let mut body = MethodSpec::new("A#body(Issue)");
        body.body_index = Some(0);
        assert_eq!(Strategy::for_spec(&body), Strategy::BodyEncoded);
        assert_eq!(Strategy::for_spec(&MethodSpec::new("A#none()")), Strategy::ResolveOnly);
    }

    #[test]
    fn binds_arguments_by_index() {
        let template = factory(issues_spec())
            .create(&[json!("octo"), json!("hello")])
            .expect("template");
        assert_eq!(template.path(), "/repos/octo/hello/issues");
        assert!(template.queries().is_empty());
    }

    #[test]
    fn index_binding_is_not_positional() {
        let mut spec = MethodSpec::new("GitHub#issues(String,String)");
        spec.http_method = Some(HttpMethod::Get);
        spec.url_template = "/repos/{owner}/{repo}/issues".into();
        spec.name_param(0, "repo");
        spec.name_param(1, "owner");
        let template = factory(spec).create(&[json!("acme"), json!("widgets")]).expect("template");
        assert_eq!(template.path(), "/repos/widgets/acme/issues");
    }

    #[test]
    fn query_map_wins_over_bound_query_parameter() {
        let mut spec = issues_spec();
        spec.name_param(2, "state");
        spec.query_map_index = Some(3);
        let template = factory(spec.clone())
            .create(&[json!("octo"), json!("hello"), json!("open"), json!({"state": "closed"})])
            .expect("template");
        assert_eq!(template.query_string(), "state=closed");

        let template = factory(spec)
            .create(&[json!("octo"), json!("hello"), json!("open")])
            .expect("template");
        assert_eq!(template.query_string(), "state=open");
    }

    #[test]
    fn pre_encoded_path_values_are_not_re_encoded() {
        let mut spec = MethodSpec::new("Files#get(String)");
        spec.http_method = Some(HttpMethod::Get);
        spec.url_template = "/f/{path}".into();
        spec.decode_slash = false;
        spec.name_param(0, "path");
        spec.index_to_encoded.insert(0, true);
        let template = factory(spec.clone()).create(&[json!("a/b")]).expect("template");
        assert_eq!(template.path(), "/f/a/b");

        spec.index_to_encoded.insert(0, false);
        let template = factory(spec).create(&[json!("a/b")]).expect("template");
        assert_eq!(template.path(), "/f/a%2Fb");
    }

    #[test]
    fn query_map_replaces_template_parameters() {
        let template = factory(issues_spec())
            .create(&[json!("octo"), json!("hello"), json!({"state": "closed", "labels": ["a b", "c"]})])
            .expect("template");
        assert_eq!(
            template.url("https://api.github.com"),
            "https://api.github.com/repos/octo/hello/issues?state=closed&labels=a%20b&labels=c"
        );
    }

    #[test]
    fn null_path_argument_is_a_missing_variable() {
        let error = factory(issues_spec())
            .create(&[Value::Null, json!("hello")])
            .expect_err("null owner");
        assert!(matches!(
            error,
            ClientError::Resolve { source: ResolveError::MissingPathVariable { ref name }, .. } if name == "owner"
        ));
    }

    #[test]
    fn null_uri_and_body_are_rejected() {
        let mut uri = MethodSpec::new("A#at(Url)");
        uri.http_method = Some(HttpMethod::Get);
        uri.url_index = Some(0);
        let error = factory(uri).create(&[]).expect_err("null uri");
        assert!(matches!(error, ClientError::Resolve { source: ResolveError::NullUrl { index: 0 }, .. }));

        let mut body = MethodSpec::new("A#create(Issue)");
        body.http_method = Some(HttpMethod::Post);
        body.body_index = Some(0);
        let error = factory(body).create(&[Value::Null]).expect_err("null body");
        assert!(matches!(error, ClientError::Resolve { source: ResolveError::NullBody { index: 0 }, .. }));
    }

    #[test]
    fn form_params_are_encoded_into_the_body() {
        let mut spec = MethodSpec::new("A#login(String,String)");
        spec.http_method = Some(HttpMethod::Post);
        spec.url_template = "/login".into();
        spec.name_param(0, "user");
        spec.name_param(1, "password");
        spec.form_params.insert("user".into());
        spec.form_params.insert("password".into());
        let template = factory(spec).create(&[json!("denominator"), json!("p@ss")]).expect("template");
        let request = template.request("https://api.example.com").expect("request");
        assert_eq!(request.body_text().as_deref(), Some("user=denominator&password=p%40ss"));
    }

    #[test]
    fn expanders_render_list_elements_and_skip_nulls() {
        let mut spec = MethodSpec::new("A#search(List)");
        spec.http_method = Some(HttpMethod::Get);
        spec.url_template = "/search?q={q}".into();
        spec.name_param(0, "q");
        spec.index_to_expander.insert(
            0,
            Expander::Custom(CustomExpander::new("shout", |value| value_to_string(value).to_uppercase())),
        );
        let template = factory(spec).create(&[json!(["a", null, "b"])]).expect("template");
        assert_eq!(template.query_string(), "q=A&q=B");
    }

    #[test]
    fn unbound_custom_expander_is_reported() {
        let mut spec = MethodSpec::new("A#get(String)");
        spec.http_method = Some(HttpMethod::Get);
        spec.url_template = "/x/{id}".into();
        spec.name_param(0, "id");
        spec.index_to_expander.insert(0, Expander::from_name("crate::slug"));
        let error = factory(spec).create(&[json!("a")]).expect_err("unbound");
        assert!(matches!(error, ClientError::Resolve { source: ResolveError::Expander(_), .. }));
    }

    #[test]
    fn header_map_appends_and_rejects_non_objects() {
        let mut spec = MethodSpec::new("A#get(Map)");
        spec.http_method = Some(HttpMethod::Get);
        spec.url_template = "/x".into();
        spec.headers.insert("Accept".into(), vec!["application/json".into()]);
        spec.header_map_index = Some(0);
        let template = factory(spec.clone())
            .create(&[json!({"accept": "text/plain", "X-Skip": null})])
            .expect("template");
        assert_eq!(template.headers()["Accept"], vec!["application/json", "text/plain"]);
        assert!(!template.headers().contains_key("X-Skip"));

        let error = factory(spec).create(&[json!("nope")]).expect_err("not an object");
        assert!(matches!(error, ClientError::Resolve { source: ResolveError::HeaderMapNotObject { .. }, .. }));
    }
}
