//! Rust construction recipes for compiled method specs.
//!
//! For every method the generator writes a function whose body is a list of
//! field assignments rebuilding an equal [`MethodSpec`], an aggregate
//! `<interface>_specs()` function and an adapter struct whose async methods
//! forward to a `DispatchTable`. The output is meant to be pulled in with
//! `include!`; it refers to `bindery_types` and `bindery_engine` by absolute
//! path and to declared types by the names used in the declaration.

use bindery_registry::{ContractRegistry, DeclarationIntrospector};
use bindery_types::{BodyTemplate, ContractError, Expander, MethodSpec, TypeDescriptor};
use heck::{ToSnakeCase, ToUpperCamelCase};
use indexmap::IndexMap;

use crate::introspect::StaticIntrospector;

const TYPES: &str = "::bindery_types";
const ENGINE: &str = "::bindery_engine";

/// A compiled method together with what the adapter needs to call it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeMethod {
    pub name: String,
    /// Parameter names and types, generic-resolved.
    pub params: Vec<(String, TypeDescriptor)>,
    pub spec: MethodSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeSet {
    pub interface: String,
    pub methods: Vec<RecipeMethod>,
}

impl RecipeSet {
    pub fn specs(&self) -> Vec<MethodSpec> {
        self.methods.iter().map(|method| method.spec.clone()).collect()
    }
}

/// Compiles `interface` with the default contract through the static backend.
pub fn compile_recipes(document: &serde_json::Value, interface: &str) -> Result<RecipeSet, ContractError> {
    let introspector = StaticIntrospector::new(document, interface);
    let specs = ContractRegistry::with_defaults().compile(&introspector)?;
    let methods = introspector
        .list_methods()?
        .into_iter()
        .filter(|method| method.declaration.is_concrete())
        .zip(specs)
        .map(|(method, spec)| RecipeMethod {
            name: method.declaration.name.clone(),
            params: method
                .declaration
                .params
                .iter()
                .map(|param| {
                    let ty = introspector.resolve_generic_type(&method.declared_in, &param.ty);
                    (param.name.clone(), ty)
                })
                .collect(),
            spec,
        })
        .collect();
    Ok(RecipeSet {
        interface: interface.to_string(),
        methods,
    })
}

/// Renders the recipe module for one interface.
pub fn render_recipes(set: &RecipeSet) -> String {
    let function_names = function_names(&set.methods);
    let mut out = String::new();
    line(&mut out, format!("// Generated by bindery-registry-gen for `{}`. Do not edit.", set.interface));

    for (method, function) in set.methods.iter().zip(&function_names) {
        out.push('\n');
        render_spec_function(&mut out, &method.spec, function);
    }

    let aggregate = format!("{}_specs", set.interface.to_snake_case());
    line(&mut out, format!("\n/// Every compiled method of `{}`, in declaration order.", set.interface));
    line(&mut out, format!("pub fn {aggregate}() -> ::std::vec::Vec<{TYPES}::MethodSpec> {{"));
    line(&mut out, "    vec![");
    for function in &function_names {
        line(&mut out, format!("        {function}_spec(),"));
    }
    line(&mut out, "    ]");
    line(&mut out, "}");

    render_adapter(&mut out, set, &function_names, &aggregate);
    out
}

/// Appends one line of generated source.
fn line(out: &mut String, text: impl AsRef<str>) {
    out.push_str(text.as_ref());
    out.push('\n');
}

/// Snake-case method names, suffixed with their position when overloaded.
fn function_names(methods: &[RecipeMethod]) -> Vec<String> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for method in methods {
        *counts.entry(method.name.to_snake_case()).or_default() += 1;
    }
    methods
        .iter()
        .enumerate()
        .map(|(position, method)| {
            let base = method.name.to_snake_case();
            if counts.get(&base).copied().unwrap_or_default() > 1 {
                format!("{base}_{position}")
            } else {
                base
            }
        })
        .collect()
}

fn render_spec_function(out: &mut String, spec: &MethodSpec, function: &str) {
    line(out, format!("/// `{}`", spec.config_key));
    line(out, format!("pub fn {function}_spec() -> {TYPES}::MethodSpec {{"));
    line(out, format!("    let mut spec = {TYPES}::MethodSpec::new({:?});", spec.config_key));

    if let Some(method) = spec.http_method {
        line(out, format!("    spec.http_method = Some({TYPES}::HttpMethod::{});", method.variant_name()));
    }
    if !spec.url_template.is_empty() {
        line(out, format!("    spec.url_template = {:?}.to_string();", spec.url_template));
    }
    if spec.url_append {
        line(out, "    spec.url_append = true;");
    }
    if !spec.decode_slash {
        line(out, "    spec.decode_slash = false;");
    }
    if spec.collection_format != Default::default() {
        line(
            out,
            format!(
                "    spec.collection_format = {TYPES}::CollectionFormat::{};",
                spec.collection_format.variant_name()
            ),
        );
    }
    for (name, values) in &spec.headers {
        let values: Vec<String> = values.iter().map(|value| format!("{value:?}.to_string()")).collect();
        line(out, format!("    spec.headers.insert({name:?}.to_string(), vec![{}]);", values.join(", ")));
    }
    match &spec.body {
        Some(BodyTemplate::Fixed(text)) => {
            line(out, format!("    spec.body = Some({TYPES}::BodyTemplate::Fixed({text:?}.to_string()));"));
        }
        Some(BodyTemplate::Template(text)) => {
            line(out, format!("    spec.body = Some({TYPES}::BodyTemplate::Template({text:?}.to_string()));"));
        }
        None => {}
    }
    for name in &spec.form_params {
        line(out, format!("    spec.form_params.insert({name:?}.to_string());"));
    }
    for (index, names) in &spec.index_to_name {
        for name in names {
            line(out, format!("    spec.name_param({index}, {name:?});"));
        }
    }
    for (index, encoded) in &spec.index_to_encoded {
        line(out, format!("    spec.index_to_encoded.insert({index}, {encoded});"));
    }
    for (index, expander) in &spec.index_to_expander {
        line(out, format!("    spec.index_to_expander.insert({index}, {});", expander_expression(expander)));
    }
    for (field, index) in [
        ("body_index", spec.body_index),
        ("url_index", spec.url_index),
        ("query_map_index", spec.query_map_index),
        ("header_map_index", spec.header_map_index),
        ("options_index", spec.options_index),
    ] {
        if let Some(index) = index {
            line(out, format!("    spec.{field} = Some({index});"));
        }
    }
    if spec.query_map_encoded {
        line(out, "    spec.query_map_encoded = true;");
    }
    for index in &spec.ignored_params {
        line(out, format!("    spec.ignored_params.insert({index});"));
    }
    if !spec.return_type.is_unit() {
        line(
            out,
            format!("    spec.return_type = {TYPES}::TypeDescriptor::from({:?});", spec.return_type.to_string()),
        );
    }
    if let Some(body_type) = &spec.body_type {
        line(
            out,
            format!("    spec.body_type = Some({TYPES}::TypeDescriptor::from({:?}));", body_type.to_string()),
        );
    }
    line(out, "    spec");
    line(out, "}");
}

fn expander_expression(expander: &Expander) -> String {
    match expander {
        Expander::ToString => format!("{TYPES}::Expander::ToString"),
        Expander::Json => format!("{TYPES}::Expander::Json"),
        Expander::Lowercase => format!("{TYPES}::Expander::Lowercase"),
        Expander::Uppercase => format!("{TYPES}::Expander::Uppercase"),
        Expander::Custom(custom) => format!(
            "{TYPES}::Expander::Custom({TYPES}::CustomExpander::new({:?}, {}))",
            custom.name(),
            custom.name()
        ),
    }
}

fn render_adapter(out: &mut String, set: &RecipeSet, function_names: &[String], aggregate: &str) {
    let adapter = format!("{}Client", set.interface.to_upper_camel_case());
    line(out, format!("\n/// Typed client for `{}` backed by a dispatch table.", set.interface));
    line(out, format!("pub struct {adapter} {{"));
    line(out, format!("    table: {ENGINE}::DispatchTable,"));
    line(out, "}");
    out.push('\n');
    line(out, format!("impl {adapter} {{"));
    line(
        out,
        format!("    pub fn new(builder: &{ENGINE}::ClientBuilder) -> ::std::result::Result<Self, {ENGINE}::ClientError> {{"),
    );
    line(out, format!("        Ok(Self {{ table: builder.build({aggregate}())? }})"));
    line(out, "    }");
    out.push('\n');
    line(out, format!("    pub fn dispatch_table(&self) -> &{ENGINE}::DispatchTable {{"));
    line(out, "        &self.table");
    line(out, "    }");

    for (method, function) in set.methods.iter().zip(function_names) {
        out.push('\n');
        render_adapter_method(out, method, function);
    }
    line(out, "}");
}

fn render_adapter_method(out: &mut String, method: &RecipeMethod, function: &str) {
    let params: Vec<(String, &TypeDescriptor)> = method
        .params
        .iter()
        .map(|(name, ty)| (name.to_snake_case(), ty))
        .collect();
    let signature: Vec<String> = params.iter().map(|(name, ty)| format!("{name}: {ty}")).collect();
    let return_type = if method.spec.return_type.is_unit() {
        "()".to_string()
    } else {
        method.spec.return_type.to_string()
    };

    line(
        out,
        format!(
            "    pub async fn {function}(&self{}{}) -> ::std::result::Result<{return_type}, {ENGINE}::ClientError> {{",
            if signature.is_empty() { "" } else { ", " },
            signature.join(", ")
        ),
    );
    line(out, "        let argv = vec![");
    for (name, ty) in &params {
        if ty.is_uri() {
            line(out, format!("            {ENGINE}::Value::String({name}.to_string()),"));
        } else {
            line(out, format!("            {ENGINE}::argument(&{name})?,"));
        }
    }
    line(out, "        ];");
    line(out, format!("        let value = self.table.invoke({:?}, argv).await?;", method.spec.config_key));
    line(out, format!("        {ENGINE}::decode_value({:?}, value)", method.spec.config_key));
    line(out, "    }");
}
