//! Build-time introspection over a raw declaration document.
//!
//! The document is walked as an untyped `serde_json::Value`: fields are read
//! one by one the way they appear on disk, and only the parent interfaces the
//! target names directly are looked at.

use bindery_registry::{
    Capabilities, DeclarationIntrospector, DeclaredMethod, InterfaceView, ParentView, bind_type_params,
};
use bindery_types::{
    Annotation, ContractError, MethodDeclaration, ParamDeclaration, TypeDescriptor,
};
use serde_json::Value;

pub struct StaticIntrospector<'a> {
    document: &'a Value,
    target: String,
}

impl<'a> StaticIntrospector<'a> {
    pub fn new(document: &'a Value, target: impl Into<String>) -> Self {
        Self {
            document,
            target: target.into(),
        }
    }

    fn find_interface(&self, name: &str) -> Option<&'a Value> {
        interfaces(self.document).find(|interface| interface.get("name").and_then(Value::as_str) == Some(name))
    }

    fn target_interface(&self) -> Result<&'a Value, ContractError> {
        self.find_interface(&self.target)
            .ok_or_else(|| ContractError::UnknownInterface(self.target.clone()))
    }

    fn parent_interfaces(&self) -> Result<Vec<(TypeDescriptor, &'a Value)>, ContractError> {
        let target = self.target_interface()?;
        let mut parents = Vec::new();
        for parent in read_extends(target, &self.target)? {
            let raw = self.find_interface(&parent.name).ok_or_else(|| ContractError::UnknownParent {
                interface: self.target.clone(),
                parent: parent.name.clone(),
            })?;
            parents.push((parent, raw));
        }
        Ok(parents)
    }
}

impl DeclarationIntrospector for StaticIntrospector<'_> {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            checks_inheritance_depth: false,
            introspects_generics: true,
        }
    }

    fn interface(&self) -> Result<InterfaceView, ContractError> {
        let target = self.target_interface()?;
        let parents = self
            .parent_interfaces()?
            .into_iter()
            .map(|(parent, raw)| {
                Ok(ParentView {
                    annotations: read_annotations(raw, &parent.name)?,
                    name: parent.name,
                    parent_count: None,
                })
            })
            .collect::<Result<Vec<_>, ContractError>>()?;
        Ok(InterfaceView {
            name: self.target.clone(),
            type_params: read_strings(target, "type_params", &self.target)?,
            annotations: read_annotations(target, &self.target)?,
            parents,
        })
    }

    fn list_methods(&self) -> Result<Vec<DeclaredMethod>, ContractError> {
        let mut declared = Vec::new();
        for (parent, raw) in self.parent_interfaces()? {
            for method in raw_methods(raw) {
                declared.push(DeclaredMethod {
                    declared_in: parent.name.clone(),
                    declaration: read_method(method, &parent.name)?,
                });
            }
        }
        for method in raw_methods(self.target_interface()?) {
            declared.push(DeclaredMethod {
                declared_in: self.target.clone(),
                declaration: read_method(method, &self.target)?,
            });
        }
        Ok(declared)
    }

    fn resolve_generic_type(&self, declared_in: &str, ty: &TypeDescriptor) -> TypeDescriptor {
        let Ok(parents) = self.parent_interfaces() else {
            return ty.clone();
        };
        let Some((parent, raw)) = parents.into_iter().find(|(parent, _)| parent.name == declared_in) else {
            return ty.clone();
        };
        let params = read_strings(raw, "type_params", declared_in).unwrap_or_default();
        ty.substitute(&bind_type_params(&params, &parent.args))
    }
}

/// Names of interfaces that can be compiled on their own (no type parameters).
pub fn concrete_interfaces(document: &Value) -> Vec<String> {
    interfaces(document)
        .filter(|interface| {
            interface
                .get("type_params")
                .and_then(Value::as_array)
                .is_none_or(|params| params.is_empty())
        })
        .filter_map(|interface| interface.get("name").and_then(Value::as_str).map(str::to_string))
        .collect()
}

fn interfaces(document: &Value) -> impl Iterator<Item = &Value> {
    document
        .get("interfaces")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn raw_methods(interface: &Value) -> impl Iterator<Item = &Value> {
    interface.get("methods").and_then(Value::as_array).into_iter().flatten()
}

fn read_method(raw: &Value, interface: &str) -> Result<MethodDeclaration, ContractError> {
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(interface, "method without a name"))?;
    let target = format!("{interface}#{name}");

    let mut method = MethodDeclaration::new(name);
    if let Some(returns) = raw.get("returns") {
        method.returns = read_type(returns, &target)?;
    }
    method.type_params = read_strings(raw, "type_params", &target)?;
    method.is_static = read_flag(raw, "static", &target)?;
    method.is_default = read_flag(raw, "default", &target)?;
    method.annotations = read_annotations(raw, &target)?;
    for param in raw.get("params").and_then(Value::as_array).into_iter().flatten() {
        let param_name = param
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid(&target, "parameter without a name"))?;
        let param_target = format!("{target}({param_name})");
        let ty = param
            .get("type")
            .ok_or_else(|| invalid(&param_target, "parameter without a type"))?;
        let mut declaration = ParamDeclaration::new(param_name, read_type(ty, &param_target)?);
        declaration.annotations = read_annotations(param, &param_target)?;
        method.params.push(declaration);
    }
    Ok(method)
}

fn read_annotations(raw: &Value, target: &str) -> Result<Vec<Annotation>, ContractError> {
    let Some(entries) = raw.get("annotations") else {
        return Ok(Vec::new());
    };
    let entries = entries
        .as_array()
        .ok_or_else(|| invalid(target, "annotations must be a list"))?;
    entries
        .iter()
        .map(|entry| {
            Annotation::from_value(entry)
                .map_err(|message| ContractError::invalid_annotation(entry_kind(entry), target, message))
        })
        .collect()
}

fn entry_kind(entry: &Value) -> String {
    match entry {
        Value::String(kind) => kind.clone(),
        Value::Object(map) => map.keys().next().cloned().unwrap_or_default(),
        other => other.to_string(),
    }
}

fn read_extends(interface: &Value, target: &str) -> Result<Vec<TypeDescriptor>, ContractError> {
    match interface.get("extends") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(parents)) => parents.iter().map(|parent| read_type(parent, target)).collect(),
        Some(parent) => Ok(vec![read_type(parent, target)?]),
    }
}

fn read_type(raw: &Value, target: &str) -> Result<TypeDescriptor, ContractError> {
    let text = raw
        .as_str()
        .ok_or_else(|| invalid(target, format!("type must be a string, got {raw}")))?;
    TypeDescriptor::parse(text).map_err(|error| invalid(target, error.to_string()))
}

fn read_strings(raw: &Value, key: &str, target: &str) -> Result<Vec<String>, ContractError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid(target, format!("{key} entries must be strings")))
            })
            .collect(),
        Some(other) => Err(invalid(target, format!("{key} must be a list, got {other}"))),
    }
}

fn read_flag(raw: &Value, key: &str, target: &str) -> Result<bool, ContractError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(other) => Err(invalid(target, format!("{key} must be a boolean, got {other}"))),
    }
}

fn invalid(target: &str, message: impl Into<String>) -> ContractError {
    ContractError::InvalidType {
        target: target.to_string(),
        message: message.into(),
    }
}
