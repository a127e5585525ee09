//! Declared interfaces: the input of contract compilation.
//!
//! A [`DeclarationDocument`] is the serialized form (YAML or JSON) that both
//! compilation backends read. [`InterfaceDescriptor`] is the linked, in-memory
//! form used at bind time, where parent interfaces are resolved to shared
//! descriptors instead of names.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Annotation, ContractError, TypeDescriptor};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclarationDocument {
    #[serde(default)]
    pub interfaces: Vec<InterfaceDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<TypeDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub methods: Vec<MethodDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDeclaration {
    pub name: String,
    #[serde(default = "TypeDescriptor::unit")]
    pub returns: TypeDescriptor,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<String>,
    #[serde(default, rename = "static", skip_serializing_if = "is_false")]
    pub is_static: bool,
    #[serde(default, rename = "default", skip_serializing_if = "is_false")]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub params: Vec<ParamDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<TypeDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(TypeDescriptor),
        Many(Vec<TypeDescriptor>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(parent)) => vec![parent],
        Some(OneOrMany::Many(parents)) => parents,
    })
}

impl DeclarationDocument {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceDeclaration> {
        self.interfaces.iter().find(|interface| interface.name == name)
    }

    /// Links `name` and its ancestors into an [`InterfaceDescriptor`].
    pub fn descriptor(&self, name: &str) -> Result<Arc<InterfaceDescriptor>, ContractError> {
        let mut visiting = Vec::new();
        self.link(name, &mut visiting)
    }

    fn link(&self, name: &str, visiting: &mut Vec<String>) -> Result<Arc<InterfaceDescriptor>, ContractError> {
        let declaration = self
            .interface(name)
            .ok_or_else(|| ContractError::UnknownInterface(name.to_string()))?;
        if visiting.iter().any(|seen| seen == name) {
            return Err(ContractError::InvalidType {
                target: name.to_string(),
                message: "interface inherits from itself".into(),
            });
        }
        visiting.push(name.to_string());

        let mut parents = Vec::with_capacity(declaration.extends.len());
        for parent in &declaration.extends {
            if self.interface(&parent.name).is_none() {
                return Err(ContractError::UnknownParent {
                    interface: name.to_string(),
                    parent: parent.name.clone(),
                });
            }
            parents.push(ParentLink {
                descriptor: self.link(&parent.name, visiting)?,
                type_args: parent.args.clone(),
            });
        }
        visiting.pop();

        Ok(Arc::new(InterfaceDescriptor {
            name: declaration.name.clone(),
            type_params: declaration.type_params.clone(),
            annotations: declaration.annotations.clone(),
            methods: declaration.methods.clone(),
            parents,
        }))
    }
}

/// A parent interface together with the type arguments the child binds.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentLink {
    pub descriptor: Arc<InterfaceDescriptor>,
    pub type_args: Vec<TypeDescriptor>,
}

/// An interface as seen at bind time: declarations plus linked parents.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDescriptor {
    pub name: String,
    pub type_params: Vec<String>,
    pub annotations: Vec<Annotation>,
    pub methods: Vec<MethodDeclaration>,
    pub parents: Vec<ParentLink>,
}

impl InterfaceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_params: Vec::new(),
            annotations: Vec::new(),
            methods: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub fn type_param(mut self, name: impl Into<String>) -> Self {
        self.type_params.push(name.into());
        self
    }

    pub fn extends(mut self, parent: Arc<InterfaceDescriptor>, type_args: Vec<TypeDescriptor>) -> Self {
        self.parents.push(ParentLink {
            descriptor: parent,
            type_args,
        });
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn method(mut self, method: MethodDeclaration) -> Self {
        self.methods.push(method);
        self
    }
}

impl MethodDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            returns: TypeDescriptor::unit(),
            type_params: Vec::new(),
            is_static: false,
            is_default: false,
            annotations: Vec::new(),
            params: Vec::new(),
        }
    }

    pub fn returns(mut self, ty: impl Into<TypeDescriptor>) -> Self {
        self.returns = ty.into();
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn param(mut self, param: ParamDeclaration) -> Self {
        self.params.push(param);
        self
    }

    /// Static and default methods are never bound to HTTP requests.
    pub fn is_concrete(&self) -> bool {
        !self.is_static && !self.is_default
    }
}

impl ParamDeclaration {
    pub fn new(name: impl Into<String>, ty: impl Into<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            annotations: Vec::new(),
        }
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
interfaces:
  - name: Base
    type_params: [T]
    annotations:
      - Headers: "Accept: application/json"
    methods:
      - name: get
        returns: T
        annotations:
          - RequestLine: GET /items/{id}
        params:
          - name: id
            type: String
            annotations:
              - Param: id
  - name: Repos
    extends: Base<Repository>
    methods:
      - name: helper
        static: true
"#;

    #[test]
    fn yaml_document_links_parents_with_type_arguments() {
        let document = DeclarationDocument::from_yaml(DOCUMENT).expect("parse yaml");
        let repos = document.descriptor("Repos").expect("link");
        assert_eq!(repos.parents.len(), 1);
        let parent = &repos.parents[0];
        assert_eq!(parent.descriptor.name, "Base");
        assert_eq!(parent.type_args, vec![TypeDescriptor::named("Repository")]);
        assert_eq!(parent.descriptor.annotations, vec![Annotation::headers(["Accept: application/json"])]);
        assert!(!repos.methods[0].is_concrete());
    }

    #[test]
    fn unknown_parent_is_reported() {
        let document = DeclarationDocument::from_json(r#"{"interfaces":[{"name":"A","extends":["Missing"]}]}"#)
            .expect("parse json");
        assert_eq!(
            document.descriptor("A"),
            Err(ContractError::UnknownParent {
                interface: "A".into(),
                parent: "Missing".into()
            })
        );
    }

    #[test]
    fn cyclic_inheritance_is_rejected() {
        let document = DeclarationDocument::from_json(
            r#"{"interfaces":[{"name":"A","extends":"B"},{"name":"B","extends":"A"}]}"#,
        )
        .expect("parse json");
        assert!(document.descriptor("A").is_err());
    }
}
