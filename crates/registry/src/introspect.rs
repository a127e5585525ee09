//! The seam between contract compilation and the source of declarations.
//!
//! The scanner never looks at declarations directly. It asks a
//! [`DeclarationIntrospector`] for the target interface, its methods (parent
//! methods first) and resolved generic types, so the bind-time and build-time
//! backends share one compilation algorithm and produce equal specs.

use std::sync::Arc;

use bindery_types::{
    Annotation, ContractError, DeclarationDocument, InterfaceDescriptor, MethodDeclaration, TypeDescriptor,
};
use indexmap::IndexMap;

/// What a backend is able to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// The backend can see a parent's own parents.
    pub checks_inheritance_depth: bool,
    /// The backend can see generic arguments of parameter types.
    pub introspects_generics: bool,
}

/// The target interface as far as compilation needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceView {
    pub name: String,
    pub type_params: Vec<String>,
    pub annotations: Vec<Annotation>,
    pub parents: Vec<ParentView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParentView {
    pub name: String,
    pub annotations: Vec<Annotation>,
    /// Number of parents the parent itself declares, when the backend knows it.
    pub parent_count: Option<usize>,
}

/// A method together with the interface that declares it.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredMethod {
    pub declared_in: String,
    pub declaration: MethodDeclaration,
}

pub trait DeclarationIntrospector {
    fn capabilities(&self) -> Capabilities;

    fn interface(&self) -> Result<InterfaceView, ContractError>;

    /// All methods of the target, inherited ones first, in declaration order.
    fn list_methods(&self) -> Result<Vec<DeclaredMethod>, ContractError>;

    /// Resolves `ty`, declared in `declared_in`, against the type arguments the
    /// target binds for that interface.
    fn resolve_generic_type(&self, declared_in: &str, ty: &TypeDescriptor) -> TypeDescriptor;
}

/// Bind-time backend over a linked [`InterfaceDescriptor`].
#[derive(Debug, Clone)]
pub struct LiveIntrospector {
    target: Arc<InterfaceDescriptor>,
}

impl LiveIntrospector {
    pub fn new(target: Arc<InterfaceDescriptor>) -> Self {
        Self { target }
    }

    pub fn from_document(document: &DeclarationDocument, interface: &str) -> Result<Self, ContractError> {
        Ok(Self::new(document.descriptor(interface)?))
    }

    pub fn target(&self) -> &InterfaceDescriptor {
        &self.target
    }
}

impl DeclarationIntrospector for LiveIntrospector {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            checks_inheritance_depth: true,
            introspects_generics: true,
        }
    }

    fn interface(&self) -> Result<InterfaceView, ContractError> {
        Ok(InterfaceView {
            name: self.target.name.clone(),
            type_params: self.target.type_params.clone(),
            annotations: self.target.annotations.clone(),
            parents: self
                .target
                .parents
                .iter()
                .map(|link| ParentView {
                    name: link.descriptor.name.clone(),
                    annotations: link.descriptor.annotations.clone(),
                    parent_count: Some(link.descriptor.parents.len()),
                })
                .collect(),
        })
    }

    fn list_methods(&self) -> Result<Vec<DeclaredMethod>, ContractError> {
        let mut methods = Vec::new();
        for link in &self.target.parents {
            methods.extend(link.descriptor.methods.iter().map(|method| DeclaredMethod {
                declared_in: link.descriptor.name.clone(),
                declaration: method.clone(),
            }));
        }
        methods.extend(self.target.methods.iter().map(|method| DeclaredMethod {
            declared_in: self.target.name.clone(),
            declaration: method.clone(),
        }));
        Ok(methods)
    }

    fn resolve_generic_type(&self, declared_in: &str, ty: &TypeDescriptor) -> TypeDescriptor {
        let Some(link) = self.target.parents.iter().find(|link| link.descriptor.name == declared_in) else {
            return ty.clone();
        };
        ty.substitute(&bind_type_params(&link.descriptor.type_params, &link.type_args))
    }
}

/// Pairs declared type parameters with bound arguments; unbound parameters are left out.
pub fn bind_type_params(params: &[String], args: &[TypeDescriptor]) -> IndexMap<String, TypeDescriptor> {
    params.iter().cloned().zip(args.iter().cloned()).collect()
}
