//! Contract compilation for bindery interfaces.
//!
//! This crate owns the annotation processor tables ([`ContractRegistry`]),
//! the scanner that turns a declared interface into validated
//! [`MethodSpec`](bindery_types::MethodSpec)s, and the bind-time
//! [`LiveIntrospector`]. Build-time compilation reuses the same scanner
//! through its own introspector in `bindery-registry-gen`.

pub mod contract;
pub mod introspect;
pub mod scanner;
pub mod utils;

pub use contract::{ContractRegistry, MethodProcessor, ParameterProcessor, TypeProcessor};
pub use introspect::{
    Capabilities, DeclarationIntrospector, DeclaredMethod, InterfaceView, LiveIntrospector, ParentView,
    bind_type_params,
};
pub use utils::config_key;

use bindery_types::{ContractError, DeclarationDocument, MethodSpec};

/// Compiles `interface` from a declaration document with the default contract.
pub fn compile_document(document: &DeclarationDocument, interface: &str) -> Result<Vec<MethodSpec>, ContractError> {
    let introspector = LiveIntrospector::from_document(document, interface)?;
    ContractRegistry::with_defaults().compile(&introspector)
}
