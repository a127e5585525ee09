//! Contract model shared by the bindery crates.
//!
//! Holds the canonical [`MethodSpec`] record, the annotation and declaration
//! model it is compiled from, and the small value types (HTTP verbs,
//! collection formats, type descriptors, expanders) both compile time and
//! call time code agree on.

pub mod annotation;
pub mod declaration;
pub mod error;
pub mod expander;
pub mod http;
pub mod manifest;
pub mod method_spec;
pub mod options;
pub mod template;
pub mod type_descriptor;

pub use annotation::{Annotation, kinds};
pub use declaration::{
    DeclarationDocument, InterfaceDeclaration, InterfaceDescriptor, MethodDeclaration, ParamDeclaration, ParentLink,
};
pub use error::ContractError;
pub use expander::{CustomExpander, ExpandFn, Expander, UnboundExpanderError, value_to_string};
pub use http::{CollectionFormat, HttpMethod, ParseHttpMethodError};
pub use manifest::SpecManifest;
pub use method_spec::{BodyTemplate, MethodSpec};
pub use options::RequestOptions;
pub use type_descriptor::{TypeDescriptor, TypeParseError};

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_manifest() -> SpecManifest {
        let mut spec = MethodSpec::new("GitHub#createIssue(Issue,String,String)");
        spec.http_method = Some(HttpMethod::Post);
        spec.url_template = "/repos/{owner}/{repo}/issues".into();
        spec.name_param(1, "owner");
        spec.name_param(2, "repo");
        spec.index_to_expander.insert(2, Expander::from_name("crate::expanders::slug"));
        spec.body_index = Some(0);
        spec.body_type = Some(TypeDescriptor::named("Issue"));
        SpecManifest {
            interface: "GitHub".into(),
            specs: vec![spec],
        }
    }

    #[test]
    fn manifest_reads_back_from_postcard_and_json() {
        let manifest = sample_manifest();

        let binary = manifest.to_postcard().expect("postcard");
        assert_eq!(SpecManifest::try_from(binary).expect("postcard read"), manifest);

        let json = serde_json::to_vec_pretty(&manifest).expect("json");
        let read = SpecManifest::try_from(json).expect("json read");
        assert_eq!(read, manifest);
        assert!(read.find("GitHub#createIssue(Issue,String,String)").is_some());
    }
}
