//! Contract compilation: declarations in, validated [`MethodSpec`]s out.

use std::collections::HashSet;

use bindery_types::{Annotation, ContractError, Expander, MethodSpec, TypeDescriptor};
use tracing::debug;

use crate::{
    ContractRegistry,
    introspect::{DeclarationIntrospector, DeclaredMethod, InterfaceView},
    utils::config_key,
};

impl ContractRegistry {
    /// Compiles every concrete method of the introspected interface.
    ///
    /// Specs are returned in declaration order, inherited methods first.
    pub fn compile(&self, introspector: &dyn DeclarationIntrospector) -> Result<Vec<MethodSpec>, ContractError> {
        let capabilities = introspector.capabilities();
        let target = introspector.interface()?;
        check_inheritance(&target, capabilities.checks_inheritance_depth)?;

        let mut specs = Vec::new();
        let mut seen_keys = HashSet::new();
        for method in introspector.list_methods()? {
            if !method.declaration.is_concrete() {
                continue;
            }
            let spec = self.compile_method(introspector, &target, &method)?;
            if !seen_keys.insert(spec.config_key.clone()) {
                return Err(ContractError::DuplicateConfigKey(spec.config_key));
            }
            spec.validate()?;
            debug!(
                config_key = %spec.config_key,
                method = ?spec.http_method,
                url = %spec.url_template,
                "compiled method"
            );
            specs.push(spec);
        }
        Ok(specs)
    }

    fn compile_method(
        &self,
        introspector: &dyn DeclarationIntrospector,
        target: &InterfaceView,
        method: &DeclaredMethod,
    ) -> Result<MethodSpec, ContractError> {
        let declaration = &method.declaration;
        let param_types: Vec<TypeDescriptor> = declaration.params.iter().map(|param| param.ty.clone()).collect();
        let mut spec = MethodSpec::new(config_key(&target.name, &declaration.name, &param_types));
        spec.return_type = introspector.resolve_generic_type(&method.declared_in, &declaration.returns);

        for parent in &target.parents {
            self.apply_type_processors(&parent.annotations, &mut spec)?;
        }
        self.apply_type_processors(&target.annotations, &mut spec)?;

        for (kind, processor) in self.method_processors() {
            for annotation in declaration.annotations.iter().filter(|annotation| annotation.kind() == kind) {
                processor(annotation, &mut spec)?;
            }
        }
        if spec.http_method.is_none() {
            return Err(ContractError::MissingHttpMethod(spec.config_key));
        }

        for (index, param) in declaration.params.iter().enumerate() {
            let claimed = self.apply_parameter_processors(&param.annotations, &mut spec, index)?;
            if claimed {
                spec.ignored_params.insert(index);
            }

            if param.ty.is_uri() {
                spec.url_index = Some(index);
            } else if param.ty.is_request_options() {
                spec.options_index = Some(index);
            } else if !claimed {
                if !spec.form_params.is_empty() {
                    return Err(ContractError::BodyWithFormParams(spec.config_key));
                }
                if spec.body_index.is_some() {
                    return Err(ContractError::TooManyBodyParams(spec.config_key));
                }
                spec.body_index = Some(index);
                spec.body_type = Some(introspector.resolve_generic_type(&method.declared_in, &param.ty));
            }
        }

        if introspector.capabilities().introspects_generics {
            check_map_parameters(&spec, declaration.params.iter().map(|param| &param.ty).collect())?;
        }
        self.bind_expanders(&mut spec);
        Ok(spec)
    }

    fn apply_type_processors(&self, annotations: &[Annotation], spec: &mut MethodSpec) -> Result<(), ContractError> {
        for (kind, processor) in self.type_processors() {
            for annotation in annotations.iter().filter(|annotation| annotation.kind() == kind) {
                processor(annotation, spec)?;
            }
        }
        Ok(())
    }

    fn apply_parameter_processors(
        &self,
        annotations: &[Annotation],
        spec: &mut MethodSpec,
        index: usize,
    ) -> Result<bool, ContractError> {
        let mut claimed = false;
        for (kind, processor) in self.parameter_processors() {
            for annotation in annotations.iter().filter(|annotation| annotation.kind() == kind) {
                claimed |= processor(annotation, spec, index)?;
            }
        }
        Ok(claimed)
    }

    fn bind_expanders(&self, spec: &mut MethodSpec) {
        for expander in spec.index_to_expander.values_mut() {
            if let Expander::Custom(custom) = expander
                && !custom.is_bound()
                && let Some(function) = self.expander(custom.name())
            {
                custom.bind(function.clone());
            }
        }
    }
}

fn check_inheritance(target: &InterfaceView, checks_depth: bool) -> Result<(), ContractError> {
    if !target.type_params.is_empty() {
        return Err(ContractError::ParameterizedType(target.name.clone()));
    }
    if target.parents.len() > 1 {
        return Err(ContractError::MultipleInheritance(target.name.clone()));
    }
    if checks_depth
        && let Some(parent) = target.parents.first()
        && parent.parent_count.is_some_and(|count| count > 0)
    {
        return Err(ContractError::InheritanceDepth(target.name.clone()));
    }
    Ok(())
}

fn check_map_parameters(spec: &MethodSpec, param_types: Vec<&TypeDescriptor>) -> Result<(), ContractError> {
    if let Some(ty) = spec.header_map_index.and_then(|index| param_types.get(index)) {
        if !ty.is_map() {
            return Err(ContractError::NotAMap {
                annotation: "HeaderMap",
                config_key: spec.config_key.clone(),
                found: ty.to_string(),
            });
        }
        check_string_key("HeaderMap", spec, ty)?;
    }
    if let Some(ty) = spec.query_map_index.and_then(|index| param_types.get(index))
        && ty.is_map()
    {
        check_string_key("QueryMap", spec, ty)?;
    }
    Ok(())
}

fn check_string_key(annotation: &'static str, spec: &MethodSpec, ty: &TypeDescriptor) -> Result<(), ContractError> {
    match ty.map_key() {
        Some(key) if !key.is_string_like() => Err(ContractError::NonStringMapKey {
            annotation,
            config_key: spec.config_key.clone(),
            found: key.to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bindery_types::{Expander, InterfaceDescriptor, MethodDeclaration, ParamDeclaration};
    use serde_json::json;

    use super::*;
    use crate::LiveIntrospector;

    fn slug_interface() -> Arc<InterfaceDescriptor> {
        Arc::new(
            InterfaceDescriptor::new("Docs").method(
                MethodDeclaration::new("page")
                    .returns("String")
                    .annotate(Annotation::request_line("GET /docs/{title}"))
                    .param(
                        ParamDeclaration::new("title", "String")
                            .annotate(Annotation::param("title").expander(Expander::from_name("slug"))),
                    ),
            ),
        )
    }

    #[test]
    fn registered_expanders_are_bound_to_compiled_specs() {
        let mut registry = ContractRegistry::with_defaults();
        registry.register_expander("slug", |value| {
            value.as_str().unwrap_or_default().to_lowercase().replace(' ', "-")
        });
        let specs = registry
            .compile(&LiveIntrospector::new(slug_interface()))
            .expect("compile");
        let expander = &specs[0].index_to_expander[&0];
        assert_eq!(expander.expand(&json!("Getting Started")).expect("bound"), "getting-started");
    }

    #[test]
    fn unknown_expanders_stay_unbound() {
        let specs = ContractRegistry::with_defaults()
            .compile(&LiveIntrospector::new(slug_interface()))
            .expect("compile");
        assert!(specs[0].index_to_expander[&0].expand(&json!("x")).is_err());
        assert_eq!(specs[0].config_key, "Docs#page(String)");
    }
}
