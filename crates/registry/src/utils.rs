use bindery_types::{ContractError, TypeDescriptor};
use indexmap::IndexMap;

/// Builds the identifier of a method within its target interface,
/// e.g. `GitHub#contributors(String,String)`.
///
/// Parameter types contribute their simple name only, without generic
/// arguments, so `Vec<String>` and `Vec<u8>` render the same.
pub fn config_key(target: &str, method: &str, params: &[TypeDescriptor]) -> String {
    let target = target.rsplit("::").next().unwrap_or(target);
    let params: Vec<&str> = params.iter().map(TypeDescriptor::simple_name).collect();
    format!("{target}#{method}({})", params.join(","))
}

/// Splits `Name: value` lines at the first colon and groups values by name,
/// keeping duplicates in declaration order.
pub fn group_header_lines(lines: &[String], target: &str) -> Result<IndexMap<String, Vec<String>>, ContractError> {
    let mut grouped: IndexMap<String, Vec<String>> = IndexMap::new();
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            return Err(ContractError::MalformedHeader {
                target: target.to_string(),
                header: line.clone(),
            });
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(ContractError::MalformedHeader {
                target: target.to_string(),
                header: line.clone(),
            });
        }
        grouped.entry(name.to_string()).or_default().push(value.trim().to_string());
    }
    Ok(grouped)
}

/// Appends a method level URI to a type level prefix.
pub fn join_path(prefix: &str, uri: &str) -> String {
    if uri.is_empty() || uri.starts_with('/') || uri.starts_with('?') {
        format!("{prefix}{uri}")
    } else {
        format!("{prefix}/{uri}")
    }
}
