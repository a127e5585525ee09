use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use bindery_types::SpecManifest;
use postcard::to_stdvec;
use serde_json::Value;

use crate::{
    codegen::{RecipeSet, compile_recipes, render_recipes},
    introspect::concrete_interfaces,
};

/// Input descriptor for a generation pass: a declaration document on disk or in memory.
#[derive(Debug, Clone)]
pub struct DeclarationInput {
    pub file_path: Option<PathBuf>,
    pub local: Option<String>,
    /// Interfaces to compile. Empty means every interface without type parameters.
    pub interfaces: Vec<String>,
}

impl DeclarationInput {
    pub fn from_path(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: Some(file_path.into()),
            local: None,
            interfaces: Vec::new(),
        }
    }

    pub fn from_text(local: impl Into<String>) -> Self {
        Self {
            file_path: None,
            local: Some(local.into()),
            interfaces: Vec::new(),
        }
    }

    pub fn with_interfaces(mut self, interfaces: Vec<String>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// Reads the document contents, consuming the descriptor.
    pub fn take_contents(mut self) -> Result<String> {
        if let Some(file_path) = &self.file_path {
            let contents = fs::read_to_string(file_path).with_context(|| format!("read {}", file_path.display()))?;
            return Ok(contents);
        }
        if let Some(local) = self.local.take() {
            return Ok(local);
        }
        Err(anyhow::anyhow!("No file path or local content provided"))
    }
}

/// Parses a YAML or JSON declaration document into a raw value.
pub fn parse_document(text: &str) -> Result<Value> {
    let document: Value = serde_yaml::from_str(text).context("parse declaration document")?;
    if document.get("interfaces").and_then(Value::as_array).is_none() {
        anyhow::bail!("declaration document has no `interfaces` list");
    }
    Ok(document)
}

/// Compiles every requested interface of the input.
pub fn generate_recipe_sets(mut input: DeclarationInput) -> Result<Vec<RecipeSet>> {
    let requested = std::mem::take(&mut input.interfaces);
    let document = parse_document(&input.take_contents()?)?;
    let interfaces = if requested.is_empty() {
        concrete_interfaces(&document)
    } else {
        requested
    };
    interfaces
        .iter()
        .map(|interface| compile_recipes(&document, interface).with_context(|| format!("compile {interface}")))
        .collect()
}

pub fn generate_manifests(input: DeclarationInput) -> Result<Vec<SpecManifest>> {
    Ok(generate_recipe_sets(input)?
        .into_iter()
        .map(|set| SpecManifest {
            specs: set.specs(),
            interface: set.interface,
        })
        .collect())
}

/// Writes the manifests as postcard, one `SpecManifest` per interface in sequence.
pub fn write_manifest(input: DeclarationInput, output: PathBuf) -> Result<()> {
    let manifests = generate_manifests(input)?;
    let bytes = to_stdvec(&manifests).context("encode manifests")?;
    write_output(&output, &bytes)
}

pub fn write_manifest_json(input: DeclarationInput, output: PathBuf) -> Result<()> {
    let manifests = generate_manifests(input)?;
    let json = serde_json::to_vec_pretty(&manifests).context("serialize manifests")?;
    write_output(&output, &json)
}

/// Writes the Rust recipe module for every requested interface.
pub fn write_recipes(input: DeclarationInput, output: PathBuf) -> Result<()> {
    let sets = generate_recipe_sets(input)?;
    let source = sets.iter().map(render_recipes).collect::<Vec<_>>().join("\n");
    write_output(&output, source.as_bytes())
}

fn write_output(output: &PathBuf, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(output, bytes).with_context(|| format!("write {}", output.display()))?;
    Ok(())
}
