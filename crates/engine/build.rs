use std::{env, path::PathBuf};

use anyhow::{Context, Result};
use bindery_registry_gen::{DeclarationInput, write_recipes};

fn main() -> Result<()> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").context("CARGO_MANIFEST_DIR not set")?);
    let out_dir = PathBuf::from(env::var("OUT_DIR").context("OUT_DIR not set")?);
    let declaration = manifest_dir.join("tests").join("data").join("github.yaml");

    println!("cargo:rerun-if-changed={}", declaration.display());

    let input = DeclarationInput::from_path(&declaration).with_interfaces(vec!["GitHub".to_string()]);
    write_recipes(input, out_dir.join("github_recipes.rs"))
        .with_context(|| format!("generate recipes from {}", declaration.display()))
}
