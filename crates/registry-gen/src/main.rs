use std::path::PathBuf;

use anyhow::Result;
use bindery_registry_gen::{DeclarationInput, write_manifest, write_manifest_json, write_recipes};
use clap::{Parser, ValueEnum};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// Rust construction recipes and adapters
    Rust,
    /// JSON spec manifests
    Json,
    /// postcard spec manifests
    Bin,
}

/// Compile a declaration document into method spec recipes or manifests.
#[derive(Parser, Debug)]
#[command(name = "bindery-registry-gen", version, about)]
struct Args {
    /// Input path to the YAML or JSON declaration document
    input: PathBuf,

    /// Output path for the generated file
    output: PathBuf,

    #[arg(long, value_enum, default_value = "rust")]
    format: Format,

    /// Interface to compile; repeatable. Defaults to every non-generic interface
    #[arg(long = "interface")]
    interfaces: Vec<String>,
}

fn main() -> Result<()> {
    let Args {
        input,
        output,
        format,
        interfaces,
    } = Args::parse();
    let input = DeclarationInput::from_path(input).with_interfaces(interfaces);
    match format {
        Format::Rust => write_recipes(input, output),
        Format::Json => write_manifest_json(input, output),
        Format::Bin => write_manifest(input, output),
    }
}
