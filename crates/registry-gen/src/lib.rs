//! Build-time contract compilation.
//!
//! Reads declaration documents without the bind-time model, compiles them
//! through the shared scanner and writes the result either as Rust recipes
//! (for `include!`) or as spec manifests (postcard or JSON).

pub mod codegen;
pub mod introspect;
pub mod io;

pub use codegen::{RecipeMethod, RecipeSet, compile_recipes, render_recipes};
pub use introspect::{StaticIntrospector, concrete_interfaces};
pub use io::{DeclarationInput, generate_manifests, write_manifest, write_manifest_json, write_recipes};
