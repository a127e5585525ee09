pub mod encoding;
pub mod parser;

pub use encoding::*;
pub use parser::*;
