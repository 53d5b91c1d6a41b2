//! YAML helpers for entity files

pub mod diagnostics;

pub use diagnostics::YamlSyntaxError;
