//! Shared asset processing: JS parsing/codegen and output minification.

pub mod js;
pub mod minify;
