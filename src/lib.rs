pub mod codegen;
pub mod discover;
pub mod error;
pub mod fetch;
pub mod generate;
pub mod html;
pub mod parser;
pub mod runtime;
pub mod settings;
