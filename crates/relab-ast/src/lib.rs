//! relab syntax tree
//!
//! This crate holds:
//! - The validated syntax tree handed over by the parser/validator
//! - Time values and their units
//! - Source-like printing of tree fragments for diagnostics
//! - Loading programs from TOML or JSON design files

pub mod ast;
pub mod error;
pub mod time;
pub mod to_text;

pub use ast::{
    ActionDecl, ActionOrigin, ArraySpec, DefinitionTable, Expr, Instantiation, ParameterDecl,
    PortDecl, Program, ReactorDecl, TimerDecl, TypeExpr, VarRef,
};
pub use error::{AstError, Result};
pub use time::{TimeParseError, TimeUnit, TimeValue};
pub use to_text::{ExpressionPrinter, ToText};

use std::path::Path;

impl Program {
    /// Load a program from a `.toml` or `.json` design file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Program> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Program::from_toml_str(&contents),
            Some("json") => Program::from_json_str(&contents),
            other => Err(AstError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Parse a program from TOML
    pub fn from_toml_str(s: &str) -> Result<Program> {
        Ok(toml::from_str(s)?)
    }

    /// Parse a program from JSON
    pub fn from_json_str(s: &str) -> Result<Program> {
        Ok(serde_json::from_str(s)?)
    }
}
