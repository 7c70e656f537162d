//! Validated syntax tree
//!
//! This is the contract between the parser/validator and elaboration. Every
//! node is plain owned data; references between reactors are by name and are
//! looked up through a [`DefinitionTable`].

use crate::error::{AstError, Result};
use crate::time::TimeValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A complete program: reactor definitions plus the name of the main reactor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Name of the root reactor definition
    pub main: String,
    /// All reactor definitions visible to the program
    #[serde(default, rename = "reactor")]
    pub reactors: Vec<ReactorDecl>,
}

/// A reactor definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReactorDecl {
    pub name: String,
    #[serde(default, rename = "parameter")]
    pub parameters: Vec<ParameterDecl>,
    #[serde(default, rename = "input")]
    pub inputs: Vec<PortDecl>,
    #[serde(default, rename = "output")]
    pub outputs: Vec<PortDecl>,
    #[serde(default, rename = "timer")]
    pub timers: Vec<TimerDecl>,
    #[serde(default, rename = "action")]
    pub actions: Vec<ActionDecl>,
    #[serde(default, rename = "instance")]
    pub instantiations: Vec<Instantiation>,
}

/// Parameter declaration with its default expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDecl {
    pub name: String,
    #[serde(default)]
    pub ty: Option<TypeExpr>,
    pub default: Expr,
}

/// An instantiation site: `name = new Reactor(p = expr, ...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instantiation {
    pub name: String,
    pub reactor: String,
    /// Parameter overrides, in the order they were written
    #[serde(default)]
    pub overrides: IndexMap<String, Expr>,
}

/// Timer declaration; absent fields fall back to the configured defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerDecl {
    pub name: String,
    #[serde(default)]
    pub offset: Option<Expr>,
    #[serde(default)]
    pub period: Option<Expr>,
}

/// Where an action's events originate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionOrigin {
    #[default]
    Logical,
    Physical,
}

/// Action declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDecl {
    pub name: String,
    #[serde(default)]
    pub origin: ActionOrigin,
    #[serde(default)]
    pub min_delay: Option<Expr>,
    #[serde(default)]
    pub min_spacing: Option<Expr>,
    #[serde(default)]
    pub ty: Option<TypeExpr>,
}

/// Port declaration; a width turns the port into a multiport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDecl {
    pub name: String,
    #[serde(default)]
    pub ty: Option<TypeExpr>,
    #[serde(default)]
    pub width: Option<Expr>,
}

/// Expressions that may appear as parameter values and timing fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Time(TimeValue),
    /// Reference to a parameter of the enclosing scope
    ParamRef(String),
    List(Vec<Expr>),
    /// Opaque target-language code, kept verbatim including delimiters
    Code(String),
}

impl Expr {
    pub fn param(name: impl Into<String>) -> Self {
        Expr::ParamRef(name.into())
    }

    pub fn time(value: TimeValue) -> Self {
        Expr::Time(value)
    }

    /// Name of the referenced parameter, if this is a reference
    pub fn as_param_ref(&self) -> Option<&str> {
        match self {
            Expr::ParamRef(name) => Some(name),
            _ => None,
        }
    }
}

/// Array specification on a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArraySpec {
    Fixed(usize),
    Variable,
}

/// A target type, e.g. `int` or `int[4]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeExpr {
    pub base: String,
    #[serde(default)]
    pub array: Option<ArraySpec>,
}

impl TypeExpr {
    pub fn named(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            array: None,
        }
    }
}

/// Reference to a port or action, optionally through a contained instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarRef {
    #[serde(default)]
    pub container: Option<String>,
    pub variable: String,
}

/// Read-only lookup from reactor name to definition
#[derive(Debug, Clone)]
pub struct DefinitionTable<'a> {
    definitions: IndexMap<&'a str, &'a ReactorDecl>,
}

impl<'a> DefinitionTable<'a> {
    pub fn get(&self, name: &str) -> Option<&'a ReactorDecl> {
        self.definitions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Program {
    pub fn new(main: impl Into<String>, reactors: Vec<ReactorDecl>) -> Self {
        Self {
            main: main.into(),
            reactors,
        }
    }

    /// Find a reactor definition by name
    pub fn reactor(&self, name: &str) -> Option<&ReactorDecl> {
        self.reactors.iter().find(|r| r.name == name)
    }

    /// Build the lookup table used by elaboration
    pub fn definitions(&self) -> Result<DefinitionTable<'_>> {
        let mut definitions = IndexMap::new();
        for reactor in &self.reactors {
            if definitions.insert(reactor.name.as_str(), reactor).is_some() {
                return Err(AstError::DuplicateReactor(reactor.name.clone()));
            }
        }
        Ok(DefinitionTable { definitions })
    }
}

impl ReactorDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, default: Expr) -> Self {
        self.parameters.push(ParameterDecl {
            name: name.into(),
            ty: None,
            default,
        });
        self
    }

    pub fn with_timer(
        mut self,
        name: impl Into<String>,
        offset: Option<Expr>,
        period: Option<Expr>,
    ) -> Self {
        self.timers.push(TimerDecl {
            name: name.into(),
            offset,
            period,
        });
        self
    }

    pub fn with_instance(
        mut self,
        name: impl Into<String>,
        reactor: impl Into<String>,
        overrides: &[(&str, Expr)],
    ) -> Self {
        self.instantiations.push(Instantiation {
            name: name.into(),
            reactor: reactor.into(),
            overrides: overrides
                .iter()
                .map(|(param, expr)| (param.to_string(), expr.clone()))
                .collect(),
        });
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDecl> {
        self.parameters.iter().find(|p| p.name == name)
    }
}
