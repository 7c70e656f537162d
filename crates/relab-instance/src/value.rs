//! Resolved parameter values

use relab_ast::{Expr, TimeValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fully resolved constant; nothing symbolic survives elaboration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Time(TimeValue),
    Array(Vec<Value>),
    /// Opaque target code, passed through to code generation untouched
    Code(String),
}

impl Value {
    /// The value used when a parameter feeds a scalar position
    ///
    /// Arrays contribute their first element; an empty array has none.
    pub fn first(&self) -> Option<&Value> {
        match self {
            Value::Array(items) => items.first(),
            other => Some(other),
        }
    }

    /// Interpret the value as a duration
    ///
    /// Only time values and a bare zero qualify.
    pub fn as_time(&self) -> Option<TimeValue> {
        match self {
            Value::Time(t) => Some(*t),
            Value::Int(0) => Some(TimeValue::ZERO),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Convert back into a literal expression, e.g. for diagnostics
    pub fn to_expr(&self) -> Expr {
        match self {
            Value::Int(i) => Expr::Int(*i),
            Value::Float(f) => Expr::Float(*f),
            Value::Bool(b) => Expr::Bool(*b),
            Value::Str(s) => Expr::Str(s.clone()),
            Value::Time(t) => Expr::Time(*t),
            Value::Array(items) => Expr::List(items.iter().map(Value::to_expr).collect()),
            Value::Code(c) => Expr::Code(c.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "\"{}\"", s.escape_default()),
            Value::Time(t) => write!(f, "{}", t),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Code(c) => write!(f, "{}", c),
        }
    }
}

/// Where a parameter's value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// The declared default of the reactor definition
    Default,
    /// An override supplied at the instantiation site
    Override,
}

/// A parameter bound to its resolved value within one instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInstance {
    pub name: String,
    pub value: Value,
    pub provenance: Provenance,
}

impl ParameterInstance {
    pub fn is_overridden(&self) -> bool {
        self.provenance == Provenance::Override
    }

    /// First element of the value, see [`Value::first`]
    pub fn initial_value(&self) -> Option<&Value> {
        self.value.first()
    }
}
