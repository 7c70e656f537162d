//! Parameter resolution
//!
//! Each instance resolves its parameters once, against the already resolved
//! parameters of the instance that created it. Overrides at the instantiation
//! site win over declared defaults. Resolution is all-or-nothing: either every
//! parameter gets a value or an error is returned and nothing is kept.

use crate::error::{ElaborationError, Result};
use crate::instance::ReactorInstance;
use crate::value::{ParameterInstance, Provenance, Value};
use indexmap::IndexMap;
use relab_ast::{ExpressionPrinter, Expr, Instantiation, ReactorDecl};
use tracing::trace;

/// Resolves parameter declarations to constant values
pub struct ParameterResolver<'a> {
    printer: &'a dyn ExpressionPrinter,
}

impl<'a> ParameterResolver<'a> {
    pub fn new(printer: &'a dyn ExpressionPrinter) -> Self {
        Self { printer }
    }

    /// Resolve every parameter declared on `reactor`
    ///
    /// `site` is the instantiation that created the instance (None for the
    /// root) and `parent` is the instance containing that site.
    pub fn resolve(
        &self,
        path: &str,
        reactor: &ReactorDecl,
        site: Option<&Instantiation>,
        parent: Option<&ReactorInstance>,
    ) -> Result<IndexMap<String, ParameterInstance>> {
        if let Some(site) = site {
            if let Some((name, expr)) = site
                .overrides
                .iter()
                .find(|(name, _)| reactor.parameter(name).is_none())
            {
                return Err(ElaborationError::UnresolvedParameter {
                    instance: path.to_string(),
                    parameter: name.clone(),
                    expr: Some(self.printer.print_expr(expr)),
                });
            }
        }

        let mut resolved = IndexMap::with_capacity(reactor.parameters.len());
        for decl in &reactor.parameters {
            let (expr, provenance) = match site.and_then(|s| s.overrides.get(&decl.name)) {
                Some(expr) => (expr, Provenance::Override),
                None => (&decl.default, Provenance::Default),
            };

            let value = self.evaluate(path, expr, expr, parent)?;
            trace!("{}.{} = {} ({:?})", path, decl.name, value, provenance);

            resolved.insert(
                decl.name.clone(),
                ParameterInstance {
                    name: decl.name.clone(),
                    value,
                    provenance,
                },
            );
        }
        Ok(resolved)
    }

    /// Evaluate one expression; `root` is the whole expression, for diagnostics
    fn evaluate(
        &self,
        path: &str,
        expr: &Expr,
        root: &Expr,
        parent: Option<&ReactorInstance>,
    ) -> Result<Value> {
        let value = match expr {
            Expr::Int(i) => Value::Int(*i),
            Expr::Float(f) => Value::Float(*f),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::Time(t) => Value::Time(*t),
            Expr::Code(c) => Value::Code(c.clone()),
            Expr::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.evaluate(path, item, root, parent))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Expr::ParamRef(name) => {
                let referenced = parent
                    .and_then(|p| p.parameter(name))
                    .ok_or_else(|| ElaborationError::UnresolvedParameter {
                        instance: path.to_string(),
                        parameter: name.clone(),
                        expr: Some(self.printer.print_expr(root)),
                    })?;
                match referenced.initial_value() {
                    Some(first) => first.clone(),
                    None => referenced.value.clone(),
                }
            }
        };
        Ok(value)
    }
}
