//! Source-like rendering of syntax tree fragments
//!
//! Used for diagnostics only. Nothing in elaboration reads these strings back.

use crate::ast::{ArraySpec, Expr, TypeExpr, VarRef};

/// Renders syntax tree fragments as canonical source text
pub trait ExpressionPrinter {
    fn print_expr(&self, expr: &Expr) -> String;
    fn print_type(&self, ty: &TypeExpr) -> String;
    fn print_var_ref(&self, var: &VarRef) -> String;
    fn print_code(&self, code: &str) -> String;
}

/// Default printer
#[derive(Debug, Clone, Copy, Default)]
pub struct ToText;

impl ExpressionPrinter for ToText {
    fn print_expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::Int(i) => i.to_string(),
            Expr::Float(f) => format!("{:?}", f),
            Expr::Bool(b) => b.to_string(),
            Expr::Str(s) => format!("\"{}\"", s.escape_default()),
            Expr::Time(t) => t.to_string(),
            Expr::ParamRef(name) => name.clone(),
            Expr::List(items) => {
                let items: Vec<String> = items.iter().map(|e| self.print_expr(e)).collect();
                format!("[{}]", items.join(", "))
            }
            Expr::Code(code) => self.print_code(code),
        }
    }

    fn print_type(&self, ty: &TypeExpr) -> String {
        match ty.array {
            Some(ArraySpec::Fixed(n)) => format!("{}[{}]", ty.base, n),
            Some(ArraySpec::Variable) => format!("{}[]", ty.base),
            None => ty.base.clone(),
        }
    }

    fn print_var_ref(&self, var: &VarRef) -> String {
        match &var.container {
            Some(container) => format!("{}.{}", container, var.variable),
            None => var.variable.clone(),
        }
    }

    fn print_code(&self, code: &str) -> String {
        let text = code.trim();
        let Some(start) = text.find("{=") else {
            return text.to_string();
        };
        let Some(end) = text[start + 2..].find("=}").map(|e| e + start + 2) else {
            return text.to_string();
        };

        let body = &text[start + 2..end];
        if body.lines().count() > 1 {
            trim_code_block(body)
        } else {
            body.trim().to_string()
        }
    }
}

/// Drop surrounding blank lines and the indentation shared by all lines
fn trim_code_block(body: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return String::new();
    };
    let lines = &lines[first..=last];

    // Counted in chars; indentation may be multi-byte whitespace
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| {
            let start = l.char_indices().nth(indent).map_or(l.len(), |(i, _)| i);
            l[start..].trim_end()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
