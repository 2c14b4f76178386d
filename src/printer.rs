// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Canonical text rendering of expressions.
//!
//! The rendering is independent of the original layout: whitespace is
//! normalized, strings are re-quoted as json strings and infix operands
//! that are themselves infix expressions are parenthesized.

use regorus::unstable::*;

use core::fmt::{self, Display, Formatter};

/// Borrowed syntax node that displays in canonical form.
pub struct Canonical<'a, T: ?Sized>(pub &'a T);

pub trait ToCanonical {
    fn canonical(&self) -> Canonical<'_, Self> {
        Canonical(self)
    }
}

impl ToCanonical for Expr {}
impl ToCanonical for Literal {}
impl ToCanonical for LiteralStmt {}
impl ToCanonical for Query {}

const fn bin_op(op: &BinOp) -> &'static str {
    match op {
        BinOp::Intersection => "&",
        BinOp::Union => "|",
    }
}

const fn arith_op(op: &ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
        ArithOp::Mul => "*",
        ArithOp::Div => "/",
        ArithOp::Mod => "%",
    }
}

const fn bool_op(op: &BoolOp) -> &'static str {
    match op {
        BoolOp::Lt => "<",
        BoolOp::Le => "<=",
        BoolOp::Eq => "==",
        BoolOp::Ge => ">=",
        BoolOp::Gt => ">",
        BoolOp::Ne => "!=",
    }
}

const fn assign_op(op: &AssignOp) -> &'static str {
    match op {
        AssignOp::Eq => "=",
        AssignOp::ColEq => ":=",
    }
}

fn write_json(f: &mut Formatter<'_>, s: &str) -> fmt::Result {
    let quoted = serde_json::to_string(s).map_err(|_| fmt::Error)?;
    f.write_str(&quoted)
}

fn write_list(f: &mut Formatter<'_>, items: &[ExprRef]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item.canonical())?;
    }
    Ok(())
}

fn is_infix(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::BinExpr { .. }
            | Expr::BoolExpr { .. }
            | Expr::ArithExpr { .. }
            | Expr::AssignExpr { .. }
            | Expr::Membership { .. }
    )
}

fn write_operand(f: &mut Formatter<'_>, expr: &Expr) -> fmt::Result {
    if is_infix(expr) {
        write!(f, "({})", expr.canonical())
    } else {
        write!(f, "{}", expr.canonical())
    }
}

fn write_infix(f: &mut Formatter<'_>, lhs: &Expr, op: &str, rhs: &Expr) -> fmt::Result {
    write_operand(f, lhs)?;
    write!(f, " {op} ")?;
    write_operand(f, rhs)
}

impl Display for Canonical<'_, Expr> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            // String spans hold the escaped text between the quotes.
            Expr::String { .. } => {
                let text = self.0.span().text();
                let value: String =
                    serde_json::from_str(&format!("\"{text}\"")).map_err(|_| fmt::Error)?;
                write_json(f, &value)
            }
            Expr::RawString { .. } => write_json(f, self.0.span().text()),

            Expr::Array { items, .. } => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            Expr::Set { items, .. } if items.is_empty() => f.write_str("set()"),
            Expr::Set { items, .. } => {
                f.write_str("{")?;
                write_list(f, items)?;
                f.write_str("}")
            }
            Expr::Object { fields, .. } => {
                f.write_str("{")?;
                for (idx, (_, key, value)) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key.canonical(), value.canonical())?;
                }
                f.write_str("}")
            }

            Expr::ArrayCompr { term, query, .. } => {
                write!(f, "[{} | {}]", term.canonical(), query.canonical())
            }
            Expr::SetCompr { term, query, .. } => {
                write!(f, "{{{} | {}}}", term.canonical(), query.canonical())
            }
            Expr::ObjectCompr {
                key, value, query, ..
            } => write!(
                f,
                "{{{}: {} | {}}}",
                key.canonical(),
                value.canonical(),
                query.canonical()
            ),

            Expr::Call { fcn, params, .. } => {
                write!(f, "{}(", fcn.canonical())?;
                write_list(f, params)?;
                f.write_str(")")
            }
            Expr::UnaryExpr { expr, .. } => {
                f.write_str("-")?;
                write_operand(f, expr)
            }
            Expr::RefDot {
                refr,
                field: (field, _),
                ..
            } => write!(f, "{}.{}", refr.canonical(), field.text()),
            Expr::RefBrack { refr, index, .. } => {
                write!(f, "{}[{}]", refr.canonical(), index.canonical())
            }

            Expr::BinExpr { op, lhs, rhs, .. } => write_infix(f, lhs, bin_op(op), rhs),
            Expr::BoolExpr { op, lhs, rhs, .. } => write_infix(f, lhs, bool_op(op), rhs),
            Expr::ArithExpr { op, lhs, rhs, .. } => write_infix(f, lhs, arith_op(op), rhs),
            Expr::AssignExpr { op, lhs, rhs, .. } => write_infix(f, lhs, assign_op(op), rhs),

            Expr::Membership {
                key,
                value,
                collection,
                ..
            } => {
                if let Some(key) = key {
                    write!(f, "{}, ", key.canonical())?;
                }
                write_operand(f, value)?;
                f.write_str(" in ")?;
                write_operand(f, collection)
            }

            // Numbers, booleans, null and variables.
            expr => f.write_str(expr.span().text()),
        }
    }
}

impl Display for Canonical<'_, Literal> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            Literal::SomeVars { vars, .. } => {
                let names: Vec<&str> = vars.iter().map(|v| v.text()).collect();
                write!(f, "some {}", names.join(", "))
            }
            Literal::SomeIn {
                key,
                value,
                collection,
                ..
            } => {
                f.write_str("some ")?;
                if let Some(key) = key {
                    write!(f, "{}, ", key.canonical())?;
                }
                write!(f, "{} in {}", value.canonical(), collection.canonical())
            }
            Literal::Expr { expr, .. } => write!(f, "{}", expr.canonical()),
            Literal::NotExpr { expr, .. } => write!(f, "not {}", expr.canonical()),
            Literal::Every {
                key,
                value,
                domain,
                query,
                ..
            } => {
                f.write_str("every ")?;
                if let Some(key) = key {
                    write!(f, "{}, ", key.text())?;
                }
                write!(
                    f,
                    "{} in {} {{ {} }}",
                    value.text(),
                    domain.canonical(),
                    query.canonical()
                )
            }
        }
    }
}

impl Display for Canonical<'_, LiteralStmt> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.literal.canonical())?;
        for m in &self.0.with_mods {
            write!(f, " with {} as {}", m.refr.canonical(), m.r#as.canonical())?;
        }
        Ok(())
    }
}

impl Display for Canonical<'_, Query> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (idx, stmt) in self.0.stmts.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", stmt.canonical())?;
        }
        Ok(())
    }
}
