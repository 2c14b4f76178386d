// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use regorus::unstable::Expr::*;
use regorus::unstable::{ExprRef, Literal, Query};

/// Visits `expr` and its sub-expressions in pre-order.
/// Children are skipped when `f` returns false for a node.
/// Unlike evaluation, comprehension bodies are visited too.
pub fn traverse<E>(
    expr: &ExprRef,
    f: &mut dyn FnMut(&ExprRef) -> Result<bool, E>,
) -> Result<(), E> {
    if !f(expr)? {
        return Ok(());
    }

    match expr.as_ref() {
        Array { items, .. } | Set { items, .. } => {
            for item in items {
                traverse(item, f)?;
            }
        }
        Object { fields, .. } => {
            for (_, key, value) in fields {
                traverse(key, f)?;
                traverse(value, f)?;
            }
        }

        ArrayCompr { term, query, .. } | SetCompr { term, query, .. } => {
            traverse(term, f)?;
            traverse_query(query, f)?;
        }
        ObjectCompr {
            key, value, query, ..
        } => {
            traverse(key, f)?;
            traverse(value, f)?;
            traverse_query(query, f)?;
        }

        Call { params, .. } => {
            for param in params {
                traverse(param, f)?;
            }
        }

        UnaryExpr { expr, .. } => traverse(expr, f)?,

        RefDot { refr, .. } => traverse(refr, f)?,

        RefBrack { refr, index, .. } => {
            traverse(refr, f)?;
            traverse(index, f)?;
        }

        BinExpr { lhs, rhs, .. }
        | BoolExpr { lhs, rhs, .. }
        | ArithExpr { lhs, rhs, .. }
        | AssignExpr { lhs, rhs, .. } => {
            traverse(lhs, f)?;
            traverse(rhs, f)?;
        }

        Membership {
            key,
            value,
            collection,
            ..
        } => {
            if let Some(key) = key {
                traverse(key, f)?;
            }
            traverse(value, f)?;
            traverse(collection, f)?;
        }

        // Scalars and variables have no children.
        _ => (),
    }
    Ok(())
}

fn traverse_query<E>(
    query: &Query,
    f: &mut dyn FnMut(&ExprRef) -> Result<bool, E>,
) -> Result<(), E> {
    for stmt in &query.stmts {
        match &stmt.literal {
            Literal::SomeVars { .. } => (),
            Literal::SomeIn {
                key,
                value,
                collection,
                ..
            } => {
                if let Some(key) = key {
                    traverse(key, f)?;
                }
                traverse(value, f)?;
                traverse(collection, f)?;
            }
            Literal::Expr { expr, .. } | Literal::NotExpr { expr, .. } => traverse(expr, f)?,
            Literal::Every { domain, query, .. } => {
                traverse(domain, f)?;
                traverse_query(query, f)?;
            }
        }
        for m in &stmt.with_mods {
            traverse(&m.r#as, f)?;
        }
    }
    Ok(())
}
