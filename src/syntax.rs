// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Queries over the regorus syntax tree that the tracer relies on.

use crate::printer::ToCanonical;

use std::collections::BTreeSet;

use anyhow::Result;
use regorus::unstable::{Expr, ExprRef, Module, Parser, Rule, RuleBody, RuleHead, Source};

/// Parses `rego` into a module. `rego_v1` turns on the v1 keywords
/// before the first rule is read.
pub fn parse_module(file: String, rego: &str, rego_v1: bool) -> Result<Module> {
    let source = Source::from_contents(file, rego.to_string())?;
    let mut parser = Parser::new(&source)?;
    if rego_v1 {
        parser.enable_rego_v1()?;
    }
    parser.parse()
}

pub trait ExprExt {
    /// Name of the variable if this is a bare variable term.
    fn as_var(&self) -> Option<&str>;

    /// Callee and arguments if this is a call term.
    fn as_call(&self) -> Option<(&ExprRef, &[ExprRef])>;

    /// Left and right operands if this is `:=` or `=`.
    fn as_assignment(&self) -> Option<(&ExprRef, &ExprRef)>;

    /// Variables this term binds when used as an assignment target.
    /// `_`, `input` and `data` never bind.
    fn bound_vars(&self) -> BTreeSet<String>;
}

fn gather_bound_vars(expr: &Expr, vars: &mut BTreeSet<String>) {
    match expr {
        Expr::Var { .. } if !matches!(expr.span().text(), "_" | "input" | "data") => {
            vars.insert(expr.span().text().to_string());
        }
        Expr::Array { items, .. } => items.iter().for_each(|i| gather_bound_vars(i, vars)),
        Expr::Object { fields, .. } => fields
            .iter()
            .for_each(|(_, _, v)| gather_bound_vars(v, vars)),
        _ => (),
    }
}

impl ExprExt for Expr {
    fn as_var(&self) -> Option<&str> {
        match self {
            Expr::Var { .. } => Some(self.span().text()),
            _ => None,
        }
    }

    fn as_call(&self) -> Option<(&ExprRef, &[ExprRef])> {
        match self {
            Expr::Call { fcn, params, .. } => Some((fcn, params)),
            _ => None,
        }
    }

    fn as_assignment(&self) -> Option<(&ExprRef, &ExprRef)> {
        match self {
            Expr::AssignExpr { lhs, rhs, .. } => Some((lhs, rhs)),
            _ => None,
        }
    }

    fn bound_vars(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        gather_bound_vars(self, &mut vars);
        vars
    }
}

pub trait RuleExt {
    /// Name the rule is referenced by, e.g. `violation` or `has_label`.
    /// Trailing non-string indices such as `violation[msg]` are dropped.
    fn name(&self) -> String;

    /// Formal arguments of a function rule; empty for other rules.
    fn args(&self) -> &[ExprRef];

    fn bodies(&self) -> &[RuleBody];

    /// Expressions in the rule head that produce the rule's value:
    /// a set key, an assigned value or a default value.
    fn head_exprs(&self) -> Vec<ExprRef>;
}

fn head_ref(rule: &Rule) -> &ExprRef {
    match rule {
        Rule::Spec { head, .. } => match head {
            RuleHead::Compr { refr, .. }
            | RuleHead::Set { refr, .. }
            | RuleHead::Func { refr, .. } => refr,
        },
        Rule::Default { refr, .. } => refr,
    }
}

impl RuleExt for Rule {
    fn name(&self) -> String {
        let mut refr = head_ref(self);
        while let Expr::RefBrack { refr: r, index, .. } = refr.as_ref() {
            if matches!(index.as_ref(), Expr::String { .. }) {
                break;
            }
            refr = r;
        }
        refr.canonical().to_string()
    }

    fn args(&self) -> &[ExprRef] {
        match self {
            Rule::Spec {
                head: RuleHead::Func { args, .. },
                ..
            }
            | Rule::Default { args, .. } => args,
            _ => &[],
        }
    }

    fn bodies(&self) -> &[RuleBody] {
        match self {
            Rule::Spec { bodies, .. } => bodies,
            Rule::Default { .. } => &[],
        }
    }

    fn head_exprs(&self) -> Vec<ExprRef> {
        match self {
            Rule::Spec { head, .. } => match head {
                RuleHead::Set { key, .. } => key.iter().cloned().collect(),
                RuleHead::Compr { refr, assign, .. } => {
                    let mut exprs = vec![];
                    let mut refr = refr;
                    while let Expr::RefBrack { refr: r, index, .. } = refr.as_ref() {
                        if !matches!(index.as_ref(), Expr::String { .. }) {
                            exprs.push(index.clone());
                        }
                        refr = r;
                    }
                    exprs.extend(assign.iter().map(|a| a.value.clone()));
                    exprs
                }
                RuleHead::Func { assign, .. } => assign.iter().map(|a| a.value.clone()).collect(),
            },
            Rule::Default { value, .. } => vec![value.clone()],
        }
    }
}
