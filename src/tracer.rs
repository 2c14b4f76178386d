// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::CompileError;
use crate::patterns::{
    extract_parameter_refs, is_parameter_expr, normalize_indirect_access, substitute_aliases,
};
use crate::printer::ToCanonical;
use crate::syntax::{ExprExt, RuleExt};
use crate::traversal::traverse;

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use regorus::unstable::{Expr, ExprRef, Literal, Module, Query, Ref, Rule};

/// Default bound on nested rule calls while tracing.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 128;

// Local variable name to the parameter expression it stands for.
type Aliases = BTreeMap<String, String>;

/// Collects every `input.parameters` path that the violation rules of a
/// module depend on, following calls into helper rules.
pub struct CallGraphTracer {
    rules: Vec<Ref<Rule>>,
    helpers: BTreeMap<String, Vec<usize>>,
    refs: BTreeSet<String>,
    // (rule index, passed arguments) already processed.
    visited: BTreeSet<(usize, Vec<String>)>,
    depth: usize,
    max_depth: Option<usize>,
}

impl CallGraphTracer {
    pub fn new(module: &Module) -> Self {
        let rules = module.policy.clone();
        let mut helpers: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, rule) in rules.iter().enumerate() {
            let name = rule.name();
            if name != "violation" {
                helpers.entry(name).or_default().push(idx);
            }
        }

        Self {
            rules,
            helpers,
            refs: BTreeSet::new(),
            visited: BTreeSet::new(),
            depth: 0,
            max_depth: Some(DEFAULT_MAX_CALL_DEPTH),
        }
    }

    /// `None` removes the bound.
    pub fn set_max_call_depth(&mut self, max_depth: Option<usize>) {
        self.max_depth = max_depth;
    }

    /// Traces all violation rules. Paths are returned in ascending order.
    pub fn trace(mut self) -> Result<Vec<String>, CompileError> {
        let violations: Vec<usize> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.name() == "violation")
            .map(|(idx, _)| idx)
            .collect();

        for idx in violations {
            self.process_rule(idx, &[])?;
        }
        Ok(self.refs.into_iter().collect())
    }

    fn process_rule(&mut self, idx: usize, passed: &[String]) -> Result<(), CompileError> {
        if !self.visited.insert((idx, passed.to_vec())) {
            return Ok(());
        }

        if let Some(limit) = self.max_depth {
            if self.depth >= limit {
                return Err(CompileError::CallDepthExceeded {
                    rule: self.rules[idx].name(),
                    limit,
                });
            }
        }

        self.depth += 1;
        let result = self.process_rule_bodies(idx, passed);
        self.depth -= 1;
        result
    }

    fn process_rule_bodies(&mut self, idx: usize, passed: &[String]) -> Result<(), CompileError> {
        let rule = self.rules[idx].clone();

        let mut aliases = Aliases::new();
        for (arg, value) in rule.args().iter().zip(passed) {
            if let Some(name) = arg.as_var() {
                if is_parameter_expr(value) {
                    aliases.insert(name.to_string(), value.clone());
                }
            }
        }

        let head_exprs = rule.head_exprs();
        if rule.bodies().is_empty() {
            for expr in &head_exprs {
                self.process_expr(expr, &mut aliases)?;
            }
            return Ok(());
        }

        for body in rule.bodies() {
            let mut scope = aliases.clone();
            self.process_query(&body.query, &mut scope)?;
            if let Some(assign) = &body.assign {
                self.process_expr(&assign.value, &mut scope)?;
            }
            for expr in &head_exprs {
                self.process_expr(expr, &mut scope)?;
            }
        }
        Ok(())
    }

    fn process_query(&mut self, query: &Query, aliases: &mut Aliases) -> Result<(), CompileError> {
        for stmt in &query.stmts {
            match &stmt.literal {
                Literal::Expr { expr, .. } | Literal::NotExpr { expr, .. } => {
                    self.process_expr(expr, aliases)?
                }
                Literal::SomeIn {
                    value, collection, ..
                } => {
                    self.process_expr(collection, aliases)?;
                    if let Some(var) = value.as_var() {
                        Self::alias_element(var, collection, aliases);
                    }
                }
                Literal::Every {
                    value,
                    domain,
                    query,
                    ..
                } => {
                    self.process_expr(domain, aliases)?;
                    let mut scope = aliases.clone();
                    Self::alias_element(value.text(), domain, &mut scope);
                    self.process_query(query, &mut scope)?;
                }
                Literal::SomeVars { .. } => (),
            }
        }
        Ok(())
    }

    // `var` iterates over the elements of `collection`.
    fn alias_element(var: &str, collection: &ExprRef, aliases: &mut Aliases) {
        if var == "_" {
            return;
        }
        let text = Self::normalize(&collection.canonical().to_string(), aliases);
        if is_parameter_expr(&text) {
            debug!("alias {var} -> {text}[_]");
            aliases.insert(var.to_string(), format!("{text}[_]"));
        }
    }

    // Aliases are substituted before and after collapsing indirect access
    // since the rewrite can expose further aliased identifiers.
    fn normalize(text: &str, aliases: &Aliases) -> String {
        let text = substitute_aliases(text, aliases);
        let text = normalize_indirect_access(&text);
        substitute_aliases(&text, aliases)
    }

    fn process_expr(&mut self, expr: &ExprRef, aliases: &mut Aliases) -> Result<(), CompileError> {
        let text = Self::normalize(&expr.canonical().to_string(), aliases);
        self.refs.extend(extract_parameter_refs(&text));

        if let Some((lhs, rhs)) = expr.as_assignment() {
            let vars = lhs.bound_vars();
            if let (1, Some(var)) = (vars.len(), vars.first()) {
                let value = Self::normalize(&rhs.canonical().to_string(), aliases);
                if is_parameter_expr(&value) {
                    debug!("alias {var} -> {value}");
                    aliases.insert(var.clone(), value);
                }
            }
        }

        if let Some((fcn, params)) = expr.as_call() {
            if !params.is_empty() {
                self.follow_call(fcn, params, aliases)?;
            }
        }

        // Calls nested in larger expressions and helpers referenced without
        // call syntax.
        let aliases: &Aliases = aliases;
        traverse::<CompileError>(expr, &mut |term: &ExprRef| {
            match term.as_ref() {
                Expr::Call { fcn, params, .. } => {
                    self.call_helper(&fcn.canonical().to_string(), &[])?;
                    if !params.is_empty() {
                        self.follow_call(fcn, params, aliases)?;
                    }
                }
                Expr::Var { .. } | Expr::RefDot { .. } | Expr::RefBrack { .. } => {
                    self.call_helper(&term.canonical().to_string(), &[])?;
                }
                _ => (),
            }
            Ok(true)
        })
    }

    fn call_helper(&mut self, name: &str, passed: &[String]) -> Result<(), CompileError> {
        let targets = match self.helpers.get(name) {
            Some(targets) => targets.clone(),
            None => return Ok(()),
        };
        for idx in targets {
            self.process_rule(idx, passed)?;
        }
        Ok(())
    }

    // Arguments that may lead to parameters are passed positionally.
    // The others become "" so that positions still line up.
    fn follow_call(
        &mut self,
        fcn: &ExprRef,
        params: &[ExprRef],
        aliases: &Aliases,
    ) -> Result<(), CompileError> {
        let name = fcn.canonical().to_string();
        if !self.helpers.contains_key(&name) {
            return Ok(());
        }

        let passing: Vec<String> = params
            .iter()
            .map(|p| {
                let text = Self::normalize(&p.canonical().to_string(), aliases);
                if is_parameter_expr(&text) {
                    text
                } else {
                    String::new()
                }
            })
            .collect();

        if passing.iter().all(String::is_empty) {
            return Ok(());
        }

        debug!("following {name}({})", passing.join(", "));
        self.call_helper(&name, &passing)
    }
}

/// Parameter paths read by the violation rules of `module`, ascending.
pub fn trace_parameter_paths(module: &Module) -> Result<Vec<String>, CompileError> {
    CallGraphTracer::new(module).trace()
}
