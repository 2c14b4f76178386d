// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::{CompileError, ModuleId};
use crate::guard::{inject_guard_with, merge_with_libraries};
use crate::kinds::normalize_kinds;
use crate::params::{build_schema, validate_parameter_defs, ParameterDef};
use crate::patterns::package_name;
use crate::schema::to_json_schema;
use crate::syntax::parse_module;
use crate::template::{Policy, PolicyMatch, PolicySource, Template, TemplateSource};
use crate::tracer::{CallGraphTracer, DEFAULT_MAX_CALL_DEPTH};

use log::info;
use regorus::unstable::Module;

/// Gatekeeper's admission target.
pub const DEFAULT_TARGET: &str = "admission.k8s.gatekeeper.sh";

/// Output of [`Compiler::compile_template`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    pub template: Template,
    /// The parameter tree the schema was generated from.
    pub parameters: Vec<ParameterDef>,
    /// Traced parameter paths, ascending. Empty for authored parameters.
    pub parameter_paths: Vec<String>,
}

/// Compiles constraint templates and policies.
#[derive(Debug, Clone)]
pub struct Compiler {
    target: String,
    guard_enabled: bool,
    rego_v1: bool,
    max_call_depth: Option<usize>,
}

/// Create a default compiler.
impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            guard_enabled: true,
            rego_v1: false,
            max_call_depth: Some(DEFAULT_MAX_CALL_DEPTH),
        }
    }

    pub fn set_target(&mut self, target: &str) {
        self.target = target.to_string();
    }

    pub fn set_guard_enabled(&mut self, b: bool) {
        self.guard_enabled = b;
    }

    /// Parse all sources with the Rego v1 keywords enabled.
    pub fn set_rego_v1(&mut self, b: bool) {
        self.rego_v1 = b;
    }

    /// Bound on nested rule calls while tracing. `None` means unbounded.
    pub fn set_max_call_depth(&mut self, depth: Option<usize>) {
        self.max_call_depth = depth;
    }

    fn parse(&self, file: String, rego: &str, module: ModuleId) -> Result<Module, CompileError> {
        parse_module(file, rego, self.rego_v1).map_err(|e| CompileError::parse(module, e))
    }

    fn trace_module(&self, module: &Module) -> Result<Vec<String>, CompileError> {
        let mut tracer = CallGraphTracer::new(module);
        tracer.set_max_call_depth(self.max_call_depth);
        tracer.trace()
    }

    /// Parameter paths read by the violation rules of `rego`, ascending.
    pub fn trace_parameters(&self, rego: &str) -> Result<Vec<String>, CompileError> {
        let module = self.parse("template.rego".to_string(), rego, ModuleId::Template)?;
        self.trace_module(&module)
    }

    pub fn compile_template(&self, src: &TemplateSource) -> Result<CompiledTemplate, CompileError> {
        info!("compiling template {} with {} libraries", src.kind, src.libs.len());

        // A library without a package cannot be imported.
        for (index, lib) in src.libs.iter().enumerate() {
            if package_name(lib).is_empty() {
                return Err(CompileError::EmptyLibraryPackage { index });
            }
        }

        self.parse("template.rego".to_string(), &src.rego, ModuleId::Template)?;
        for (idx, lib) in src.libs.iter().enumerate() {
            self.parse(format!("lib_{idx}.rego"), lib, ModuleId::Library(idx))?;
        }

        let merged = merge_with_libraries(&src.rego, &src.libs);
        let module = self.parse("merged.rego".to_string(), &merged, ModuleId::Merged)?;

        let (parameters, parameter_paths) = match &src.parameters {
            Some(parameters) => {
                validate_parameter_defs(parameters)?;
                (parameters.clone(), vec![])
            }
            None => {
                let paths = self.trace_module(&module)?;
                (build_schema(&paths), paths)
            }
        };

        let rego = if self.guard_enabled {
            inject_guard_with(&merged, self.rego_v1)
        } else {
            merged
        };

        info!(
            "compiled template {}: {} parameter paths, {} top-level parameters",
            src.kind,
            parameter_paths.len(),
            parameters.len()
        );

        Ok(CompiledTemplate {
            template: Template {
                kind: src.kind.clone(),
                open_api_v3_schema: to_json_schema(&parameters),
                target: self.target.clone(),
                rego,
                libs: src.libs.clone(),
            },
            parameters,
            parameter_paths,
        })
    }

    /// Resolves the declared kinds into API groups and assembles the policy.
    pub fn build_policy(&self, src: &PolicySource) -> Result<Policy, CompileError> {
        let kinds = normalize_kinds(&src.kinds)?;
        Ok(Policy {
            clusters: src.clusters.clone(),
            template: src.template.clone(),
            match_spec: PolicyMatch {
                kinds,
                metadata: src.match_metadata.clone(),
            },
            params: src.params.clone(),
        })
    }
}
